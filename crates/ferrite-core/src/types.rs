//! Core types for tensor shapes, values, and node attributes.

use crate::{Error, Result};

/// Tensor element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    F16,
    I32,
    I64,
    U8,
    Bool,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::F32 | DataType::I32 => 4,
            DataType::F16 => 2,
            DataType::I64 => 8,
            DataType::U8 | DataType::Bool => 1,
        }
    }
}

/// A single dimension of a dynamic shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    /// Known size.
    Static(usize),

    /// Named symbolic size (e.g., `batch_size`).
    Named(String),
}

/// Tensor shape with support for static, dynamic, absent, and unknown shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorShape {
    /// All dimensions are known.
    Static(Vec<usize>),

    /// Mix of static and named dimensions.
    Dynamic(Vec<Dimension>),

    /// Optional input that is absent (ONNX empty string).
    Absent,

    /// Shape has not been inferred.
    Unknown,
}

impl TensorShape {
    /// Check if the shape is fully static.
    pub fn is_static(&self) -> bool {
        matches!(self, TensorShape::Static(_))
    }

    /// Get static dimensions if available.
    pub fn as_static(&self) -> Option<&[usize]> {
        match self {
            TensorShape::Static(dims) => Some(dims),
            _ => None,
        }
    }

    /// Number of dimensions, if known.
    pub fn ndim(&self) -> Option<usize> {
        match self {
            TensorShape::Static(dims) => Some(dims.len()),
            TensorShape::Dynamic(dims) => Some(dims.len()),
            TensorShape::Absent | TensorShape::Unknown => None,
        }
    }
}

/// Attribute value types.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

/// Raw tensor data.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    I64(Vec<i64>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    Bool(Vec<bool>),
    U8(Vec<u8>),
}

impl TensorData {
    /// Get the number of elements in this tensor data.
    pub fn len(&self) -> usize {
        match self {
            TensorData::I64(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::F32(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::U8(v) => v.len(),
        }
    }

    /// Check if this tensor data is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the inferred data type from this tensor data.
    pub fn dtype(&self) -> DataType {
        match self {
            TensorData::I64(_) => DataType::I64,
            TensorData::I32(_) => DataType::I32,
            TensorData::F32(_) => DataType::F32,
            TensorData::Bool(_) => DataType::Bool,
            TensorData::U8(_) => DataType::U8,
        }
    }
}

/// A tensor value known before execution (initializers and constants).
#[derive(Debug, Clone, PartialEq)]
pub struct TensorValue {
    /// The raw tensor data.
    pub data: TensorData,

    /// The shape of the tensor (dimensions).
    pub shape: Vec<usize>,

    /// The data type of the tensor.
    pub dtype: DataType,
}

impl TensorValue {
    /// Create a new TensorValue with data, shape, and dtype.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the shape product.
    pub fn new(data: TensorData, shape: Vec<usize>, dtype: DataType) -> Self {
        let expected_len: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (product = {})",
            data.len(),
            shape,
            expected_len
        );
        assert_eq!(
            data.dtype(),
            dtype,
            "Data type {:?} doesn't match declared dtype {:?}",
            data.dtype(),
            dtype
        );
        Self { data, shape, dtype }
    }

    /// Get the number of elements in this tensor value.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this tensor value is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.len() * self.dtype.size()
    }

    /// Try to get as f32 slice.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as i64 slice.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            TensorData::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Parse a TensorValue from little-endian initializer bytes.
    pub fn from_bytes(bytes: &[u8], dtype: DataType, shape: &[usize]) -> Result<Self> {
        let numel: usize = shape.iter().product();
        let expected = numel * dtype.size();
        if bytes.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "Invalid byte length for {:?} tensor: expected {}, got {}",
                dtype,
                expected,
                bytes.len()
            )));
        }

        let data = match dtype {
            DataType::I64 => TensorData::I64(
                bytes
                    .chunks_exact(8)
                    .map(|chunk| {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(chunk);
                        i64::from_le_bytes(raw)
                    })
                    .collect(),
            ),
            DataType::I32 => TensorData::I32(
                bytes
                    .chunks_exact(4)
                    .map(|chunk| {
                        let mut raw = [0u8; 4];
                        raw.copy_from_slice(chunk);
                        i32::from_le_bytes(raw)
                    })
                    .collect(),
            ),
            DataType::F32 => TensorData::F32(
                bytes
                    .chunks_exact(4)
                    .map(|chunk| {
                        let mut raw = [0u8; 4];
                        raw.copy_from_slice(chunk);
                        f32::from_le_bytes(raw)
                    })
                    .collect(),
            ),
            DataType::U8 => TensorData::U8(bytes.to_vec()),
            DataType::Bool => TensorData::Bool(bytes.iter().map(|&b| b != 0).collect()),
            DataType::F16 => {
                return Err(Error::InvalidArgument(
                    "from_bytes not implemented for F16".to_string(),
                ));
            }
        };

        Ok(TensorValue::new(data, shape.to_vec(), dtype))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_value_from_bytes() {
        let bytes = vec![1u8, 0, 0, 0, 2, 0, 0, 0];
        let value = TensorValue::from_bytes(&bytes, DataType::I32, &[2]).unwrap();
        assert_eq!(value.data, TensorData::I32(vec![1, 2]));
        assert_eq!(value.shape, vec![2]);

        let bytes = vec![0, 0, 128, 63, 0, 0, 0, 64]; // 1.0f32, 2.0f32
        let value = TensorValue::from_bytes(&bytes, DataType::F32, &[2]).unwrap();
        assert_eq!(value.as_f32(), Some(&[1.0, 2.0][..]));
        assert_eq!(value.size_bytes(), 8);
    }

    #[test]
    fn test_tensor_value_from_bytes_length_mismatch() {
        let err = TensorValue::from_bytes(&[0u8; 6], DataType::F32, &[2]).unwrap_err();
        assert!(err.to_string().contains("expected 8, got 6"));
    }

    #[test]
    #[should_panic(expected = "doesn't match shape")]
    fn test_tensor_value_new_validates_shape() {
        TensorValue::new(
            TensorData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            vec![2, 4],
            DataType::F32,
        );
    }

    #[test]
    fn test_tensor_shape() {
        let static_shape = TensorShape::Static(vec![1, 2, 3]);
        assert!(static_shape.is_static());
        assert_eq!(static_shape.ndim(), Some(3));

        let dynamic = TensorShape::Dynamic(vec![
            Dimension::Named("batch".to_string()),
            Dimension::Static(4),
        ]);
        assert!(!dynamic.is_static());
        assert_eq!(dynamic.ndim(), Some(2));
        assert_eq!(TensorShape::Unknown.ndim(), None);
    }
}
