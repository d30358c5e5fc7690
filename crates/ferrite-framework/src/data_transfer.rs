//! Cross-device tensor copies.

use ferrite_core::{Error, Result, TensorValue};
use std::fmt;

/// Kind of memory a tensor lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Cpu,
    Gpu,
    Npu,
}

/// A concrete device: kind plus ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub device_type: DeviceType,
    pub device_id: u16,
}

impl Device {
    pub const CPU: Device = Device {
        device_type: DeviceType::Cpu,
        device_id: 0,
    };

    pub fn new(device_type: DeviceType, device_id: u16) -> Self {
        Self {
            device_type,
            device_id,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.device_type, self.device_id)
    }
}

/// A copy routine between two kinds of devices.
///
/// Execution providers hand one of these to the session so that tensors
/// can cross provider boundaries.
pub trait DataTransfer: Send + Sync {
    /// Whether this transfer handles `src` to `dst`.
    fn can_copy(&self, src: &Device, dst: &Device) -> bool;

    /// Copy `tensor` from `src` to `dst`.
    fn copy_tensor(&self, tensor: &TensorValue, src: &Device, dst: &Device)
        -> Result<TensorValue>;
}

/// Ordered set of [`DataTransfer`] implementations.
///
/// The first registered transfer that can handle a device pair wins.
#[derive(Default)]
pub struct DataTransferManager {
    data_transfers: Vec<Box<dyn DataTransfer>>,
}

impl DataTransferManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_data_transfer(&mut self, data_transfer: Box<dyn DataTransfer>) {
        self.data_transfers.push(data_transfer);
    }

    pub fn get_data_transfer(&self, src: &Device, dst: &Device) -> Option<&dyn DataTransfer> {
        self.data_transfers
            .iter()
            .find(|transfer| transfer.can_copy(src, dst))
            .map(|transfer| transfer.as_ref())
    }

    pub fn copy_tensor(
        &self,
        tensor: &TensorValue,
        src: &Device,
        dst: &Device,
    ) -> Result<TensorValue> {
        let transfer = self.get_data_transfer(src, dst).ok_or_else(|| {
            Error::DataTransfer(format!(
                "There's no data transfer registered for copying tensors from {src} to {dst}"
            ))
        })?;
        transfer.copy_tensor(tensor, src, dst)
    }

    pub fn len(&self) -> usize {
        self.data_transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_transfers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_core::{DataType, TensorData};

    struct HostCopy;

    impl DataTransfer for HostCopy {
        fn can_copy(&self, src: &Device, dst: &Device) -> bool {
            src.device_type == DeviceType::Cpu && dst.device_type == DeviceType::Cpu
        }

        fn copy_tensor(
            &self,
            tensor: &TensorValue,
            _src: &Device,
            _dst: &Device,
        ) -> Result<TensorValue> {
            Ok(tensor.clone())
        }
    }

    #[test]
    fn test_copy_through_registered_transfer() {
        let mut manager = DataTransferManager::new();
        manager.register_data_transfer(Box::new(HostCopy));

        let tensor = TensorValue::new(TensorData::F32(vec![1.0, 2.0]), vec![2], DataType::F32);
        let copied = manager
            .copy_tensor(&tensor, &Device::CPU, &Device::CPU)
            .unwrap();
        assert_eq!(copied, tensor);
    }

    #[test]
    fn test_missing_transfer() {
        let mut manager = DataTransferManager::new();
        manager.register_data_transfer(Box::new(HostCopy));

        let gpu = Device::new(DeviceType::Gpu, 1);
        assert!(manager.get_data_transfer(&Device::CPU, &gpu).is_none());

        let tensor = TensorValue::new(TensorData::I64(vec![4]), vec![1], DataType::I64);
        let err = manager.copy_tensor(&tensor, &Device::CPU, &gpu).unwrap_err();
        assert!(err.message().contains("from Cpu:0 to Gpu:1"));
    }
}
