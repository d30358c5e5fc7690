//! The CPU execution provider and its stock kernels.
//!
//! Kernels here capture their configuration at construction time; the
//! executor that runs them lives outside this crate.

use crate::data_transfer::{DataTransfer, Device, DeviceType};
use crate::execution_provider::ExecutionProvider;
use crate::kernel_def::KernelDefBuilder;
use crate::kernel_registry::KernelRegistry;
use crate::op_kernel::{KernelCreateInfo, OpKernel, OpKernelInfo, OpKernelMeta};
use ferrite_core::{Result, TensorValue};
use std::sync::Arc;

/// Provider type key of the CPU provider.
pub const CPU_EXECUTION_PROVIDER: &str = "CPUExecutionProvider";

/// Opset version ranges shipped for each operator. `None` is open-ended.
const ADD_VERSIONS: &[(u32, Option<u32>)] = &[(7, Some(12)), (13, Some(13)), (14, None)];
const MUL_VERSIONS: &[(u32, Option<u32>)] = &[(7, Some(12)), (13, Some(13)), (14, None)];
const RELU_VERSIONS: &[(u32, Option<u32>)] = &[(6, Some(12)), (13, Some(13)), (14, None)];
const RESHAPE_VERSIONS: &[(u32, Option<u32>)] = &[(5, Some(12)), (13, Some(13)), (14, None)];

/// Runs nodes on the host.
pub struct CpuExecutionProvider {
    registry: Arc<KernelRegistry>,
}

impl CpuExecutionProvider {
    pub fn new() -> Result<Self> {
        Ok(Self::with_registry(Arc::new(cpu_kernel_registry()?)))
    }

    /// Share an already-built registry, e.g. across sessions.
    pub fn with_registry(registry: Arc<KernelRegistry>) -> Self {
        Self { registry }
    }
}

impl ExecutionProvider for CpuExecutionProvider {
    fn provider_type(&self) -> &str {
        CPU_EXECUTION_PROVIDER
    }

    fn kernel_registry(&self) -> Option<Arc<KernelRegistry>> {
        Some(Arc::clone(&self.registry))
    }

    fn data_transfer(&self) -> Option<Box<dyn DataTransfer>> {
        Some(Box::new(CpuDataTransfer))
    }
}

/// Host-to-host copies.
pub struct CpuDataTransfer;

impl DataTransfer for CpuDataTransfer {
    fn can_copy(&self, src: &Device, dst: &Device) -> bool {
        src.device_type == DeviceType::Cpu && dst.device_type == DeviceType::Cpu
    }

    fn copy_tensor(&self, tensor: &TensorValue, _src: &Device, _dst: &Device) -> Result<TensorValue> {
        Ok(tensor.clone())
    }
}

/// Build the CPU provider's stock registry.
pub fn cpu_kernel_registry() -> Result<KernelRegistry> {
    let mut registry = KernelRegistry::new();

    register_versions(&mut registry, "Add", ADD_VERSIONS, |info| {
        Box::new(BinaryElementwiseKernel::new(info, BinaryOp::Add))
    })?;
    register_versions(&mut registry, "Mul", MUL_VERSIONS, |info| {
        Box::new(BinaryElementwiseKernel::new(info, BinaryOp::Mul))
    })?;
    register_versions(&mut registry, "Relu", RELU_VERSIONS, |info| {
        Box::new(ReluKernel {
            meta: OpKernelMeta::from_info(info),
        })
    })?;
    register_versions(&mut registry, "Reshape", RESHAPE_VERSIONS, |info| {
        Box::new(ReshapeKernel::new(info))
    })?;

    Ok(registry)
}

fn register_versions(
    registry: &mut KernelRegistry,
    op_name: &str,
    versions: &[(u32, Option<u32>)],
    create: fn(&OpKernelInfo<'_>) -> Box<dyn OpKernel>,
) -> Result<()> {
    for &(start, end) in versions {
        let builder = KernelDefBuilder::new()
            .set_name(op_name)
            .provider(CPU_EXECUTION_PROVIDER);
        let builder = match end {
            Some(end) => builder.since_version_range(start, end),
            None => builder.since_version(start),
        };
        registry.register(KernelCreateInfo::new(builder.build()?, create))?;
    }
    Ok(())
}

// ── Kernels ──

/// Binary elementwise operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Mul,
}

/// Add and Mul with numpy-style broadcasting.
pub struct BinaryElementwiseKernel {
    meta: OpKernelMeta,
    pub op: BinaryOp,
}

impl BinaryElementwiseKernel {
    fn new(info: &OpKernelInfo<'_>, op: BinaryOp) -> Self {
        Self {
            meta: OpKernelMeta::from_info(info),
            op,
        }
    }
}

impl OpKernel for BinaryElementwiseKernel {
    fn meta(&self) -> &OpKernelMeta {
        &self.meta
    }
}

pub struct ReluKernel {
    meta: OpKernelMeta,
}

impl OpKernel for ReluKernel {
    fn meta(&self) -> &OpKernelMeta {
        &self.meta
    }
}

/// Reshape, with the target shape captured when it is an initializer.
pub struct ReshapeKernel {
    meta: OpKernelMeta,
    pub allow_zero: bool,
    pub constant_shape: Option<Vec<i64>>,
}

impl ReshapeKernel {
    fn new(info: &OpKernelInfo<'_>) -> Self {
        let constant_shape = info
            .try_get_constant_input(1)
            .and_then(|value| value.as_i64())
            .map(<[i64]>::to_vec);

        Self {
            meta: OpKernelMeta::from_info(info),
            allow_zero: info.attr_i64_or("allowzero", 0) != 0,
            constant_shape,
        }
    }
}

impl OpKernel for ReshapeKernel {
    fn meta(&self) -> &OpKernelMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_core::{DataType, TensorData};

    #[test]
    fn test_stock_registry_contents() {
        let registry = cpu_kernel_registry().unwrap();
        assert_eq!(registry.len(), 12);
        assert!(registry
            .kernel_defs()
            .all(|def| def.provider() == CPU_EXECUTION_PROVIDER));
    }

    #[test]
    fn test_provider_shares_its_registry() {
        let registry = Arc::new(cpu_kernel_registry().unwrap());
        let provider = CpuExecutionProvider::with_registry(Arc::clone(&registry));

        let handed_out = provider.kernel_registry().unwrap();
        assert!(Arc::ptr_eq(&registry, &handed_out));
        assert_eq!(provider.provider_type(), CPU_EXECUTION_PROVIDER);
    }

    #[test]
    fn test_reshape_captures_constant_shape() {
        use crate::session_state::SessionState;
        use ferrite_core::{AttributeValue, IrEdge, IrGraph, IrNode, TensorShape};

        let mut graph = IrGraph::new();
        let data = graph.add_edge(IrEdge::new(
            "data",
            DataType::F32,
            TensorShape::Static(vec![4]),
        ));
        let shape = graph.add_edge(IrEdge::with_constant(
            "shape",
            TensorValue::new(TensorData::I64(vec![2, 0]), vec![2], DataType::I64),
        ));
        let mut node = IrNode::new("Reshape", 14)
            .with_name("r")
            .with_provider(CPU_EXECUTION_PROVIDER);
        node.add_input(data);
        node.add_input(shape);
        node.set_attribute("allowzero", AttributeValue::Int(1));
        let node_id = graph.add_node(node);

        let state = SessionState::new(graph).unwrap();
        let provider = CpuExecutionProvider::new().unwrap();
        let def = KernelDefBuilder::new()
            .set_name("Reshape")
            .since_version(14)
            .provider(CPU_EXECUTION_PROVIDER)
            .build()
            .unwrap();
        let info = OpKernelInfo::new(
            state.graph().node(node_id).unwrap(),
            &def,
            &provider,
            state.graph(),
            state.constant_initialized_tensors(),
            state.value_name_idx_map(),
            state.func_mgr(),
            state.data_transfer_mgr(),
        );

        let kernel = ReshapeKernel::new(&info);
        assert!(kernel.allow_zero);
        assert_eq!(kernel.constant_shape, Some(vec![2, 0]));
        assert_eq!(kernel.node_name(), "r");
    }

    #[test]
    fn test_cpu_data_transfer() {
        let transfer = CpuDataTransfer;
        let gpu = Device::new(DeviceType::Gpu, 0);
        assert!(transfer.can_copy(&Device::CPU, &Device::CPU));
        assert!(!transfer.can_copy(&Device::CPU, &gpu));

        let value = TensorValue::new(TensorData::F32(vec![1.0]), vec![1], DataType::F32);
        let copy = transfer.copy_tensor(&value, &Device::CPU, &Device::CPU).unwrap();
        assert_eq!(copy.as_f32(), Some(&[1.0][..]));
    }

    #[cfg(feature = "structural-lookup")]
    #[test]
    fn test_version_coverage() {
        use ferrite_core::IrNode;

        let registry = cpu_kernel_registry().unwrap();
        for version in [7, 12, 13, 14, 21] {
            let node = IrNode::new("Add", version).with_provider(CPU_EXECUTION_PROVIDER);
            assert!(registry.has_implementation_of(&node, ""), "Add({version})");
        }

        let node = IrNode::new("Add", 6).with_provider(CPU_EXECUTION_PROVIDER);
        assert!(!registry.has_implementation_of(&node, ""));
    }
}
