//! Kernel trait, kernel construction context, and kernel factories.

use crate::data_transfer::DataTransferManager;
use crate::execution_provider::ExecutionProvider;
use crate::func_manager::FuncManager;
use crate::kernel_def::KernelDef;
use crate::value_map::ValueNameIndexMap;
use ferrite_core::{AttributeValue, IrGraph, IrNode, TensorValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Construction-time context passed to a kernel factory.
///
/// Borrows the node being instantiated, the resolved kernel definition,
/// the provider the node is placed on, and the session-scoped resources.
/// Factories copy out whatever the kernel needs to keep.
pub struct OpKernelInfo<'a> {
    node: &'a IrNode,
    kernel_def: &'a KernelDef,
    execution_provider: &'a dyn ExecutionProvider,
    graph: &'a IrGraph,
    constant_initialized_tensors: &'a HashMap<usize, TensorValue>,
    value_name_idx_map: &'a ValueNameIndexMap,
    func_mgr: &'a FuncManager,
    data_transfer_mgr: &'a DataTransferManager,
}

impl<'a> OpKernelInfo<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node: &'a IrNode,
        kernel_def: &'a KernelDef,
        execution_provider: &'a dyn ExecutionProvider,
        graph: &'a IrGraph,
        constant_initialized_tensors: &'a HashMap<usize, TensorValue>,
        value_name_idx_map: &'a ValueNameIndexMap,
        func_mgr: &'a FuncManager,
        data_transfer_mgr: &'a DataTransferManager,
    ) -> Self {
        Self {
            node,
            kernel_def,
            execution_provider,
            graph,
            constant_initialized_tensors,
            value_name_idx_map,
            func_mgr,
            data_transfer_mgr,
        }
    }

    pub fn node(&self) -> &'a IrNode {
        self.node
    }

    pub fn kernel_def(&self) -> &'a KernelDef {
        self.kernel_def
    }

    pub fn execution_provider(&self) -> &'a dyn ExecutionProvider {
        self.execution_provider
    }

    pub fn value_name_idx_map(&self) -> &'a ValueNameIndexMap {
        self.value_name_idx_map
    }

    pub fn func_mgr(&self) -> &'a FuncManager {
        self.func_mgr
    }

    pub fn data_transfer_mgr(&self) -> &'a DataTransferManager {
        self.data_transfer_mgr
    }

    /// Get a node attribute by name.
    pub fn attr(&self, name: &str) -> Option<&'a AttributeValue> {
        self.node.attributes.get(name)
    }

    /// Get an i64 attribute, falling back to `default`.
    pub fn attr_i64_or(&self, name: &str, default: i64) -> i64 {
        match self.attr(name) {
            Some(AttributeValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// The constant value feeding input `index`, if that input is an
    /// initializer.
    pub fn try_get_constant_input(&self, index: usize) -> Option<&'a TensorValue> {
        let edge_id = self.node.inputs().get(index)?;
        let edge = self.graph.edge(*edge_id).ok()?;
        let idx = self.value_name_idx_map.index(&edge.name).ok()?;
        self.constant_initialized_tensors.get(&idx)
    }
}

/// What an instantiated kernel remembers about where it came from.
#[derive(Debug, Clone)]
pub struct OpKernelMeta {
    pub node_name: String,
    pub op_type: String,
    pub provider_type: String,
    pub kernel_def: KernelDef,
}

impl OpKernelMeta {
    pub fn from_info(info: &OpKernelInfo<'_>) -> Self {
        Self {
            node_name: info.node().name.clone(),
            op_type: info.node().op_type.clone(),
            provider_type: info.execution_provider().provider_type().to_string(),
            kernel_def: info.kernel_def().clone(),
        }
    }
}

/// An instantiated kernel, ready to be scheduled by an executor.
///
/// Kernels are only ever handled through this trait; factories return
/// them boxed and the caller owns the box.
pub trait OpKernel: Send + Sync {
    fn meta(&self) -> &OpKernelMeta;

    /// Name of the node this kernel was created for.
    fn node_name(&self) -> &str {
        &self.meta().node_name
    }
}

/// Factory producing a kernel from its construction context.
pub type KernelCreateFn = Arc<dyn Fn(&OpKernelInfo<'_>) -> Box<dyn OpKernel> + Send + Sync>;

/// A kernel definition paired with its factory.
#[derive(Clone)]
pub struct KernelCreateInfo {
    pub kernel_def: KernelDef,
    pub kernel_create_func: KernelCreateFn,
}

impl KernelCreateInfo {
    pub fn new<F>(kernel_def: KernelDef, create: F) -> Self
    where
        F: Fn(&OpKernelInfo<'_>) -> Box<dyn OpKernel> + Send + Sync + 'static,
    {
        Self {
            kernel_def,
            kernel_create_func: Arc::new(create),
        }
    }
}

impl fmt::Debug for KernelCreateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCreateInfo")
            .field("kernel_def", &self.kernel_def)
            .finish_non_exhaustive()
    }
}
