//! Session-scoped resources handed to kernels at construction time.

use crate::data_transfer::DataTransferManager;
use crate::func_manager::FuncManager;
use crate::value_map::ValueNameIndexMap;
use ferrite_core::{IrGraph, Result, TensorValue};
use std::collections::HashMap;

/// Everything a kernel factory may read about its session.
///
/// Owns the placed graph, the dense value numbering, the constant
/// initializer values, the function manager, and the data-transfer
/// manager. Built once per session after placement.
pub struct SessionState {
    graph: IrGraph,
    value_name_idx_map: ValueNameIndexMap,
    constant_initialized_tensors: HashMap<usize, TensorValue>,
    func_mgr: FuncManager,
    data_transfer_mgr: DataTransferManager,
}

impl SessionState {
    /// Number every edge of `graph` and materialize its initializers.
    pub fn new(graph: IrGraph) -> Result<Self> {
        let mut value_name_idx_map = ValueNameIndexMap::new();
        for (_, edge) in graph.edges() {
            value_name_idx_map.add(&edge.name);
        }

        let mut constant_initialized_tensors = HashMap::new();
        for (_, edge) in graph.constant_initializers() {
            if let Some(value) = edge.to_value()? {
                let idx = value_name_idx_map.index(&edge.name)?;
                constant_initialized_tensors.insert(idx, value);
            }
        }

        tracing::debug!(
            num_values = value_name_idx_map.len(),
            num_initializers = constant_initialized_tensors.len(),
            "session state created"
        );

        Ok(Self {
            graph,
            value_name_idx_map,
            constant_initialized_tensors,
            func_mgr: FuncManager::new(),
            data_transfer_mgr: DataTransferManager::new(),
        })
    }

    pub fn graph(&self) -> &IrGraph {
        &self.graph
    }

    pub fn value_name_idx_map(&self) -> &ValueNameIndexMap {
        &self.value_name_idx_map
    }

    /// Initializer values keyed by value index.
    pub fn constant_initialized_tensors(&self) -> &HashMap<usize, TensorValue> {
        &self.constant_initialized_tensors
    }

    pub fn func_mgr(&self) -> &FuncManager {
        &self.func_mgr
    }

    pub fn func_mgr_mut(&mut self) -> &mut FuncManager {
        &mut self.func_mgr
    }

    pub fn data_transfer_mgr(&self) -> &DataTransferManager {
        &self.data_transfer_mgr
    }

    pub fn data_transfer_mgr_mut(&mut self) -> &mut DataTransferManager {
        &mut self.data_transfer_mgr
    }
}
