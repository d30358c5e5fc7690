//! Intermediate representation for the model graph.
//!
//! The IR is a directed graph where:
//! - **Nodes** (`IrNode`) are operators (e.g., Add, MatMul, Reshape)
//! - **Edges** (`IrEdge`) are tensor value flows between operators
//!
//! Nodes start out unplaced. Partitioning assigns each node an execution
//! provider, and kernel resolution reads that assignment.

use crate::types::{AttributeValue, DataType, TensorShape, TensorValue};
use crate::{Error, Result};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::Topo;

use std::collections::HashMap;

/// Type alias for IR node identifiers (backed by petgraph NodeIndex).
pub type IrNodeId = NodeIndex;

/// Unique identifier for an edge (tensor flow) in the IR graph.
///
/// This is an index into `IrGraph::edges` and stays valid across node
/// removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IrEdgeId(pub usize);

impl IrEdgeId {
    /// Create a new edge ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0
    }
}

// ──────────────────────────────── IrGraph ────────────────────────────────

/// Intermediate representation graph.
///
/// Nodes are operators; edges are tensor value flows stored in a side-table.
/// petgraph edges exist solely for topological ordering.
pub struct IrGraph {
    /// The graph structure (nodes only, no edge data).
    graph: StableGraph<IrNode, ()>,

    /// Edge metadata side-table.
    edges: Vec<IrEdge>,

    /// Lookup table: edge name -> edge ID.
    edge_by_name: HashMap<String, IrEdgeId>,

    /// Lookup table: edge ID -> producing node ID.
    edge_producer: HashMap<IrEdgeId, IrNodeId>,

    /// Lookup table: edge ID -> consuming node IDs.
    edge_consumers: HashMap<IrEdgeId, Vec<IrNodeId>>,

    /// Graph input edge IDs.
    pub inputs: Vec<IrEdgeId>,

    /// Graph output edge IDs.
    pub outputs: Vec<IrEdgeId>,
}

impl IrGraph {
    /// Create a new empty IR graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            edges: Vec::new(),
            edge_by_name: HashMap::new(),
            edge_producer: HashMap::new(),
            edge_consumers: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    // ── Node access ──

    /// Get an immutable reference to a node.
    pub fn node(&self, id: IrNodeId) -> Result<&IrNode> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, id: IrNodeId) -> Result<&mut IrNode> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Iterate over all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = (IrNodeId, &IrNode)> {
        self.graph
            .node_indices()
            .filter_map(|id| self.graph.node_weight(id).map(|node| (id, node)))
    }

    /// Get the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Find a node by its name.
    ///
    /// # Errors
    ///
    /// Returns an error if no node with the given name exists.
    pub fn find_node_by_name(&self, name: &str) -> Result<IrNodeId> {
        self.nodes()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node '{}' not found", name)))
    }

    // ── Edge (tensor) access ──

    /// Get the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get an immutable reference to an edge.
    pub fn edge(&self, id: IrEdgeId) -> Result<&IrEdge> {
        self.edges
            .get(id.index())
            .ok_or_else(|| Error::InvalidGraph(format!("Edge {:?} not found", id)))
    }

    /// Iterate over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (IrEdgeId, &IrEdge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, edge)| (IrEdgeId::new(i), edge))
    }

    /// Look up an edge by name.
    pub fn edge_by_name(&self, name: &str) -> Option<IrEdgeId> {
        self.edge_by_name.get(name).copied()
    }

    /// Get the node that produces an edge, if any.
    pub fn edge_producer(&self, id: IrEdgeId) -> Option<IrNodeId> {
        self.edge_producer.get(&id).copied()
    }

    /// Get the nodes that consume an edge.
    pub fn edge_consumers(&self, id: IrEdgeId) -> Vec<IrNodeId> {
        self.edge_consumers.get(&id).cloned().unwrap_or_default()
    }

    /// Edges that carry a value before execution (initializers and constants).
    pub fn constant_initializers(&self) -> impl Iterator<Item = (IrEdgeId, &IrEdge)> {
        self.edges().filter(|(_, edge)| edge.data.is_compile_time())
    }

    // ── Graph mutation ──

    /// Add a new node to the graph and return its ID.
    ///
    /// This also updates the producer/consumer lookup tables and
    /// adds petgraph edges for topological ordering.
    pub fn add_node(&mut self, node: IrNode) -> IrNodeId {
        let outputs = node.outputs.clone();
        let inputs = node.inputs.clone();
        let node_id = self.graph.add_node(node);
        if let Some(node) = self.graph.node_weight_mut(node_id) {
            node.node_index = node_id;
        }

        for output_id in outputs {
            self.edge_producer.insert(output_id, node_id);
        }

        for input_id in inputs {
            self.edge_consumers.entry(input_id).or_default().push(node_id);

            if let Some(&producer_id) = self.edge_producer.get(&input_id) {
                self.graph.add_edge(producer_id, node_id, ());
            }
        }

        node_id
    }

    /// Remove a node from the graph.
    ///
    /// With `StableGraph`, other node indices remain valid.
    pub fn remove_node(&mut self, id: IrNodeId) -> Result<()> {
        let node = self.node(id)?.clone();

        for output_id in &node.outputs {
            self.edge_producer.remove(output_id);
        }

        for input_id in &node.inputs {
            if let Some(consumers) = self.edge_consumers.get_mut(input_id) {
                consumers.retain(|&c| c != id);
            }
        }

        self.graph.remove_node(id);

        Ok(())
    }

    /// Add an edge (tensor) to the graph and return its ID.
    pub fn add_edge(&mut self, edge: IrEdge) -> IrEdgeId {
        let id = IrEdgeId::new(self.edges.len());
        self.edge_by_name.insert(edge.name.clone(), id);
        self.edges.push(edge);
        id
    }

    // ── Graph queries ──

    /// Get the topological order of nodes in the graph.
    ///
    /// Returns nodes in an order such that all inputs to a node are produced
    /// before the node itself.
    pub fn topological_order(&self) -> Vec<IrNodeId> {
        let mut topo = Topo::new(&self.graph);
        let mut order = Vec::new();

        while let Some(id) = topo.next(&self.graph) {
            if self.graph.node_weight(id).is_some() {
                order.push(id);
            }
        }

        order
    }
}

impl Default for IrGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────── IrNode ─────────────────────────────────

/// A node in the IR graph: one operator instance.
#[derive(Debug, Clone)]
pub struct IrNode {
    /// Node name (from the model, may be empty).
    pub name: String,

    /// Operator type (e.g., "Add", "MatMul").
    pub op_type: String,

    /// Operator set domain. Empty for the default ONNX domain.
    pub domain: String,

    /// Opset version the operator resolves to.
    pub since_version: u32,

    /// Operator attributes (e.g., axis, epsilon, transpose flags).
    pub attributes: HashMap<String, AttributeValue>,

    /// Input edge IDs.
    pub inputs: Vec<IrEdgeId>,

    /// Output edge IDs.
    pub outputs: Vec<IrEdgeId>,

    /// Execution provider the node is placed on. Empty until placed.
    pub execution_provider: String,

    /// Kernel definition fingerprint recorded by a previous session.
    pub kernel_def_hash: Option<u64>,

    /// The graph node index (for efficient graph traversal).
    pub node_index: IrNodeId,
}

impl IrNode {
    /// Create a new unplaced operator node.
    pub fn new(op_type: impl Into<String>, since_version: u32) -> Self {
        Self {
            name: String::new(),
            op_type: op_type.into(),
            domain: String::new(),
            since_version,
            attributes: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            execution_provider: String::new(),
            kernel_def_hash: None,
            node_index: NodeIndex::default(),
        }
    }

    /// Set the node name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the operator set domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Place the node on an execution provider.
    pub fn with_provider(mut self, provider_type: impl Into<String>) -> Self {
        self.execution_provider = provider_type.into();
        self
    }

    /// Get the operator type.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// Get the execution provider type; empty when unplaced.
    pub fn execution_provider_type(&self) -> &str {
        &self.execution_provider
    }

    /// Whether the node has been assigned to an execution provider.
    pub fn is_placed(&self) -> bool {
        !self.execution_provider.is_empty()
    }

    /// Get input edge IDs.
    pub fn inputs(&self) -> &[IrEdgeId] {
        &self.inputs
    }

    /// Get output edge IDs.
    pub fn outputs(&self) -> &[IrEdgeId] {
        &self.outputs
    }

    /// Add an input edge.
    pub fn add_input(&mut self, edge_id: IrEdgeId) {
        self.inputs.push(edge_id);
    }

    /// Add an output edge.
    pub fn add_output(&mut self, edge_id: IrEdgeId) {
        self.outputs.push(edge_id);
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Get an attribute.
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

// ──────────────────────────────── EdgeData ───────────────────────────────

/// What data an edge carries before execution.
#[derive(Debug, Clone)]
pub enum EdgeData {
    /// No data; value arrives at runtime.
    Runtime,

    /// Raw little-endian weight bytes from the model file.
    Initializer(Vec<u8>),

    /// Fully evaluated constant.
    Constant(TensorValue),
}

impl EdgeData {
    /// Whether the edge carries data before execution.
    pub fn is_compile_time(&self) -> bool {
        !matches!(self, EdgeData::Runtime)
    }
}

// ──────────────────────────────── IrEdge ─────────────────────────────────

/// An edge (tensor value flow) in the IR graph.
#[derive(Debug, Clone)]
pub struct IrEdge {
    /// Tensor name (must be unique within the graph).
    pub name: String,

    /// Data type.
    pub dtype: DataType,

    /// Shape (static, dynamic, or absent).
    pub shape: TensorShape,

    /// Data carried by this edge before execution.
    pub data: EdgeData,
}

impl IrEdge {
    /// Create a new runtime edge (no compile-time data).
    pub fn new(name: impl Into<String>, dtype: DataType, shape: TensorShape) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            data: EdgeData::Runtime,
        }
    }

    /// Create a new edge with initializer data (weight).
    pub fn with_initializer(
        name: impl Into<String>,
        dtype: DataType,
        shape: TensorShape,
        initializer: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            data: EdgeData::Initializer(initializer),
        }
    }

    /// Create a new edge with a known constant value.
    pub fn with_constant(name: impl Into<String>, value: TensorValue) -> Self {
        Self {
            name: name.into(),
            dtype: value.dtype,
            shape: TensorShape::Static(value.shape.clone()),
            data: EdgeData::Constant(value),
        }
    }

    /// Resolve the edge's data into a tensor value, parsing initializer
    /// bytes when needed. Returns `None` for runtime edges.
    pub fn to_value(&self) -> Result<Option<TensorValue>> {
        match &self.data {
            EdgeData::Runtime => Ok(None),
            EdgeData::Constant(value) => Ok(Some(value.clone())),
            EdgeData::Initializer(bytes) => {
                let shape = self.shape.as_static().ok_or_else(|| {
                    Error::InvalidGraph(format!(
                        "Initializer '{}' has a non-static shape",
                        self.name
                    ))
                })?;
                TensorValue::from_bytes(bytes, self.dtype, shape).map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TensorData;

    fn runtime_edge(graph: &mut IrGraph, name: &str) -> IrEdgeId {
        graph.add_edge(IrEdge::new(
            name,
            DataType::F32,
            TensorShape::Static(vec![2]),
        ))
    }

    #[test]
    fn test_create_empty_graph() {
        let graph = IrGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_node() {
        let mut graph = IrGraph::new();
        let input_id = runtime_edge(&mut graph, "input");
        let output_id = runtime_edge(&mut graph, "output");

        let mut node = IrNode::new("Relu", 14).with_name("relu0");
        node.add_input(input_id);
        node.add_output(output_id);
        let node_id = graph.add_node(node);

        let node = graph.node(node_id).unwrap();
        assert_eq!(node.op_type(), "Relu");
        assert_eq!(node.node_index, node_id);
        assert!(!node.is_placed());
        assert_eq!(graph.edge_producer(output_id), Some(node_id));
        assert_eq!(graph.edge_consumers(input_id), vec![node_id]);
        assert_eq!(graph.find_node_by_name("relu0").unwrap(), node_id);
    }

    #[test]
    fn test_remove_node() {
        let mut graph = IrGraph::new();
        let input_id = runtime_edge(&mut graph, "input");
        let output_id = runtime_edge(&mut graph, "output");

        let mut node = IrNode::new("Add", 7);
        node.add_input(input_id);
        node.add_output(output_id);
        let node_id = graph.add_node(node);

        graph.remove_node(node_id).unwrap();

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_producer(output_id), None);
        assert!(graph.edge_consumers(input_id).is_empty());
        assert!(graph.node(node_id).is_err());
    }

    #[test]
    fn test_topological_order() {
        let mut graph = IrGraph::new();
        let t0 = runtime_edge(&mut graph, "t0");
        let t1 = runtime_edge(&mut graph, "t1");
        let t2 = runtime_edge(&mut graph, "t2");
        let t3 = runtime_edge(&mut graph, "t3");

        let mut node_a = IrNode::new("A", 1);
        node_a.add_input(t0);
        node_a.add_output(t1);
        let id_a = graph.add_node(node_a);

        let mut node_b = IrNode::new("B", 1);
        node_b.add_input(t1);
        node_b.add_output(t2);
        let id_b = graph.add_node(node_b);

        let mut node_c = IrNode::new("C", 1);
        node_c.add_input(t2);
        node_c.add_output(t3);
        let id_c = graph.add_node(node_c);

        assert_eq!(graph.topological_order(), vec![id_a, id_b, id_c]);
    }

    #[test]
    fn test_constant_initializers() {
        let mut graph = IrGraph::new();
        runtime_edge(&mut graph, "x");
        let weight = graph.add_edge(IrEdge::with_initializer(
            "w",
            DataType::F32,
            TensorShape::Static(vec![1]),
            1.5f32.to_le_bytes().to_vec(),
        ));
        let bias = graph.add_edge(IrEdge::with_constant(
            "b",
            TensorValue::new(TensorData::I64(vec![3]), vec![1], DataType::I64),
        ));

        let ids: Vec<_> = graph.constant_initializers().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![weight, bias]);

        let value = graph.edge(weight).unwrap().to_value().unwrap().unwrap();
        assert_eq!(value.as_f32(), Some(&[1.5][..]));
    }
}
