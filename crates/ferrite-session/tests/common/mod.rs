//! Graph builders and test providers shared by session tests.

#![allow(dead_code)]

use ferrite_core::{DataType, IrEdge, IrGraph, IrNode, TensorData, TensorShape, TensorValue};
use ferrite_framework::{
    ExecutionProvider, KernelCreateInfo, KernelDefBuilder, KernelRegistry, OpKernel,
    OpKernelInfo, OpKernelMeta,
};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Create `x:[4] -> Add(x, bias) -> sum -> Relu -> y:[4]`.
///
/// `bias` is a constant initializer. Nodes are named `add0` and `relu0`
/// and start out unplaced.
pub fn make_add_relu_graph(add_version: u32, relu_version: u32) -> IrGraph {
    let mut graph = IrGraph::new();
    let shape = TensorShape::Static(vec![4]);

    let x = graph.add_edge(IrEdge::new("x", DataType::F32, shape.clone()));
    let bias = graph.add_edge(IrEdge::with_constant(
        "bias",
        TensorValue::new(TensorData::F32(vec![1.0; 4]), vec![4], DataType::F32),
    ));
    let sum = graph.add_edge(IrEdge::new("sum", DataType::F32, shape.clone()));
    let y = graph.add_edge(IrEdge::new("y", DataType::F32, shape));

    let mut add = IrNode::new("Add", add_version).with_name("add0");
    add.add_input(x);
    add.add_input(bias);
    add.add_output(sum);
    graph.add_node(add);

    let mut relu = IrNode::new("Relu", relu_version).with_name("relu0");
    relu.add_input(sum);
    relu.add_output(y);
    graph.add_node(relu);

    graph.inputs = vec![x];
    graph.outputs = vec![y];
    graph
}

pub struct NoopKernel(pub OpKernelMeta);

impl OpKernel for NoopKernel {
    fn meta(&self) -> &OpKernelMeta {
        &self.0
    }
}

/// A registry with one open-ended entry per `(op, since)` on `provider`.
pub fn registry_with(provider: &str, entries: &[(&str, u32)]) -> Arc<KernelRegistry> {
    let mut registry = KernelRegistry::new();
    for &(op, since) in entries {
        let def = KernelDefBuilder::new()
            .set_name(op)
            .since_version(since)
            .provider(provider)
            .build()
            .unwrap();
        registry
            .register(KernelCreateInfo::new(def, |info: &OpKernelInfo<'_>| {
                Box::new(NoopKernel(OpKernelMeta::from_info(info))) as Box<dyn OpKernel>
            }))
            .unwrap();
    }
    Arc::new(registry)
}

/// Accelerator stand-in with its own registry and no data transfer.
pub struct TestProvider {
    provider_type: String,
    registry: Arc<KernelRegistry>,
}

impl TestProvider {
    pub fn new(provider_type: &str, registry: Arc<KernelRegistry>) -> Arc<dyn ExecutionProvider> {
        Arc::new(Self {
            provider_type: provider_type.to_string(),
            registry,
        })
    }
}

impl ExecutionProvider for TestProvider {
    fn provider_type(&self) -> &str {
        &self.provider_type
    }

    fn kernel_registry(&self) -> Option<Arc<KernelRegistry>> {
        Some(Arc::clone(&self.registry))
    }
}
