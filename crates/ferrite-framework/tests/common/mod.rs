//! Shared providers and registry builders for framework tests.

#![allow(dead_code)]

use ferrite_framework::{
    ExecutionProvider, KernelCreateInfo, KernelDefBuilder, KernelRegistry, OpKernel, OpKernelInfo,
    OpKernelMeta,
};
use std::sync::Arc;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Kernel that only remembers where it came from.
pub struct NoopKernel(pub OpKernelMeta);

impl OpKernel for NoopKernel {
    fn meta(&self) -> &OpKernelMeta {
        &self.0
    }
}

/// A kernel entry for `op` covering `[start, end]` on `provider`.
pub fn noop_create_info(op: &str, start: u32, end: u32, provider: &str) -> KernelCreateInfo {
    let def = KernelDefBuilder::new()
        .set_name(op)
        .since_version_range(start, end)
        .provider(provider)
        .build()
        .unwrap();
    KernelCreateInfo::new(def, |info: &OpKernelInfo<'_>| {
        Box::new(NoopKernel(OpKernelMeta::from_info(info))) as Box<dyn OpKernel>
    })
}

/// A shared registry holding one entry per `(op, start, end, provider)`.
pub fn registry_with(entries: &[(&str, u32, u32, &str)]) -> Arc<KernelRegistry> {
    let mut registry = KernelRegistry::new();
    for &(op, start, end, provider) in entries {
        registry
            .register(noop_create_info(op, start, end, provider))
            .unwrap();
    }
    Arc::new(registry)
}

/// Provider with a fixed type key and an optional registry.
pub struct TestProvider {
    provider_type: String,
    registry: Option<Arc<KernelRegistry>>,
}

impl TestProvider {
    pub fn new(provider_type: &str, registry: Option<Arc<KernelRegistry>>) -> Arc<dyn ExecutionProvider> {
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
        self.registry.clone()
    }
}
