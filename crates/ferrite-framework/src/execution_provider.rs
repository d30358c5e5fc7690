//! Execution provider trait and the ordered provider collection.

use crate::data_transfer::DataTransfer;
use crate::kernel_registry::KernelRegistry;
use ferrite_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A backend able to run some subset of graph nodes.
pub trait ExecutionProvider: Send + Sync {
    /// Unique type key, e.g. `"CPUExecutionProvider"`.
    fn provider_type(&self) -> &str;

    /// The kernels this provider ships, if it has any.
    fn kernel_registry(&self) -> Option<Arc<KernelRegistry>>;

    /// How to copy tensors to and from this provider's devices.
    fn data_transfer(&self) -> Option<Box<dyn DataTransfer>> {
        None
    }
}

/// Execution providers in priority order, unique by type.
#[derive(Default)]
pub struct ExecutionProviders {
    providers: Vec<Arc<dyn ExecutionProvider>>,
    provider_idx_map: HashMap<String, usize>,
}

impl ExecutionProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider at the lowest priority so far.
    pub fn add(&mut self, provider: Arc<dyn ExecutionProvider>) -> Result<()> {
        let provider_type = provider.provider_type().to_string();
        if self.provider_idx_map.contains_key(&provider_type) {
            return Err(Error::DuplicateProvider(format!(
                "Provider {provider_type} has already been registered"
            )));
        }
        self.provider_idx_map
            .insert(provider_type, self.providers.len());
        self.providers.push(provider);
        Ok(())
    }

    pub fn get(&self, provider_type: &str) -> Option<&Arc<dyn ExecutionProvider>> {
        self.provider_idx_map
            .get(provider_type)
            .map(|&idx| &self.providers[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn ExecutionProvider>> {
        self.providers.iter()
    }

    pub fn provider_types(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.provider_type())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExecutionProviders {
    type Item = &'a Arc<dyn ExecutionProvider>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn ExecutionProvider>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_core::ErrorCode;

    struct NamedProvider(&'static str);

    impl ExecutionProvider for NamedProvider {
        fn provider_type(&self) -> &str {
            self.0
        }

        fn kernel_registry(&self) -> Option<Arc<KernelRegistry>> {
            None
        }
    }

    #[test]
    fn test_priority_order_and_lookup() {
        let mut providers = ExecutionProviders::new();
        providers.add(Arc::new(NamedProvider("GPU"))).unwrap();
        providers.add(Arc::new(NamedProvider("CPU"))).unwrap();

        let order: Vec<_> = providers.provider_types().collect();
        assert_eq!(order, vec!["GPU", "CPU"]);
        assert_eq!(providers.get("CPU").unwrap().provider_type(), "CPU");
        assert!(providers.get("NPU").is_none());
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let mut providers = ExecutionProviders::new();
        providers.add(Arc::new(NamedProvider("CPU"))).unwrap();

        let err = providers.add(Arc::new(NamedProvider("CPU"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Fail);
        assert!(matches!(err, Error::DuplicateProvider(_)));
        assert_eq!(providers.len(), 1);
    }
}
