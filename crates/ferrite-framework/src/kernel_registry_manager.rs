//! Tiered kernel resolution across many registries.
//!
//! Registries are consulted in a fixed tier order:
//! 1. **Custom** registries supplied by the embedder, most recent first
//! 2. The **special** registry for the node's provider, if any
//! 3. The **stock** registry the provider itself ships
//!
//! The first tier that yields a kernel wins. This lets embedders override
//! provider kernels while still letting each provider supply defaults.

use crate::execution_provider::ExecutionProvider;
use crate::kernel_registry::KernelRegistry;
use crate::op_kernel::{KernelCreateInfo, OpKernel, OpKernelInfo};
use crate::session_state::SessionState;
use ferrite_core::{Error, IrNode, Result};
use std::collections::HashMap;
#[cfg(feature = "custom-registries")]
use std::collections::VecDeque;
use std::sync::Arc;

/// Priority tier of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegistryTier {
    /// Embedder-supplied registries, any provider.
    Custom,

    /// Per-provider overrides of the stock registry.
    Special,

    /// Registries shipped by the session's execution providers.
    Stock,
}

impl RegistryTier {
    /// Tiers in lookup order.
    pub const LOOKUP_ORDER: [RegistryTier; 3] =
        [RegistryTier::Custom, RegistryTier::Special, RegistryTier::Stock];
}

/// Resolves graph nodes and kernel fingerprints to kernel implementations.
///
/// One manager exists per session. It is populated while the session is
/// built and only read afterwards. The registries themselves are shared
/// and never mutated here.
#[derive(Debug, Default)]
pub struct KernelRegistryManager {
    #[cfg(feature = "custom-registries")]
    custom_kernel_registries: VecDeque<Arc<KernelRegistry>>,
    special_provider_registries: HashMap<String, Arc<KernelRegistry>>,
    stock_provider_registries: HashMap<String, Arc<KernelRegistry>>,
}

impl KernelRegistryManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──

    /// Register the stock registry of every provider, keyed by provider type.
    ///
    /// Providers without a registry are skipped. Providers registered before
    /// a failure stay registered.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateProvider` if a provider's type already has a stock
    /// registry.
    pub fn register_kernels<'a, I>(&mut self, providers: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Arc<dyn ExecutionProvider>>,
    {
        for provider in providers {
            let provider_type = provider.provider_type();
            if self.stock_provider_registries.contains_key(provider_type) {
                return Err(Error::DuplicateProvider(format!(
                    "found duplicated provider {provider_type} in KernelRegistryManager"
                )));
            }

            let Some(registry) = provider.kernel_registry() else {
                tracing::debug!(provider = provider_type, "provider has no kernel registry");
                continue;
            };

            tracing::debug!(
                provider = provider_type,
                num_kernels = registry.len(),
                "registered stock kernel registry"
            );
            self.stock_provider_registries
                .insert(provider_type.to_string(), registry);
        }
        Ok(())
    }

    /// Register a registry that takes precedence over the stock registry of
    /// `provider_type`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `registry` is `None`, and
    /// `DuplicateProvider` if `provider_type` already has a special registry.
    pub fn register_special_kernel_registry(
        &mut self,
        provider_type: &str,
        registry: Option<Arc<KernelRegistry>>,
    ) -> Result<()> {
        let registry = registry.ok_or_else(|| {
            Error::InvalidArgument("Kernel registry cannot be null".to_string())
        })?;

        if self.special_provider_registries.contains_key(provider_type) {
            return Err(Error::DuplicateProvider(format!(
                "Found duplicated provider {provider_type} in special provider registry in KernelRegistryManager"
            )));
        }

        tracing::debug!(
            provider = provider_type,
            num_kernels = registry.len(),
            "registered special kernel registry"
        );
        self.special_provider_registries
            .insert(provider_type.to_string(), registry);
        Ok(())
    }

    /// Register an embedder-supplied registry ahead of all earlier ones.
    ///
    /// `None` is ignored. Overlapping registries are allowed; the most
    /// recently registered one wins.
    #[cfg(feature = "custom-registries")]
    pub fn register_kernel_registry(&mut self, registry: Option<Arc<KernelRegistry>>) {
        let Some(registry) = registry else {
            return;
        };
        tracing::debug!(
            num_kernels = registry.len(),
            position = 0,
            "registered custom kernel registry"
        );
        self.custom_kernel_registries.push_front(registry);
    }

    // ── Tier access ──

    /// Registries of one tier that apply to `provider_type`, in lookup order.
    ///
    /// Custom registries apply to every provider.
    pub fn registries_for(&self, tier: RegistryTier, provider_type: &str) -> Vec<&KernelRegistry> {
        match tier {
            RegistryTier::Custom => self.custom_registries().collect(),
            RegistryTier::Special => self
                .special_provider_registries
                .get(provider_type)
                .map(|r| r.as_ref())
                .into_iter()
                .collect(),
            RegistryTier::Stock => self
                .stock_provider_registries
                .get(provider_type)
                .map(|r| r.as_ref())
                .into_iter()
                .collect(),
        }
    }

    /// Every registry of one tier, regardless of provider.
    ///
    /// Special and stock registries come back in no particular order.
    pub fn all_registries(&self, tier: RegistryTier) -> Vec<&KernelRegistry> {
        match tier {
            RegistryTier::Custom => self.custom_registries().collect(),
            RegistryTier::Special => self
                .special_provider_registries
                .values()
                .map(|r| r.as_ref())
                .collect(),
            RegistryTier::Stock => self
                .stock_provider_registries
                .values()
                .map(|r| r.as_ref())
                .collect(),
        }
    }

    /// All registries that apply to `provider_type`, across tiers.
    pub fn get_kernel_registries_by_provider_type(
        &self,
        provider_type: &str,
    ) -> Vec<&KernelRegistry> {
        RegistryTier::LOOKUP_ORDER
            .iter()
            .flat_map(|&tier| self.registries_for(tier, provider_type))
            .collect()
    }

    /// The stock registry of `provider_type`, if one was registered.
    pub fn stock_registry(&self, provider_type: &str) -> Option<&Arc<KernelRegistry>> {
        self.stock_provider_registries.get(provider_type)
    }

    /// The special registry of `provider_type`, if one was registered.
    pub fn special_registry(&self, provider_type: &str) -> Option<&Arc<KernelRegistry>> {
        self.special_provider_registries.get(provider_type)
    }

    #[cfg(feature = "custom-registries")]
    fn custom_registries(&self) -> impl Iterator<Item = &KernelRegistry> {
        self.custom_kernel_registries.iter().map(|r| r.as_ref())
    }

    #[cfg(not(feature = "custom-registries"))]
    fn custom_registries(&self) -> impl Iterator<Item = &KernelRegistry> {
        std::iter::empty()
    }

    // ── Lookup ──

    /// Whether any registry applicable to `provider_type` can run `node`
    /// there.
    #[cfg(feature = "structural-lookup")]
    pub fn has_implementation_of(&self, node: &IrNode, provider_type: &str) -> bool {
        self.get_kernel_registries_by_provider_type(provider_type)
            .iter()
            .any(|registry| registry.has_implementation_of(node, provider_type))
    }

    /// Resolve the kernel for a placed node.
    ///
    /// # Errors
    ///
    /// - `NodeNotPlaced` if the node has no execution provider.
    /// - `NotImplemented` if no tier has a matching kernel. The message
    ///   names the operator, its version, the node, and the last near miss.
    #[cfg(feature = "structural-lookup")]
    pub fn search_kernel_registry(&self, node: &IrNode) -> Result<&KernelCreateInfo> {
        let provider_type = node.execution_provider_type();
        if provider_type.is_empty() {
            return Err(Error::NodeNotPlaced(node_error_message(
                "The node is not placed on any Execution Provider. ",
                node,
                None,
            )));
        }

        let mut last_error = None;
        for tier in RegistryTier::LOOKUP_ORDER {
            for registry in self.registries_for(tier, provider_type) {
                match registry.try_find_kernel(node, "") {
                    Ok(create_info) => {
                        tracing::trace!(
                            op_type = %node.op_type,
                            node = %node.name,
                            provider = provider_type,
                            ?tier,
                            "kernel resolved"
                        );
                        return Ok(create_info);
                    }
                    Err(err) => last_error = Some(err),
                }
            }
        }

        let message = node_error_message("Failed to find kernel for ", node, last_error.as_ref());
        tracing::warn!(provider = provider_type, "{message}");
        Err(Error::NotImplemented(message))
    }

    /// Resolve a kernel from its definition fingerprint.
    ///
    /// Tiers are scanned in the same order as [`search_kernel_registry`],
    /// but every registry of a tier is consulted, whatever its provider.
    /// A miss is `None`, not an error.
    ///
    /// [`search_kernel_registry`]: Self::search_kernel_registry
    pub fn search_kernel_registries_by_hash(&self, kernel_def_hash: u64) -> Option<&KernelCreateInfo> {
        RegistryTier::LOOKUP_ORDER.iter().find_map(|&tier| {
            self.all_registries(tier)
                .into_iter()
                .find_map(|registry| registry.try_find_kernel_by_hash(kernel_def_hash))
        })
    }

    // ── Instantiation ──

    /// Instantiate the kernel described by `create_info` for `node`.
    ///
    /// Applicability was established by the lookup that produced
    /// `create_info`; construction failures are the factory's to raise.
    pub fn create_kernel(
        &self,
        node: &IrNode,
        execution_provider: &dyn ExecutionProvider,
        session_state: &SessionState,
        create_info: &KernelCreateInfo,
    ) -> Box<dyn OpKernel> {
        let kernel_info = OpKernelInfo::new(
            node,
            &create_info.kernel_def,
            execution_provider,
            session_state.graph(),
            session_state.constant_initialized_tensors(),
            session_state.value_name_idx_map(),
            session_state.func_mgr(),
            session_state.data_transfer_mgr(),
        );

        (create_info.kernel_create_func)(&kernel_info)
    }
}

/// `"<prefix>Add(7) (node add0). <last status>"`
#[cfg(feature = "structural-lookup")]
fn node_error_message(prefix: &str, node: &IrNode, last_error: Option<&Error>) -> String {
    let mut message = format!("{prefix}{}({})", node.op_type, node.since_version);
    if !node.name.is_empty() {
        message.push_str(&format!(" (node {}). ", node.name));
    }
    if let Some(err) = last_error {
        message.push_str(err.message());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        assert_eq!(
            RegistryTier::LOOKUP_ORDER,
            [RegistryTier::Custom, RegistryTier::Special, RegistryTier::Stock]
        );
        assert!(RegistryTier::Custom < RegistryTier::Stock);
    }

    #[test]
    fn test_empty_manager() {
        let manager = KernelRegistryManager::new();
        for tier in RegistryTier::LOOKUP_ORDER {
            assert!(manager.all_registries(tier).is_empty());
            assert!(manager.registries_for(tier, "CPU").is_empty());
        }
        assert!(manager.search_kernel_registries_by_hash(42).is_none());
    }

    #[cfg(not(feature = "custom-registries"))]
    #[test]
    fn test_custom_tier_is_empty_without_feature() {
        struct Cpu(Arc<KernelRegistry>);

        impl ExecutionProvider for Cpu {
            fn provider_type(&self) -> &str {
                "CPU"
            }

            fn kernel_registry(&self) -> Option<Arc<KernelRegistry>> {
                Some(Arc::clone(&self.0))
            }
        }

        let providers: Vec<Arc<dyn ExecutionProvider>> =
            vec![Arc::new(Cpu(Arc::new(KernelRegistry::new())))];
        let mut manager = KernelRegistryManager::new();
        manager.register_kernels(&providers).unwrap();

        assert!(manager.all_registries(RegistryTier::Custom).is_empty());
        assert_eq!(manager.get_kernel_registries_by_provider_type("CPU").len(), 1);
    }

    #[cfg(feature = "structural-lookup")]
    #[test]
    fn test_error_message_layout() {
        let node = IrNode::new("Add", 7).with_name("add0");
        let last = Error::KernelMismatch("near miss".to_string());
        assert_eq!(
            node_error_message("Failed to find kernel for ", &node, Some(&last)),
            "Failed to find kernel for Add(7) (node add0). near miss"
        );

        let unnamed = IrNode::new("Add", 7);
        assert_eq!(
            node_error_message("Failed to find kernel for ", &unnamed, None),
            "Failed to find kernel for Add(7)"
        );
    }
}
