//! Inference session assembly.

use crate::error::{Result, SessionError};
use crate::options::SessionOptions;
use ferrite_core::{IrGraph, IrNode, IrNodeId};
use ferrite_framework::{
    ExecutionProvider, ExecutionProviders, KernelCreateInfo, KernelRegistry,
    KernelRegistryManager, OpKernel, SessionState,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A graph together with the providers and kernels that will run it.
///
/// Providers and registries are registered first, then [`initialize`]
/// places the graph's nodes, resolves one kernel per node and
/// instantiates it. A session is initialized at most once.
///
/// [`initialize`]: InferenceSession::initialize
pub struct InferenceSession {
    options: SessionOptions,
    graph: IrGraph,
    execution_providers: ExecutionProviders,
    kernel_registry_manager: KernelRegistryManager,
    session_state: Option<SessionState>,
    kernels: Vec<Box<dyn OpKernel>>,
    kernel_hashes: HashMap<String, u64>,
    initialize_called: bool,
}

impl InferenceSession {
    pub fn new(options: SessionOptions, graph: IrGraph) -> Self {
        Self {
            options,
            graph,
            execution_providers: ExecutionProviders::new(),
            kernel_registry_manager: KernelRegistryManager::new(),
            session_state: None,
            kernels: Vec::new(),
            kernel_hashes: HashMap::new(),
            initialize_called: false,
        }
    }

    /// Add a provider at the lowest placement priority so far.
    pub fn register_execution_provider(
        &mut self,
        provider: Arc<dyn ExecutionProvider>,
    ) -> Result<()> {
        self.ensure_not_initialized()?;
        tracing::debug!(
            session = %self.options.session_log_id,
            provider = provider.provider_type(),
            "registering execution provider"
        );
        self.execution_providers.add(provider)?;
        Ok(())
    }

    /// Add a registry that overrides every provider's kernels. Later
    /// registrations take precedence over earlier ones.
    #[cfg(feature = "custom-registries")]
    pub fn register_custom_registry(&mut self, registry: Arc<KernelRegistry>) -> Result<()> {
        self.ensure_not_initialized()?;
        self.kernel_registry_manager
            .register_kernel_registry(Some(registry));
        Ok(())
    }

    /// Add a registry that overrides the stock kernels of one provider.
    pub fn register_special_registry(
        &mut self,
        provider_type: &str,
        registry: Arc<KernelRegistry>,
    ) -> Result<()> {
        self.ensure_not_initialized()?;
        self.kernel_registry_manager
            .register_special_kernel_registry(provider_type, Some(registry))?;
        Ok(())
    }

    /// Place, resolve and instantiate every node of the graph.
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` on a second call, whether or not the first
    ///   one succeeded.
    /// - Any registration conflict among the session's providers.
    /// - The lookup error of the first node (in topological order) that
    ///   has no kernel.
    /// - `UnknownProvider` if a node resolves to a kernel of a provider
    ///   that was never registered with the session.
    #[tracing::instrument(skip_all, fields(session = %self.options.session_log_id, num_nodes = self.graph.node_count()))]
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_not_initialized()?;
        self.initialize_called = true;

        {
            let _span = tracing::debug_span!("register_kernels").entered();
            self.kernel_registry_manager
                .register_kernels(&self.execution_providers)?;
        }

        #[cfg(feature = "structural-lookup")]
        {
            let _span = tracing::debug_span!("place_nodes").entered();
            self.place_nodes()?;
        }

        let resolved = {
            let _span = tracing::debug_span!("resolve_kernels").entered();
            self.resolve_kernels()?
        };

        let mut session_state = SessionState::new(std::mem::take(&mut self.graph))?;
        for provider in &self.execution_providers {
            if let Some(data_transfer) = provider.data_transfer() {
                session_state
                    .data_transfer_mgr_mut()
                    .register_data_transfer(data_transfer);
            }
        }

        {
            let _span =
                tracing::debug_span!("create_kernels", num_kernels = resolved.len()).entered();
            let mut kernels = Vec::with_capacity(resolved.len());
            for (node_id, create_info) in &resolved {
                let node = session_state.graph().node(*node_id)?;
                let provider = self.provider_for(node, create_info)?;
                kernels.push(self.kernel_registry_manager.create_kernel(
                    node,
                    provider.as_ref(),
                    &session_state,
                    create_info,
                ));
            }
            self.kernels = kernels;
        }

        self.session_state = Some(session_state);
        tracing::info!(num_kernels = self.kernels.len(), "session initialized");
        Ok(())
    }

    // ── Initialization phases ──

    /// Assign each unplaced node to the first provider that implements it.
    ///
    /// Nodes resolved by recorded hash are placed during resolution instead.
    /// Nodes nobody implements stay unplaced and fail during resolution.
    #[cfg(feature = "structural-lookup")]
    fn place_nodes(&mut self) -> Result<()> {
        let unplaced: Vec<IrNodeId> = self
            .graph
            .nodes()
            .filter(|(_, node)| !node.is_placed() && self.recorded_hash(node).is_none())
            .map(|(id, _)| id)
            .collect();

        for node_id in unplaced {
            let node = self.graph.node(node_id)?;
            let chosen = self
                .execution_providers
                .provider_types()
                .find(|provider_type| {
                    self.kernel_registry_manager
                        .has_implementation_of(node, provider_type)
                })
                .map(str::to_string);

            match chosen {
                Some(provider_type) => {
                    tracing::trace!(
                        node = %node.name,
                        op_type = %node.op_type,
                        provider = %provider_type,
                        "node placed"
                    );
                    self.graph.node_mut(node_id)?.execution_provider = provider_type;
                }
                None => {
                    tracing::warn!(
                        node = %node.name,
                        op_type = %node.op_type,
                        version = node.since_version,
                        "no execution provider implements node"
                    );
                }
            }
        }
        Ok(())
    }

    fn resolve_kernels(&mut self) -> Result<Vec<(IrNodeId, KernelCreateInfo)>> {
        let mut resolved = Vec::with_capacity(self.graph.node_count());
        for node_id in self.graph.topological_order() {
            let node = self.graph.node(node_id)?;
            let create_info = self.resolve_kernel(node)?;
            self.provider_for(node, &create_info)?;

            if !node.name.is_empty() {
                self.kernel_hashes
                    .insert(node.name.clone(), create_info.kernel_def.hash());
            }

            // Only hash-resolved nodes reach here unplaced.
            if !node.is_placed() {
                let provider_type = create_info.kernel_def.provider().to_string();
                tracing::trace!(
                    node = %node.name,
                    op_type = %node.op_type,
                    provider = %provider_type,
                    "node placed by kernel hash"
                );
                self.graph.node_mut(node_id)?.execution_provider = provider_type;
            }
            resolved.push((node_id, create_info));
        }
        Ok(resolved)
    }

    /// The node's recorded fingerprint, if the session honors it.
    fn recorded_hash(&self, node: &IrNode) -> Option<u64> {
        node.kernel_def_hash
            .filter(|_| self.options.honor_kernel_hashes)
    }

    /// Resolve by recorded fingerprint when allowed, else structurally.
    ///
    /// A fingerprint must name a kernel for the node's operator and domain,
    /// and for the node's provider when the node is already placed.
    fn resolve_kernel(&self, node: &IrNode) -> Result<KernelCreateInfo> {
        let Some(hash) = self.recorded_hash(node) else {
            return self.search_kernel_registry(node);
        };

        let create_info = self
            .kernel_registry_manager
            .search_kernel_registries_by_hash(hash)
            .cloned()
            .ok_or_else(|| {
                SessionError::KernelHashNotFound(format!(
                    "{hash:#018x} for {}({}) (node {})",
                    node.op_type, node.since_version, node.name
                ))
            })?;

        let def = &create_info.kernel_def;
        if def.op_name() != node.op_type || def.domain() != node.domain {
            return Err(SessionError::KernelHashMismatch(format!(
                "{hash:#018x} names a kernel for {} in domain '{}' but node {} is {} in domain '{}'",
                def.op_name(),
                def.domain(),
                node.name,
                node.op_type,
                node.domain
            )));
        }
        if node.is_placed() && node.execution_provider_type() != def.provider() {
            return Err(SessionError::KernelHashMismatch(format!(
                "{hash:#018x} names a kernel for {} but node {} is placed on {}",
                def.provider(),
                node.name,
                node.execution_provider_type()
            )));
        }
        Ok(create_info)
    }

    #[cfg(feature = "structural-lookup")]
    fn search_kernel_registry(&self, node: &IrNode) -> Result<KernelCreateInfo> {
        Ok(self.kernel_registry_manager.search_kernel_registry(node)?.clone())
    }

    #[cfg(not(feature = "structural-lookup"))]
    fn search_kernel_registry(&self, node: &IrNode) -> Result<KernelCreateInfo> {
        Err(SessionError::StructuralLookupDisabled(format!(
            "{}({}) (node {}) carries no kernel hash",
            node.op_type, node.since_version, node.name
        )))
    }

    /// The session provider a resolved kernel was built for.
    fn provider_for(
        &self,
        node: &IrNode,
        create_info: &KernelCreateInfo,
    ) -> Result<&Arc<dyn ExecutionProvider>> {
        let provider_type = create_info.kernel_def.provider();
        self.execution_providers.get(provider_type).ok_or_else(|| {
            SessionError::UnknownProvider(format!(
                "{provider_type} (node {}, op {})",
                node.name, node.op_type
            ))
        })
    }

    fn ensure_not_initialized(&self) -> Result<()> {
        if self.initialize_called {
            return Err(SessionError::AlreadyInitialized);
        }
        Ok(())
    }

    // ── Accessors ──

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The graph; placed once the session is initialized.
    pub fn graph(&self) -> &IrGraph {
        match &self.session_state {
            Some(state) => state.graph(),
            None => &self.graph,
        }
    }

    pub fn execution_providers(&self) -> &ExecutionProviders {
        &self.execution_providers
    }

    pub fn kernel_registry_manager(&self) -> &KernelRegistryManager {
        &self.kernel_registry_manager
    }

    /// `None` until the session is initialized.
    pub fn session_state(&self) -> Option<&SessionState> {
        self.session_state.as_ref()
    }

    /// Instantiated kernels, in topological order of their nodes.
    pub fn kernels(&self) -> &[Box<dyn OpKernel>] {
        &self.kernels
    }

    /// Fingerprint of the kernel resolved for each named node.
    ///
    /// Writing these back as the nodes' `kernel_def_hash` lets a later
    /// session skip structural matching.
    pub fn kernel_hashes(&self) -> &HashMap<String, u64> {
        &self.kernel_hashes
    }

    pub fn is_initialized(&self) -> bool {
        self.session_state.is_some()
    }
}
