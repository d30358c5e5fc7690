//! Indexed collection of kernel implementations.

use crate::kernel_def::KernelDef;
use crate::op_kernel::KernelCreateInfo;
use ferrite_core::{Error, Result};
#[cfg(feature = "structural-lookup")]
use ferrite_core::IrNode;
use std::collections::HashMap;

/// Registry key: operator, domain, provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KernelKey {
    op_name: String,
    domain: String,
    provider_type: String,
}

impl KernelKey {
    fn new(op_name: &str, domain: &str, provider_type: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            domain: domain.to_string(),
            provider_type: provider_type.to_string(),
        }
    }

    fn from_def(def: &KernelDef) -> Self {
        Self::new(def.op_name(), def.domain(), def.provider())
    }
}

/// Kernel implementations indexed for structural and fingerprint lookups.
///
/// Entries for the same operator may coexist across providers and across
/// disjoint version ranges. Overlapping ranges for the same operator and
/// provider are rejected at registration, so a fully specified node
/// matches at most one entry. A registry is populated once and then
/// shared read-only, typically behind an `Arc`.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernel_creator_fn_map: HashMap<KernelKey, Vec<KernelCreateInfo>>,
    kernel_def_hash_lookup: HashMap<u64, (KernelKey, usize)>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kernel.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationConflict` if an entry for the same operator and
    /// provider covers an overlapping version range, or if another entry
    /// already has the same fingerprint.
    pub fn register(&mut self, create_info: KernelCreateInfo) -> Result<()> {
        let key = KernelKey::from_def(&create_info.kernel_def);
        let hash = create_info.kernel_def.hash();

        if let Some(conflict) = self.kernel_creator_fn_map.get(&key).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.kernel_def.is_conflict(&create_info.kernel_def))
        }) {
            let (start, end) = conflict.kernel_def.since_version();
            return Err(Error::RegistrationConflict(format!(
                "Failed to add kernel for {} {} {}: Conflicting with a registered kernel with op versions [{}, {}]",
                key.op_name, key.domain, key.provider_type, start, end
            )));
        }

        if self.kernel_def_hash_lookup.contains_key(&hash) {
            return Err(Error::RegistrationConflict(format!(
                "Failed to add kernel for {} {} {}: kernel def hash {hash:#018x} is already registered",
                key.op_name, key.domain, key.provider_type
            )));
        }

        tracing::trace!(
            op_type = %key.op_name,
            domain = %key.domain,
            provider = %key.provider_type,
            hash,
            "kernel registered"
        );

        let entries = self.kernel_creator_fn_map.entry(key.clone()).or_default();
        entries.push(create_info);
        let idx = entries.len() - 1;
        self.kernel_def_hash_lookup.insert(hash, (key, idx));

        Ok(())
    }

    /// Find the kernel matching `node` on `provider_type`.
    ///
    /// An empty `provider_type` means the provider the node is placed on.
    ///
    /// # Errors
    ///
    /// Returns `KernelMismatch` when no entry matches. The message lists
    /// every entry that came close (right operator and provider, wrong
    /// version range).
    #[cfg(feature = "structural-lookup")]
    pub fn try_find_kernel(&self, node: &IrNode, provider_type: &str) -> Result<&KernelCreateInfo> {
        let expected_provider = if provider_type.is_empty() {
            node.execution_provider_type()
        } else {
            provider_type
        };

        let key = KernelKey::new(&node.op_type, &node.domain, expected_provider);
        let candidates = self.kernel_creator_fn_map.get(&key).ok_or_else(|| {
            Error::KernelMismatch(format!(
                "Kernel not found for op type ({}) domain ({}) on provider {}",
                node.op_type, node.domain, expected_provider
            ))
        })?;

        let mut mismatches = Vec::new();
        for candidate in candidates {
            if candidate.kernel_def.supports_version(node.since_version) {
                return Ok(candidate);
            }
            let (start, end) = candidate.kernel_def.since_version();
            mismatches.push(format!(
                "Op with name ({}) and type ({}) Version mismatch. node_version: {} kernel start version: {} kernel_end_version: {}",
                node.name, node.op_type, node.since_version, start, end
            ));
        }

        Err(Error::KernelMismatch(mismatches.join("\n")))
    }

    /// Whether some entry matches `node` on `provider_type`.
    #[cfg(feature = "structural-lookup")]
    pub fn has_implementation_of(&self, node: &IrNode, provider_type: &str) -> bool {
        self.try_find_kernel(node, provider_type).is_ok()
    }

    /// Find the entry whose definition fingerprint equals `hash`.
    pub fn try_find_kernel_by_hash(&self, hash: u64) -> Option<&KernelCreateInfo> {
        let (key, idx) = self.kernel_def_hash_lookup.get(&hash)?;
        self.kernel_creator_fn_map.get(key)?.get(*idx)
    }

    /// Iterate over every registered kernel definition.
    pub fn kernel_defs(&self) -> impl Iterator<Item = &KernelDef> {
        self.kernel_creator_fn_map
            .values()
            .flatten()
            .map(|entry| &entry.kernel_def)
    }

    pub fn len(&self) -> usize {
        self.kernel_def_hash_lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernel_def_hash_lookup.is_empty()
    }
}
