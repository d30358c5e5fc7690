//! Kernel definitions: what a kernel implements and for which provider.

use ferrite_core::{Error, Result};

/// Hash domain separator. Bump the suffix when the hashed layout changes.
const KERNEL_DEF_HASH_TAG: &[u8] = b"ferrite:kernel-def:v1";

/// Static description of one kernel implementation.
///
/// A kernel implements one operator (`op_name` in `domain`) for a
/// contiguous range of opset versions on one execution provider.
/// The definition is immutable once built; its fingerprint is computed
/// at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDef {
    op_name: String,
    domain: String,
    since_version_start: u32,
    since_version_end: u32,
    provider_type: String,
    hash: u64,
}

impl KernelDef {
    /// Operator type this kernel implements.
    pub fn op_name(&self) -> &str {
        &self.op_name
    }

    /// Operator set domain; empty for the default ONNX domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Inclusive opset version range. An open-ended range ends at `u32::MAX`.
    pub fn since_version(&self) -> (u32, u32) {
        (self.since_version_start, self.since_version_end)
    }

    /// Execution provider this kernel runs on.
    pub fn provider(&self) -> &str {
        &self.provider_type
    }

    /// 64-bit fingerprint of the definition.
    ///
    /// Stable across builds, so it can be persisted in serialized models
    /// and resolved later without a graph node.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Whether `version` falls inside the supported range.
    pub fn supports_version(&self, version: u32) -> bool {
        self.since_version_start <= version && version <= self.since_version_end
    }

    /// Whether both definitions target the same operator on the same
    /// provider with overlapping version ranges.
    pub fn is_conflict(&self, other: &KernelDef) -> bool {
        self.op_name == other.op_name
            && self.domain == other.domain
            && self.provider_type == other.provider_type
            && self.since_version_start <= other.since_version_end
            && other.since_version_start <= self.since_version_end
    }

    fn compute_hash(
        op_name: &str,
        domain: &str,
        start: u32,
        end: u32,
        provider_type: &str,
    ) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KERNEL_DEF_HASH_TAG);
        for field in [op_name, domain, provider_type] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(&start.to_le_bytes());
        hasher.update(&end.to_le_bytes());
        let hash = hasher.finalize();

        let mut raw = [0u8; 8];
        raw.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(raw)
    }
}

/// Builder for [`KernelDef`].
///
/// # Example
///
/// ```
/// use ferrite_framework::KernelDefBuilder;
///
/// let def = KernelDefBuilder::new()
///     .set_name("Add")
///     .since_version_range(7, 12)
///     .provider("CPUExecutionProvider")
///     .build()
///     .unwrap();
///
/// assert!(def.supports_version(7));
/// assert!(!def.supports_version(13));
/// ```
#[derive(Debug, Clone, Default)]
pub struct KernelDefBuilder {
    op_name: String,
    domain: String,
    since_version_start: u32,
    since_version_end: u32,
    provider_type: String,
}

impl KernelDefBuilder {
    pub fn new() -> Self {
        Self {
            since_version_start: 1,
            since_version_end: u32::MAX,
            ..Default::default()
        }
    }

    pub fn set_name(mut self, op_name: impl Into<String>) -> Self {
        self.op_name = op_name.into();
        self
    }

    pub fn set_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Supported from `since` onwards, with no upper bound.
    pub fn since_version(mut self, since: u32) -> Self {
        self.since_version_start = since;
        self.since_version_end = u32::MAX;
        self
    }

    /// Supported for `start..=end`.
    pub fn since_version_range(mut self, start: u32, end: u32) -> Self {
        self.since_version_start = start;
        self.since_version_end = end;
        self
    }

    pub fn provider(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = provider_type.into();
        self
    }

    pub fn build(self) -> Result<KernelDef> {
        if self.op_name.is_empty() {
            return Err(Error::InvalidArgument(
                "Kernel definition requires an operator name".to_string(),
            ));
        }
        if self.provider_type.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Kernel definition for {} requires a provider type",
                self.op_name
            )));
        }
        if self.since_version_start > self.since_version_end {
            return Err(Error::InvalidArgument(format!(
                "Kernel definition for {} has an empty version range [{}, {}]",
                self.op_name, self.since_version_start, self.since_version_end
            )));
        }

        let hash = KernelDef::compute_hash(
            &self.op_name,
            &self.domain,
            self.since_version_start,
            self.since_version_end,
            &self.provider_type,
        );

        Ok(KernelDef {
            op_name: self.op_name,
            domain: self.domain,
            since_version_start: self.since_version_start,
            since_version_end: self.since_version_end,
            provider_type: self.provider_type,
            hash,
        })
    }
}
