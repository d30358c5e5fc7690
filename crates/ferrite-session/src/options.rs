//! Session configuration.

/// Options controlling how a session resolves its kernels.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Identifier attached to the session's log records.
    pub session_log_id: String,

    /// Resolve nodes that carry a kernel fingerprint by hash instead of
    /// by structural match.
    pub honor_kernel_hashes: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_log_id: String::new(),
            honor_kernel_hashes: true,
        }
    }
}
