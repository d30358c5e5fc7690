//! Error types for the session crate.

use ferrite_core::ErrorCode;
use thiserror::Error;

/// Session assembly errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `initialize` was called more than once.
    #[error("Session has already been initialized")]
    AlreadyInitialized,

    /// A node is placed on a provider the session does not know.
    #[error("Unknown execution provider: {0}")]
    UnknownProvider(String),

    /// A node's recorded kernel fingerprint matches no registered kernel.
    #[error("Kernel hash not found: {0}")]
    KernelHashNotFound(String),

    /// A node's recorded kernel fingerprint names a kernel for another
    /// operator or provider.
    #[error("Kernel hash mismatch: {0}")]
    KernelHashMismatch(String),

    /// Structural resolution was needed but is compiled out.
    #[error("Structural kernel lookup is disabled: {0}")]
    StructuralLookupDisabled(String),

    #[error(transparent)]
    Core(#[from] ferrite_core::Error),
}

impl SessionError {
    /// Stable category of the error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::AlreadyInitialized => ErrorCode::InvalidArgument,
            SessionError::UnknownProvider(_) | SessionError::KernelHashMismatch(_) => {
                ErrorCode::InvalidGraph
            }
            SessionError::KernelHashNotFound(_) | SessionError::StructuralLookupDisabled(_) => {
                ErrorCode::NotImplemented
            }
            SessionError::Core(err) => err.code(),
        }
    }
}

/// Specialized Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
