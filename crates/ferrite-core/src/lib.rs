//! Core graph representation, tensor types, and status errors for ferrite.
//!
//! This crate provides the foundational types every other ferrite crate
//! depends on:
//! - Graph-based IR (`IrGraph`, `IrNode`, `IrEdge`)
//! - Tensor metadata and compile-time values (`DataType`, `TensorValue`)
//! - The runtime-wide status type (`Error`, `ErrorCode`)

pub mod ir;
pub mod types;

pub use ir::{EdgeData, IrEdge, IrEdgeId, IrGraph, IrNode, IrNodeId};
pub use types::{AttributeValue, DataType, Dimension, TensorData, TensorShape, TensorValue};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable status category attached to every [`Error`].
///
/// Callers branch on the code; the message is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Generic failure (conflicting registrations, missing placement).
    Fail,

    /// A caller passed an argument that can never be valid.
    InvalidArgument,

    /// No kernel implementation exists for the request.
    NotImplemented,

    /// The graph is structurally inconsistent.
    InvalidGraph,
}

/// Core error type for ferrite operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate execution provider: {0}")]
    DuplicateProvider(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node not placed: {0}")]
    NodeNotPlaced(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Kernel mismatch: {0}")]
    KernelMismatch(String),

    #[error("Registration conflict: {0}")]
    RegistrationConflict(String),

    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Data transfer error: {0}")]
    DataTransfer(String),
}

impl Error {
    /// The stable category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DuplicateProvider(_)
            | Error::NodeNotPlaced(_)
            | Error::KernelMismatch(_)
            | Error::RegistrationConflict(_)
            | Error::DataTransfer(_) => ErrorCode::Fail,
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::NotImplemented(_) => ErrorCode::NotImplemented,
            Error::InvalidGraph(_) => ErrorCode::InvalidGraph,
        }
    }

    /// The message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::DuplicateProvider(msg)
            | Error::InvalidArgument(msg)
            | Error::NodeNotPlaced(msg)
            | Error::NotImplemented(msg)
            | Error::KernelMismatch(msg)
            | Error::RegistrationConflict(msg)
            | Error::InvalidGraph(msg)
            | Error::DataTransfer(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::DuplicateProvider("CPU".to_string()).code(),
            ErrorCode::Fail
        );
        assert_eq!(
            Error::InvalidArgument("null".to_string()).code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            Error::NotImplemented("Add(7)".to_string()).code(),
            ErrorCode::NotImplemented
        );
        assert_eq!(
            Error::InvalidGraph("cycle".to_string()).code(),
            ErrorCode::InvalidGraph
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotImplemented("Failed to find kernel for Add(9)".to_string());
        assert_eq!(
            err.to_string(),
            "Not implemented: Failed to find kernel for Add(9)"
        );
    }
}
