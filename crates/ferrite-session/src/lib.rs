//! Session assembly for ferrite.
//!
//! An [`InferenceSession`] owns a graph, its execution providers and any
//! extra kernel registries. Initializing it places every node on a
//! provider, resolves a kernel per node through the tiered
//! [`KernelRegistryManager`](ferrite_framework::KernelRegistryManager)
//! and instantiates the kernels.

pub mod error;
pub mod options;
pub mod session;

pub use error::{Result, SessionError};
pub use options::SessionOptions;
pub use session::InferenceSession;
