//! Kernel registration, resolution and instantiation for ferrite.
//!
//! This crate connects graph nodes to the code that runs them:
//! - Kernel definitions and their fingerprints (`KernelDef`)
//! - Per-provider kernel collections (`KernelRegistry`)
//! - Tiered resolution across registries (`KernelRegistryManager`)
//! - Execution providers and the resources kernels see at construction time
//!
//! Structural lookup (matching nodes against registry entries) and
//! embedder-supplied registries sit behind the `structural-lookup` and
//! `custom-registries` features. Both are on by default.

pub mod data_transfer;
pub mod execution_provider;
pub mod func_manager;
pub mod kernel_def;
pub mod kernel_registry;
pub mod kernel_registry_manager;
pub mod op_kernel;
pub mod providers;
pub mod session_state;
pub mod value_map;

// Re-export commonly used types
pub use data_transfer::{DataTransfer, DataTransferManager, Device, DeviceType};
pub use execution_provider::{ExecutionProvider, ExecutionProviders};
pub use func_manager::FuncManager;
pub use kernel_def::{KernelDef, KernelDefBuilder};
pub use kernel_registry::KernelRegistry;
pub use kernel_registry_manager::{KernelRegistryManager, RegistryTier};
pub use op_kernel::{KernelCreateFn, KernelCreateInfo, OpKernel, OpKernelInfo, OpKernelMeta};
pub use providers::{CPU_EXECUTION_PROVIDER, CpuExecutionProvider};
pub use session_state::SessionState;
pub use value_map::ValueNameIndexMap;
