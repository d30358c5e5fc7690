//! Built-in execution providers.

pub mod cpu;

pub use cpu::{CPU_EXECUTION_PROVIDER, CpuDataTransfer, CpuExecutionProvider, cpu_kernel_registry};
