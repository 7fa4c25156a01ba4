//! Process runtime and OS-level concerns for ledgerbox.
//!
//! This crate implements the environment lifecycle: script execution,
//! port allocation, liveness probing, log streaming, the per-environment
//! runtime controller and the environment manager, plus the file-backed
//! and docker-based adapters of the core ports.

pub mod controller;
pub mod docker;
pub mod exec;
pub mod logs;
pub mod manager;
pub mod ports_alloc;
pub mod probe;
pub mod store;

#[cfg(test)]
mod testutil;

// Re-export the main lifecycle types
pub use controller::RuntimeController;
pub use manager::EnvironmentManager;

// Re-export the production port adapters
pub use docker::{ComposeNetworkGenerator, DockerLogAggregator};
pub use exec::ShellScriptExecutor;
pub use ports_alloc::{PortAllocator, TcpPortProbe, is_port_available};
pub use probe::LivenessProbe;
pub use store::{FileEnvironmentRegistry, FilePortSettings};

// Re-export log streaming for direct use if needed
pub use logs::LogStreamer;
