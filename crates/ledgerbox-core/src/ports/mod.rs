//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the runtime expects from infrastructure:
//! the persisted environment registry, the port-assignment settings
//! store, script execution, free-port probing, the network generator and
//! the aggregated container log stream. They contain no implementation
//! details and use only domain types.

pub mod environment_registry;
pub mod free_port_probe;
pub mod log_aggregator;
pub mod network_generator;
pub mod output_sink;
pub mod port_settings;
pub mod script_executor;

use std::sync::Arc;
use thiserror::Error;

pub use environment_registry::EnvironmentRegistry;
pub use free_port_probe::FreePortProbe;
pub use log_aggregator::{ContainerFilter, ContainerLogEntry, LogAggregator};
pub use network_generator::{NetworkGenerator, NetworkRequest};
pub use output_sink::{ConsoleSink, NoopSink, OutputSink};
pub use port_settings::PortSettings;
pub use script_executor::ScriptExecutor;

/// Container for all infrastructure port trait objects.
///
/// This struct provides a consistent way to wire ports across command
/// surfaces without coupling them to concrete implementations. It lives
/// here so the runtime can accept it without depending on the adapters.
#[derive(Clone)]
pub struct RuntimePorts {
    /// Persisted environment descriptor store.
    pub registry: Arc<dyn EnvironmentRegistry>,
    /// Persisted `name -> port` assignment table.
    pub port_settings: Arc<dyn PortSettings>,
    /// Lifecycle script executor.
    pub executor: Arc<dyn ScriptExecutor>,
    /// Network topology generator.
    pub generator: Arc<dyn NetworkGenerator>,
    /// Free-port probe used by port allocation.
    pub port_probe: Arc<dyn FreePortProbe>,
    /// Aggregated container log stream.
    pub log_aggregator: Arc<dyn LogAggregator>,
}

impl RuntimePorts {
    /// Create a new ports container.
    pub fn new(
        registry: Arc<dyn EnvironmentRegistry>,
        port_settings: Arc<dyn PortSettings>,
        executor: Arc<dyn ScriptExecutor>,
        generator: Arc<dyn NetworkGenerator>,
        port_probe: Arc<dyn FreePortProbe>,
        log_aggregator: Arc<dyn LogAggregator>,
    ) -> Self {
        Self {
            registry,
            port_settings,
            executor,
            generator,
            port_probe,
            log_aggregator,
        }
    }
}

/// Errors from the persisted stores (environment registry, port map).
///
/// This error type abstracts away storage implementation details and
/// provides a clean interface for the runtime to handle storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entry was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error (filesystem, database, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Lifecycle script execution failure.
///
/// Carries enough context (command, arguments, exit code) for a caller to
/// report exactly which invocation failed.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The script process could not be spawned at all.
    #[error("Failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The script ran and exited with a non-zero code.
    #[error("`{command}` {args:?} exited with code {code}")]
    Exited {
        command: String,
        args: Vec<String>,
        code: i32,
    },

    /// The script process was terminated by a signal before exiting.
    #[error("`{command}` was terminated before exiting")]
    Terminated { command: String },

    /// An I/O failure occurred while supervising the running script.
    #[error("I/O error while running `{command}`: {reason}")]
    Io { command: String, reason: String },
}

impl ExecError {
    /// Exit code of the failed invocation, when one was observed.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code, .. } => Some(*code),
            Self::Spawn { .. } | Self::Terminated { .. } | Self::Io { .. } => None,
        }
    }
}

/// Network generator failure.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The requested network template is not known to the generator.
    #[error("Unknown network template: {0}")]
    UnknownTemplate(String),

    /// Materializing scripts or config failed.
    #[error("Failed to materialize network: {0}")]
    Io(String),
}

/// Canonical error type for runtime lifecycle operations.
///
/// Command surfaces map this to their own error reporting (exit codes,
/// panel notifications).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A persisted store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A lifecycle script failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The network generator failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Configuration error (missing or inconsistent configuration,
    /// detected before any process is spawned).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resource exhaustion (e.g. no free ports in the probed range).
    #[error("Resource exhaustion: {0}")]
    ResourceExhausted(String),

    /// Internal error (unexpected condition).
    #[error("Internal error: {0}")]
    Internal(String),
}
