//! Core domain types and port definitions for ledgerbox.
//!
//! This crate contains the pure domain model of a locally-hosted sandbox
//! network environment (descriptors, runtime states, lifecycle scripts,
//! settings) plus the port traits the runtime expects from infrastructure.
//! It has no process or filesystem implementation details.

pub mod environment;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use environment::{EnvironmentDescriptor, LifecycleScript, RuntimeState, console_url};
pub use events::{EnvironmentEvent, EnvironmentEventBus};
pub use ports::{
    ConsoleSink, ContainerFilter, ContainerLogEntry, EnvironmentRegistry, ExecError,
    FreePortProbe, GeneratorError, LogAggregator, NetworkGenerator, NetworkRequest, NoopSink,
    OutputSink, PortSettings, RuntimeError, RuntimePorts, ScriptExecutor, StoreError,
};
pub use settings::{
    DEFAULT_BASE_PORT, DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_INTERVAL_SECS, RuntimeSettings,
    SettingsError, validate_settings,
};
