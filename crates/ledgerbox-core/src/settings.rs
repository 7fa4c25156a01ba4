//! Runtime settings domain types and validation.
//!
//! Pure domain types with no infrastructure dependencies. The persisted
//! `name -> port` assignment table is a separate concern, owned by the
//! [`crate::ports::PortSettings`] port.

use serde::{Deserialize, Serialize};

/// Default base port the first environment's port search starts at.
pub const DEFAULT_BASE_PORT: u16 = 17050;

/// Default number of liveness retry probes.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 10;

/// Default interval between liveness retry probes, in seconds.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 2;

/// Runtime settings.
///
/// All fields are optional to support partial configuration and graceful
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Base port for environment port allocation (first port in range).
    pub base_port: Option<u16>,

    /// Number of liveness retry probes in `wait_for`.
    pub probe_attempts: Option<u32>,

    /// Interval between liveness retry probes, in seconds.
    pub probe_interval_secs: Option<u64>,

    /// Chaincode execute timeout passed to the environment's processes,
    /// in seconds.
    pub chaincode_execute_timeout_secs: Option<u32>,
}

impl RuntimeSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            base_port: Some(DEFAULT_BASE_PORT),
            probe_attempts: Some(DEFAULT_PROBE_ATTEMPTS),
            probe_interval_secs: Some(DEFAULT_PROBE_INTERVAL_SECS),
            chaincode_execute_timeout_secs: None,
        }
    }

    /// Get the effective base port (with default fallback).
    #[must_use]
    pub const fn effective_base_port(&self) -> u16 {
        match self.base_port {
            Some(port) => port,
            None => DEFAULT_BASE_PORT,
        }
    }

    /// Get the effective probe attempt count (with default fallback).
    #[must_use]
    pub const fn effective_probe_attempts(&self) -> u32 {
        match self.probe_attempts {
            Some(attempts) => attempts,
            None => DEFAULT_PROBE_ATTEMPTS,
        }
    }

    /// Get the effective probe interval in seconds (with default fallback).
    #[must_use]
    pub const fn effective_probe_interval_secs(&self) -> u64 {
        match self.probe_interval_secs {
            Some(secs) => secs,
            None => DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Base port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidBasePort(u16),

    #[error("Probe attempts must be between 1 and 100, got {0}")]
    InvalidProbeAttempts(u32),

    #[error("Probe interval must be at least 1 second, got {0}")]
    InvalidProbeInterval(u64),
}

/// Validate settings values.
pub fn validate_settings(settings: &RuntimeSettings) -> Result<(), SettingsError> {
    if let Some(port) = settings.base_port {
        if port < 1024 {
            return Err(SettingsError::InvalidBasePort(port));
        }
    }

    if let Some(attempts) = settings.probe_attempts {
        if !(1..=100).contains(&attempts) {
            return Err(SettingsError::InvalidProbeAttempts(attempts));
        }
    }

    if let Some(secs) = settings.probe_interval_secs {
        if secs == 0 {
            return Err(SettingsError::InvalidProbeInterval(secs));
        }
    }

    Ok(())
}
