//! Environment domain types.
//!
//! An environment is a named local sandbox network instance with its own
//! port window, organization count, and generated lifecycle scripts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of an environment runtime.
///
/// `Stopped` is the implicit initial state. `Starting`, `Stopping` and
/// `Restarting` are transient and always resolve back to `Started` or
/// `Stopped` once the operation's cleanup probe has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeState {
    /// Environment start has been initiated.
    Starting,
    /// Environment processes are up and reachable.
    Started,
    /// Environment stop or teardown has been initiated.
    Stopping,
    /// Environment processes are down.
    Stopped,
    /// Environment is being stopped and started again.
    Restarting,
}

impl RuntimeState {
    /// Whether this state must still resolve to a steady state.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping | Self::Restarting)
    }
}

/// One of the generated lifecycle scripts of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleScript {
    Start,
    Stop,
    Teardown,
    IsRunning,
    KillChaincode,
}

impl LifecycleScript {
    /// All scripts the network generator materializes.
    pub const ALL: [Self; 5] = [
        Self::Start,
        Self::Stop,
        Self::Teardown,
        Self::IsRunning,
        Self::KillChaincode,
    ];

    /// Script name without the platform extension.
    #[must_use]
    pub const fn base_name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Teardown => "teardown",
            Self::IsRunning => "is_running",
            Self::KillChaincode => "kill_chaincode",
        }
    }

    /// Script file name for the current host platform.
    ///
    /// Windows hosts run `.cmd` scripts through the system shell, POSIX
    /// hosts run `.sh` scripts directly.
    #[must_use]
    pub fn file_name(self) -> String {
        if cfg!(windows) {
            format!("{}.cmd", self.base_name())
        } else {
            format!("{}.sh", self.base_name())
        }
    }
}

/// Console URL for an environment listening at `port`.
///
/// The URL embeds the port and doubles as the drift sentinel: when the
/// configured port changes underneath an existing environment, its
/// persisted URL no longer matches and the manager recreates it.
#[must_use]
pub fn console_url(port: u16) -> String {
    format!("http://console.127-0-0-1.nip.io:{port}")
}

/// Persisted description of a managed environment.
///
/// Owned by the environment registry; one runtime controller exists per
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    /// Unique environment name (registry key).
    pub name: String,
    /// Base port the environment's service ports are derived from.
    pub port: u16,
    /// Number of organizations in the network topology.
    pub num_organizations: u32,
    /// Directory holding the generated scripts and config.
    pub directory: PathBuf,
    /// Console URL, derived from `port`.
    pub url: String,
    /// Whether the runtime lifecycle is managed by this tool.
    pub managed_runtime: bool,
}

impl EnvironmentDescriptor {
    /// Create a descriptor for a managed environment, deriving the URL
    /// from the port.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        port: u16,
        num_organizations: u32,
        directory: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            num_organizations,
            directory,
            url: console_url(port),
            managed_runtime: true,
        }
    }

    /// Whether the persisted URL still reflects `port`.
    #[must_use]
    pub fn url_matches_port(&self, port: u16) -> bool {
        self.url.contains(&port.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&RuntimeState::Restarting).unwrap();
        assert_eq!(json, "\"restarting\"");
    }

    #[test]
    fn test_transient_states() {
        assert!(RuntimeState::Starting.is_transient());
        assert!(RuntimeState::Restarting.is_transient());
        assert!(!RuntimeState::Started.is_transient());
        assert!(!RuntimeState::Stopped.is_transient());
    }

    #[test]
    fn test_script_file_names() {
        let name = LifecycleScript::IsRunning.file_name();
        if cfg!(windows) {
            assert_eq!(name, "is_running.cmd");
        } else {
            assert_eq!(name, "is_running.sh");
        }
    }

    #[test]
    fn test_descriptor_url_matches_port() {
        let desc = EnvironmentDescriptor::new("demo", 9000, 2, PathBuf::from("/tmp/demo"));
        assert!(desc.url.contains("9000"));
        assert!(desc.url_matches_port(9000));
        assert!(!desc.url_matches_port(8000));
    }
}
