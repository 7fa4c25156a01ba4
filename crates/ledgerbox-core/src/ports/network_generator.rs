//! Network generator trait definition.
//!
//! The generator materializes an environment's lifecycle scripts and
//! config files on disk. Its internals (topology templates, connection
//! profiles, identities) are outside the runtime's concern; only this
//! contract is used.

use async_trait::async_trait;
use std::path::PathBuf;

use super::GeneratorError;

/// Parameters for one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    /// Directory the scripts and config are written into.
    pub destination: PathBuf,
    /// Environment name.
    pub name: String,
    /// Number of organizations in the topology.
    pub num_organizations: u32,
    /// Base port the service ports are derived from.
    pub port: u16,
}

/// Generator of environment lifecycle scripts and configuration.
#[async_trait]
pub trait NetworkGenerator: Send + Sync {
    /// Materialize the `start`/`stop`/`teardown`/`is_running`/
    /// `kill_chaincode` scripts and config for `request` at its
    /// destination, from the named template.
    async fn run(&self, template_id: &str, request: &NetworkRequest) -> Result<(), GeneratorError>;
}
