//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter: the file-backed stores, the shell executor, the
//! compose generator, the docker log aggregator and the event bus.
//! Command handlers receive the fully-composed context and delegate to
//! the environment manager.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ledgerbox_core::{
    EnvironmentEventBus, EnvironmentRegistry, RuntimePorts, RuntimeSettings, validate_settings,
};
use ledgerbox_runtime::{
    ComposeNetworkGenerator, DockerLogAggregator, EnvironmentManager, FileEnvironmentRegistry,
    FilePortSettings, ShellScriptExecutor, TcpPortProbe,
};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Root directory for registry, settings and environment directories.
    pub data_root: PathBuf,
    /// Runtime settings.
    pub settings: RuntimeSettings,
}

impl CliConfig {
    /// Create config with default paths, honoring an explicit override.
    pub fn with_defaults(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_root = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("could not determine the user data directory")?
                .join("ledgerbox"),
        };
        Ok(Self {
            data_root,
            settings: RuntimeSettings::with_defaults(),
        })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// Registry of runtime controllers.
    pub manager: EnvironmentManager,
    /// Environment descriptor store, for listings.
    pub registry: Arc<dyn EnvironmentRegistry>,
    /// Lifecycle event bus.
    pub events: Arc<EnvironmentEventBus>,
}

/// Bootstrap the CLI application.
///
/// Wires the concrete adapters into an [`EnvironmentManager`] and
/// rehydrates controllers for every persisted environment.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    validate_settings(&config.settings)?;

    let registry: Arc<dyn EnvironmentRegistry> = Arc::new(FileEnvironmentRegistry::new(
        config.data_root.join("registry"),
    ));

    let mut executor = ShellScriptExecutor::new();
    if let Some(secs) = config.settings.chaincode_execute_timeout_secs {
        executor = executor.with_chaincode_timeout(secs);
    }

    let ports = RuntimePorts::new(
        Arc::clone(&registry),
        Arc::new(FilePortSettings::new(config.data_root.join("ports.json"))),
        Arc::new(executor),
        Arc::new(ComposeNetworkGenerator::new()),
        Arc::new(TcpPortProbe::new()),
        Arc::new(DockerLogAggregator::new()),
    );

    let events = Arc::new(EnvironmentEventBus::new());
    let manager = EnvironmentManager::new(
        ports,
        Arc::clone(&events),
        config.settings,
        config.data_root,
    );
    manager.rehydrate().await?;
    tracing::debug!(
        environments = manager.runtime_names().await.len(),
        "Rehydrated runtime controllers"
    );

    Ok(CliContext {
        manager,
        registry,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bootstrap_with_empty_data_root() {
        let temp = TempDir::new().unwrap();
        let config = CliConfig::with_defaults(Some(temp.path().to_path_buf())).unwrap();
        let ctx = bootstrap(config).await.unwrap();
        assert!(ctx.manager.runtime_names().await.is_empty());
    }
}
