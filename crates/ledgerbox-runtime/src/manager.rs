//! Environment manager: the registry of runtime controllers.
//!
//! Keyed by environment name, the manager owns the port-allocation
//! policy and the drift check between persisted configuration and the
//! on-disk generated artifacts. Controllers of different environments
//! are fully independent.

use crate::controller::RuntimeController;
use crate::ports_alloc::PortAllocator;
use ledgerbox_core::{
    EnvironmentEventBus, RuntimeError, RuntimePorts, RuntimeSettings,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Registry of runtime controllers, one per named environment.
pub struct EnvironmentManager {
    ports: RuntimePorts,
    events: Arc<EnvironmentEventBus>,
    settings: RuntimeSettings,
    data_root: PathBuf,
    allocator: PortAllocator,
    runtimes: RwLock<HashMap<String, RuntimeController>>,
}

impl EnvironmentManager {
    /// Create a manager over the given ports.
    ///
    /// Constructed once at process start and passed by reference to
    /// consumers; there is no global instance.
    pub fn new(
        ports: RuntimePorts,
        events: Arc<EnvironmentEventBus>,
        settings: RuntimeSettings,
        data_root: PathBuf,
    ) -> Self {
        let allocator = PortAllocator::new(Arc::clone(&ports.port_probe));
        Self {
            ports,
            events,
            settings,
            data_root,
            allocator,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Get the in-memory controller for `name`, if one exists.
    pub async fn get_runtime(&self, name: &str) -> Option<RuntimeController> {
        self.runtimes.read().await.get(name).cloned()
    }

    /// Names of all in-memory controllers.
    pub async fn runtime_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.runtimes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Return the existing controller for `name`, or construct one.
    pub async fn ensure_runtime(
        &self,
        name: &str,
        port: Option<u16>,
        orgs: Option<u32>,
    ) -> Result<RuntimeController, RuntimeError> {
        if let Some(controller) = self.get_runtime(name).await {
            return Ok(controller);
        }
        self.add_runtime(name, port, orgs).await
    }

    /// Construct and register a controller for `name`.
    ///
    /// An omitted port is read from the settings store, or freshly
    /// allocated and persisted. An omitted organization count must be
    /// resolvable from the persisted descriptor; otherwise this fails
    /// fast with a configuration error, before any process is spawned.
    pub async fn add_runtime(
        &self,
        name: &str,
        port: Option<u16>,
        orgs: Option<u32>,
    ) -> Result<RuntimeController, RuntimeError> {
        let port = match port {
            Some(port) => port,
            None => self.resolve_port(name).await?.0,
        };

        let orgs = match orgs {
            Some(orgs) => orgs,
            None => match self.ports.registry.get(name).await {
                Ok(descriptor) if descriptor.num_organizations > 0 => {
                    descriptor.num_organizations
                }
                _ => {
                    return Err(RuntimeError::Configuration(format!(
                        "cannot add environment {name}: number of organizations is not configured"
                    )));
                }
            },
        };

        debug!(environment = %name, port, orgs, "Registering runtime controller");
        let controller = RuntimeController::new(
            name,
            port,
            orgs,
            self.environment_directory(name),
            self.ports.clone(),
            Arc::clone(&self.events),
            &self.settings,
        );
        self.runtimes
            .write()
            .await
            .insert(name.to_string(), controller.clone());
        Ok(controller)
    }

    /// Discard the in-memory controller for `name`.
    ///
    /// The environment's on-disk state is untouched.
    pub async fn remove_runtime(&self, name: &str) {
        self.runtimes.write().await.remove(name);
    }

    /// Idempotent environment bring-up.
    ///
    /// Reuses the persisted port when one exists, otherwise allocates
    /// and persists a new one. Materializes the environment on disk if
    /// needed. When the environment is created but its persisted URL no
    /// longer reflects the configured port, the drift self-heals through
    /// an automatic teardown, which recreates internally.
    pub async fn initialize(
        &self,
        name: &str,
        orgs: u32,
    ) -> Result<RuntimeController, RuntimeError> {
        let (port, settings_updated) = self.resolve_port(name).await?;
        if settings_updated {
            info!(environment = %name, port, "Assigned new environment port");
        }

        let controller = self.ensure_runtime(name, Some(port), Some(orgs)).await?;

        if controller.is_created().await {
            if let Ok(descriptor) = self.ports.registry.get(name).await {
                if !descriptor.url_matches_port(port) {
                    warn!(
                        environment = %name,
                        url = %descriptor.url,
                        port,
                        "Port drifted from persisted environment, recreating"
                    );
                    controller.teardown(None).await?;
                }
            }
        } else {
            controller.create().await?;
        }

        Ok(controller)
    }

    /// Construct controllers for every persisted managed environment.
    ///
    /// Called at process start so existing environments are operable
    /// without an explicit `initialize`.
    pub async fn rehydrate(&self) -> Result<(), RuntimeError> {
        for descriptor in self.ports.registry.list().await? {
            if !descriptor.managed_runtime {
                continue;
            }
            if self.get_runtime(&descriptor.name).await.is_some() {
                continue;
            }
            debug!(environment = %descriptor.name, "Rehydrating runtime controller");
            let controller = RuntimeController::new(
                descriptor.name.clone(),
                descriptor.port,
                descriptor.num_organizations,
                descriptor.directory.clone(),
                self.ports.clone(),
                Arc::clone(&self.events),
                &self.settings,
            );
            self.runtimes
                .write()
                .await
                .insert(descriptor.name, controller);
        }
        Ok(())
    }

    /// Resolve the port for `name`: persisted assignment when present,
    /// otherwise a fresh allocation that is persisted before returning.
    ///
    /// The bool reports whether the settings store was updated.
    async fn resolve_port(&self, name: &str) -> Result<(u16, bool), RuntimeError> {
        let assignments = self.ports.port_settings.get().await?;
        if let Some(&port) = assignments.get(name) {
            return Ok((port, false));
        }

        let port = self
            .allocator
            .generate_port_configuration(&assignments, self.settings.effective_base_port())
            .await?;
        self.ports
            .port_settings
            .update(BTreeMap::from([(name.to_string(), port)]))
            .await?;
        Ok((port, true))
    }

    fn environment_directory(&self, name: &str) -> PathBuf {
        self.data_root.join("environments").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestHarness;
    use ledgerbox_core::{
        DEFAULT_BASE_PORT, EnvironmentDescriptor, EnvironmentRegistry, LifecycleScript,
    };

    #[tokio::test]
    async fn test_initialize_allocates_persists_and_creates() {
        let harness = TestHarness::new();
        let manager = harness.manager();

        let controller = manager.initialize("demo", 2).await.unwrap();

        assert_eq!(harness.port_settings.assigned("demo"), Some(DEFAULT_BASE_PORT));
        assert_eq!(controller.port(), DEFAULT_BASE_PORT);
        assert_eq!(harness.generator.run_count(), 1);
        assert!(controller.is_created().await);
    }

    #[tokio::test]
    async fn test_initialize_reuses_persisted_port() {
        let harness = TestHarness::new();
        harness.port_settings.set("demo", 18200);
        let manager = harness.manager();

        let controller = manager.initialize("demo", 2).await.unwrap();

        assert_eq!(controller.port(), 18200);
        assert_eq!(harness.port_settings.assigned("demo"), Some(18200));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let harness = TestHarness::new();
        let manager = harness.manager();

        let first = manager.initialize("demo", 2).await.unwrap();
        let second = manager.initialize("demo", 2).await.unwrap();

        assert_eq!(first.port(), second.port());
        // Already created and in sync: no second generation
        assert_eq!(harness.generator.run_count(), 1);
    }

    #[tokio::test]
    async fn test_initialize_heals_port_drift_via_teardown() {
        let harness = TestHarness::new();
        harness.port_settings.set("demo", 9000);
        let manager = harness.manager();

        // Materialized environment whose URL still carries the old port
        let controller = manager.initialize("demo", 2).await.unwrap();
        let mut stale = harness.registry.get("demo").await.unwrap();
        stale.url = ledgerbox_core::console_url(8000);
        harness.registry.insert(stale);
        harness
            .executor
            .set_default(LifecycleScript::IsRunning, Err(1));

        manager.initialize("demo", 2).await.unwrap();

        // Exactly one teardown; the recreation happened inside it
        assert_eq!(harness.executor.count(LifecycleScript::Teardown), 1);
        assert_eq!(harness.generator.run_count(), 2);
        let healed = harness.registry.get("demo").await.unwrap();
        assert!(healed.url_matches_port(9000));
        drop(controller);
    }

    #[tokio::test]
    async fn test_allocation_skips_assigned_ports() {
        let harness = TestHarness::new();
        harness.port_settings.set("first", 17080);
        let manager = harness.manager();

        let controller = manager.initialize("second", 1).await.unwrap();

        assert!(controller.port() > 17080);
        assert_eq!(
            harness.port_settings.assigned("second"),
            Some(controller.port())
        );
    }

    #[tokio::test]
    async fn test_add_runtime_without_orgs_or_descriptor_fails_fast() {
        let harness = TestHarness::new();
        let manager = harness.manager();

        let result = manager.add_runtime("mystery", Some(17050), None).await;

        assert!(matches!(result, Err(RuntimeError::Configuration(_))));
        // Fail-fast: nothing was spawned or generated
        assert!(harness.executor.invocations().is_empty());
        assert_eq!(harness.generator.run_count(), 0);
    }

    #[tokio::test]
    async fn test_add_runtime_resolves_orgs_from_descriptor() {
        let harness = TestHarness::new();
        harness.registry.insert(EnvironmentDescriptor::new(
            "demo",
            17050,
            3,
            harness.data_root.path().join("environments/demo"),
        ));
        let manager = harness.manager();

        let controller = manager.add_runtime("demo", Some(17050), None).await.unwrap();
        assert_eq!(controller.num_organizations(), 3);
    }

    #[tokio::test]
    async fn test_ensure_runtime_returns_existing_controller() {
        let harness = TestHarness::new();
        let manager = harness.manager();

        let first = manager.ensure_runtime("demo", Some(17050), Some(1)).await.unwrap();
        let second = manager.ensure_runtime("demo", None, None).await.unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(first.port(), second.port());
    }

    #[tokio::test]
    async fn test_remove_runtime_keeps_disk_state() {
        let harness = TestHarness::new();
        let manager = harness.manager();

        let controller = manager.initialize("demo", 1).await.unwrap();
        assert!(controller.is_created().await);

        manager.remove_runtime("demo").await;
        assert!(manager.get_runtime("demo").await.is_none());
        // On-disk footprint and descriptor are untouched
        assert!(harness.registry.contains("demo"));
        assert!(controller.is_created().await);
    }

    #[tokio::test]
    async fn test_rehydrate_restores_managed_environments() {
        let harness = TestHarness::new();
        harness.registry.insert(EnvironmentDescriptor::new(
            "alpha",
            17050,
            1,
            harness.data_root.path().join("environments/alpha"),
        ));
        let mut unmanaged = EnvironmentDescriptor::new(
            "beta",
            17070,
            1,
            harness.data_root.path().join("environments/beta"),
        );
        unmanaged.managed_runtime = false;
        harness.registry.insert(unmanaged);

        let manager = harness.manager();
        manager.rehydrate().await.unwrap();

        assert_eq!(manager.runtime_names().await, vec!["alpha".to_string()]);
        let controller = manager.get_runtime("alpha").await.unwrap();
        assert_eq!(controller.port(), 17050);
    }
}
