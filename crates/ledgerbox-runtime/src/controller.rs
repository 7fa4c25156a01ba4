//! Per-environment runtime controller.
//!
//! One controller exists per named environment. It owns the lifecycle
//! state machine, the busy flag, and the memoized in-flight liveness
//! check, and composes the script executor, liveness probe and log
//! streamer.
//!
//! Lifecycle calls are not serialized against each other: the busy flag
//! is observational, and callers are responsible for not racing, say,
//! `start` against `teardown` on the same controller. Controllers of
//! different environments are fully independent.

use crate::logs::LogStreamer;
use crate::probe::LivenessProbe;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use ledgerbox_core::{
    ConsoleSink, EnvironmentDescriptor, EnvironmentEvent, EnvironmentEventBus, LifecycleScript,
    NetworkRequest, NoopSink, OutputSink, RuntimeError, RuntimePorts, RuntimeSettings,
    RuntimeState,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Network template environments are generated from.
pub const NETWORK_TEMPLATE: &str = "microfab";

type SharedCheck = Shared<BoxFuture<'static, bool>>;

/// Runtime controller for one named environment.
///
/// Cheap to clone; clones share the same underlying controller.
#[derive(Clone)]
pub struct RuntimeController {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    directory: PathBuf,
    num_organizations: u32,
    port: AtomicU16,
    state: Mutex<RuntimeState>,
    busy: AtomicBool,
    in_flight: Mutex<Option<SharedCheck>>,
    ports: RuntimePorts,
    events: Arc<EnvironmentEventBus>,
    logs: LogStreamer,
    probe: LivenessProbe,
}

impl RuntimeController {
    pub(crate) fn new(
        name: impl Into<String>,
        port: u16,
        num_organizations: u32,
        directory: PathBuf,
        ports: RuntimePorts,
        events: Arc<EnvironmentEventBus>,
        settings: &RuntimeSettings,
    ) -> Self {
        let name = name.into();
        let logs = LogStreamer::new(name.clone(), Arc::clone(&ports.log_aggregator));
        Self {
            inner: Arc::new(Inner {
                name,
                directory,
                num_organizations,
                port: AtomicU16::new(port),
                state: Mutex::new(RuntimeState::Stopped),
                busy: AtomicBool::new(false),
                in_flight: Mutex::new(None),
                ports,
                events,
                logs,
                probe: LivenessProbe::from_settings(settings),
            }),
        }
    }

    /// Environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current base port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port.load(Ordering::SeqCst)
    }

    /// Number of organizations in the topology.
    #[must_use]
    pub fn num_organizations(&self) -> u32 {
        self.inner.num_organizations
    }

    /// Directory holding the generated scripts and config.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    /// Current runtime state.
    #[must_use]
    pub fn state(&self) -> RuntimeState {
        *self.inner.state.lock().unwrap()
    }

    /// Whether a lifecycle operation is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Materialize the environment on disk and persist its descriptor.
    ///
    /// Any stale descriptor for this name is deleted first, and the port
    /// is re-resolved from the settings store so a changed assignment is
    /// adopted before generation.
    pub async fn create(&self) -> Result<(), RuntimeError> {
        info!(environment = %self.inner.name, "Creating environment");

        self.inner.ports.registry.delete(&self.inner.name, true).await?;

        let assignments = self.inner.ports.port_settings.get().await?;
        if let Some(&configured) = assignments.get(&self.inner.name) {
            let current = self.port();
            if configured != current {
                debug!(
                    environment = %self.inner.name,
                    from = current,
                    to = configured,
                    "Adopting changed port assignment"
                );
                self.inner.port.store(configured, Ordering::SeqCst);
            }
        }

        let port = self.port();
        let request = NetworkRequest {
            destination: self.inner.directory.clone(),
            name: self.inner.name.clone(),
            num_organizations: self.inner.num_organizations,
            port,
        };
        self.inner
            .ports
            .generator
            .run(NETWORK_TEMPLATE, &request)
            .await?;

        let descriptor = EnvironmentDescriptor::new(
            self.inner.name.clone(),
            port,
            self.inner.num_organizations,
            self.inner.directory.clone(),
        );
        self.inner.ports.registry.add(descriptor).await?;

        Ok(())
    }

    /// Whether the environment is materialized on disk.
    ///
    /// Requires both the persisted descriptor and the `start` script
    /// sentinel: the descriptor alone is not enough, since the directory
    /// may have been deleted out-of-band.
    pub async fn is_created(&self) -> bool {
        self.inner.is_created().await
    }

    /// Start the environment.
    pub async fn start(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.set_busy(true);
        self.set_state(RuntimeState::Starting);

        let result = async {
            if !self.is_created().await {
                self.create().await?;
            }
            self.execute(LifecycleScript::Start, &[], &sink).await?;
            Ok(())
        }
        .await;

        self.finish_lifecycle().await;
        result
    }

    /// Stop the environment.
    pub async fn stop(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.set_busy(true);
        self.set_state(RuntimeState::Stopping);
        self.inner.logs.stop_logs();

        let result = self
            .execute(LifecycleScript::Stop, &[], &sink)
            .await
            .map_err(RuntimeError::from);

        self.finish_lifecycle().await;
        result
    }

    /// Tear the environment down and recreate it in place.
    ///
    /// A successful teardown is followed by an automatic `create()` so
    /// the environment stays usable; see [`Self::delete`] for the
    /// variant that stops after the teardown.
    pub async fn teardown(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.set_busy(true);
        self.set_state(RuntimeState::Stopping);
        self.inner.logs.stop_logs();

        let mut result = self
            .execute(LifecycleScript::Teardown, &[], &sink)
            .await
            .map_err(RuntimeError::from);
        if result.is_ok() {
            result = self.create().await;
        }

        self.finish_lifecycle().await;
        result
    }

    /// Tear the environment down and remove its persisted footprint.
    pub async fn delete(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.set_busy(true);
        self.set_state(RuntimeState::Stopping);
        self.inner.logs.stop_logs();

        let mut result = self
            .execute(LifecycleScript::Teardown, &[], &sink)
            .await
            .map_err(RuntimeError::from);
        if result.is_ok() {
            result = self.remove_footprint().await;
        }

        self.finish_lifecycle().await;
        result
    }

    /// Restart the environment.
    ///
    /// The stop script completes, successfully or not, before the start
    /// script is attempted. When both phases fail, the stop-phase error
    /// is the one reported.
    pub async fn restart(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.set_busy(true);
        self.set_state(RuntimeState::Restarting);

        let stop_result = self.execute(LifecycleScript::Stop, &[], &sink).await;
        let start_result = self.execute(LifecycleScript::Start, &[], &sink).await;

        self.finish_lifecycle().await;

        stop_result?;
        start_result?;
        Ok(())
    }

    /// Probe whether the environment's processes are currently reachable.
    ///
    /// Never fails: any probe error reads as "not running". Concurrent
    /// callers during one outstanding check all receive that check's
    /// result, and exactly one probe process is spawned per outstanding
    /// check.
    pub async fn is_running(&self) -> bool {
        self.is_running_with(&[]).await
    }

    /// [`Self::is_running`] with passthrough probe arguments.
    ///
    /// The in-flight memo is per-controller, not argument-keyed:
    /// concurrent calls with different arguments during one outstanding
    /// check share the first check's result.
    pub async fn is_running_with(&self, args: &[String]) -> bool {
        let (check, installed) = {
            let mut slot = self.inner.in_flight.lock().unwrap();
            if let Some(existing) = slot.as_ref() {
                (existing.clone(), false)
            } else {
                let inner = Arc::clone(&self.inner);
                let args = args.to_vec();
                let check = Inner::probe_running(inner, args).boxed().shared();
                *slot = Some(check.clone());
                (check, true)
            }
        };

        let running = check.await;

        if installed {
            // Cleared exactly once the check settles, by the caller that
            // installed it.
            self.inner.in_flight.lock().unwrap().take();
        }

        running
    }

    /// Poll liveness with an explicit retry budget.
    ///
    /// Returns `true` without sleeping when already alive, otherwise
    /// retries up to `attempts` times with `interval` sleeps in between.
    pub async fn wait_for(&self, attempts: u32, interval: Duration) -> bool {
        self.wait_with(&LivenessProbe::new(attempts, interval)).await
    }

    /// Poll liveness with the configured default retry budget.
    pub async fn wait_until_ready(&self) -> bool {
        let probe = self.inner.probe;
        self.wait_with(&probe).await
    }

    async fn wait_with(&self, probe: &LivenessProbe) -> bool {
        let this = self.clone();
        probe
            .wait(move || {
                let controller = this.clone();
                async move { controller.is_running().await }
            })
            .await
    }

    /// Force a chaincode container restart during iterative development.
    ///
    /// Runs the dedicated lifecycle script with passthrough arguments;
    /// the controller's overall runtime state is untouched.
    pub async fn kill_chaincode(
        &self,
        args: &[String],
        sink: Option<Arc<dyn OutputSink>>,
    ) -> Result<(), RuntimeError> {
        let sink = resolve_sink(sink);
        self.execute(LifecycleScript::KillChaincode, args, &sink)
            .await
            .map_err(RuntimeError::from)
    }

    /// Start streaming this environment's container logs to `sink`.
    pub async fn start_logs(&self, sink: Arc<dyn OutputSink>) {
        self.inner.logs.start_logs(sink).await;
    }

    /// Stop the container log stream. Safe to call when inactive.
    pub fn stop_logs(&self) {
        self.inner.logs.stop_logs();
    }

    /// Subscribe to this environment's lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EnvironmentEvent> {
        self.inner.events.subscribe()
    }

    async fn execute(
        &self,
        script: LifecycleScript,
        args: &[String],
        sink: &Arc<dyn OutputSink>,
    ) -> Result<(), ledgerbox_core::ExecError> {
        self.inner
            .ports
            .executor
            .execute(&self.inner.directory, script, args, Arc::clone(sink))
            .await
    }

    /// Guaranteed cleanup for every lifecycle operation: release the busy
    /// flag and resolve the transient state from an authoritative
    /// liveness probe, never from script exit status.
    async fn finish_lifecycle(&self) {
        self.set_busy(false);
        let running = self.is_running().await;
        self.set_state(if running {
            RuntimeState::Started
        } else {
            RuntimeState::Stopped
        });
    }

    async fn remove_footprint(&self) -> Result<(), RuntimeError> {
        self.inner.ports.registry.delete(&self.inner.name, true).await?;
        match tokio::fs::remove_dir_all(&self.inner.directory).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RuntimeError::Internal(format!(
                "failed to remove {}: {e}",
                self.inner.directory.display()
            ))),
        }
    }

    fn set_busy(&self, busy: bool) {
        self.inner.busy.store(busy, Ordering::SeqCst);
        self.inner
            .events
            .emit(EnvironmentEvent::busy(&self.inner.name, busy));
    }

    fn set_state(&self, state: RuntimeState) {
        *self.inner.state.lock().unwrap() = state;
        self.inner
            .events
            .emit(EnvironmentEvent::state(&self.inner.name, state));
    }
}

fn resolve_sink(sink: Option<Arc<dyn OutputSink>>) -> Arc<dyn OutputSink> {
    sink.unwrap_or_else(|| Arc::new(ConsoleSink::new()))
}

impl Inner {
    async fn is_created(&self) -> bool {
        if self.ports.registry.get(&self.name).await.is_err() {
            return false;
        }
        // The directory may have been deleted out-of-band; the start
        // script is the sentinel.
        self.directory.join(LifecycleScript::Start.file_name()).exists()
    }

    async fn probe_running(self: Arc<Self>, args: Vec<String>) -> bool {
        if !self.is_created().await {
            return false;
        }

        let sink: Arc<dyn OutputSink> = Arc::new(NoopSink);
        match self
            .ports
            .executor
            .execute(&self.directory, LifecycleScript::IsRunning, &args, sink)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                debug!(environment = %self.name, %error, "Liveness probe reported not running");
                false
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.logs.is_streaming() {
            warn!(environment = %self.name, "Controller dropped with an active log stream");
            self.logs.stop_logs();
        }
    }
}
