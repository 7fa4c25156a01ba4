//! In-memory port implementations shared by the unit tests.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use ledgerbox_core::{
    ContainerFilter, ContainerLogEntry, EnvironmentDescriptor, EnvironmentEventBus,
    EnvironmentRegistry, ExecError, FreePortProbe, GeneratorError, LifecycleScript, LogAggregator,
    NetworkGenerator, NetworkRequest, OutputSink, PortSettings, RuntimeError, RuntimePorts,
    RuntimeSettings, ScriptExecutor, StoreError,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// In-memory environment registry.
#[derive(Default)]
pub(crate) struct InMemoryRegistry {
    entries: Mutex<HashMap<String, EnvironmentDescriptor>>,
}

impl InMemoryRegistry {
    pub(crate) fn insert(&self, descriptor: EnvironmentDescriptor) {
        self.entries
            .lock()
            .unwrap()
            .insert(descriptor.name.clone(), descriptor);
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl EnvironmentRegistry for InMemoryRegistry {
    async fn get(&self, name: &str) -> Result<EnvironmentDescriptor, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn add(&self, descriptor: EnvironmentDescriptor) -> Result<(), StoreError> {
        self.insert(descriptor);
        Ok(())
    }

    async fn delete(&self, name: &str, silent: bool) -> Result<(), StoreError> {
        let removed = self.entries.lock().unwrap().remove(name);
        if removed.is_none() && !silent {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EnvironmentDescriptor>, StoreError> {
        Ok(self.entries.lock().unwrap().values().cloned().collect())
    }
}

/// In-memory port assignment table.
#[derive(Default)]
pub(crate) struct InMemoryPortSettings {
    assignments: Mutex<BTreeMap<String, u16>>,
}

impl InMemoryPortSettings {
    pub(crate) fn assigned(&self, name: &str) -> Option<u16> {
        self.assignments.lock().unwrap().get(name).copied()
    }

    pub(crate) fn set(&self, name: &str, port: u16) {
        self.assignments
            .lock()
            .unwrap()
            .insert(name.to_string(), port);
    }
}

#[async_trait]
impl PortSettings for InMemoryPortSettings {
    async fn get(&self) -> Result<BTreeMap<String, u16>, StoreError> {
        Ok(self.assignments.lock().unwrap().clone())
    }

    async fn update(&self, assignments: BTreeMap<String, u16>) -> Result<(), StoreError> {
        self.assignments.lock().unwrap().extend(assignments);
        Ok(())
    }
}

/// Programmable script executor recording every invocation.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    invocations: Mutex<Vec<(LifecycleScript, Vec<String>)>>,
    queued: Mutex<HashMap<LifecycleScript, VecDeque<Result<(), i32>>>>,
    defaults: Mutex<HashMap<LifecycleScript, Result<(), i32>>>,
    gate: Mutex<Option<watch::Receiver<bool>>>,
}

impl ScriptedExecutor {
    /// Fix the outcome for every future run of `script`.
    pub(crate) fn set_default(&self, script: LifecycleScript, outcome: Result<(), i32>) {
        self.defaults.lock().unwrap().insert(script, outcome);
    }

    /// Queue a one-shot outcome for the next run of `script`.
    pub(crate) fn push_outcome(&self, script: LifecycleScript, outcome: Result<(), i32>) {
        self.queued
            .lock()
            .unwrap()
            .entry(script)
            .or_default()
            .push_back(outcome);
    }

    /// Block liveness probes until the returned sender publishes `true`.
    pub(crate) fn gate_probes(&self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn invocations(&self) -> Vec<(LifecycleScript, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, script: LifecycleScript) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == script)
            .count()
    }
}

#[async_trait]
impl ScriptExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _directory: &Path,
        script: LifecycleScript,
        args: &[String],
        _sink: Arc<dyn OutputSink>,
    ) -> Result<(), ExecError> {
        self.invocations
            .lock()
            .unwrap()
            .push((script, args.to_vec()));

        if script == LifecycleScript::IsRunning {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(mut rx) = gate {
                let _ = rx.wait_for(|open| *open).await;
            }
        }

        let outcome = {
            let mut queued = self.queued.lock().unwrap();
            match queued.get_mut(&script).and_then(VecDeque::pop_front) {
                Some(outcome) => outcome,
                None => self
                    .defaults
                    .lock()
                    .unwrap()
                    .get(&script)
                    .copied()
                    .unwrap_or(Ok(())),
            }
        };

        outcome.map_err(|code| ExecError::Exited {
            command: script.file_name(),
            args: args.to_vec(),
            code,
        })
    }
}

/// Generator that materializes the lifecycle script sentinels on disk.
#[derive(Default)]
pub(crate) struct SentinelGenerator {
    runs: Mutex<Vec<NetworkRequest>>,
}

impl SentinelGenerator {
    pub(crate) fn runs(&self) -> Vec<NetworkRequest> {
        self.runs.lock().unwrap().clone()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

#[async_trait]
impl NetworkGenerator for SentinelGenerator {
    async fn run(
        &self,
        _template_id: &str,
        request: &NetworkRequest,
    ) -> Result<(), GeneratorError> {
        std::fs::create_dir_all(&request.destination)
            .map_err(|e| GeneratorError::Io(e.to_string()))?;
        for script in LifecycleScript::ALL {
            std::fs::write(request.destination.join(script.file_name()), "")
                .map_err(|e| GeneratorError::Io(e.to_string()))?;
        }
        self.runs.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Probe handing out a fixed ascending range.
pub(crate) struct RangeProbe;

#[async_trait]
impl FreePortProbe for RangeProbe {
    async fn find_free_ports(
        &self,
        start: u16,
        _end_hint: Option<u16>,
        _host_hint: Option<&str>,
        count: usize,
    ) -> Result<Vec<u16>, RuntimeError> {
        Ok((start..).take(count).collect())
    }
}

/// Aggregator yielding no entries.
pub(crate) struct NullAggregator;

#[async_trait]
impl LogAggregator for NullAggregator {
    async fn subscribe(
        &self,
        _filter: ContainerFilter,
    ) -> Result<BoxStream<'static, ContainerLogEntry>, RuntimeError> {
        Ok(futures_util::stream::empty().boxed())
    }
}

/// Everything a lifecycle test needs, wired over in-memory ports.
pub(crate) struct TestHarness {
    pub(crate) registry: Arc<InMemoryRegistry>,
    pub(crate) port_settings: Arc<InMemoryPortSettings>,
    pub(crate) executor: Arc<ScriptedExecutor>,
    pub(crate) generator: Arc<SentinelGenerator>,
    pub(crate) events: Arc<EnvironmentEventBus>,
    pub(crate) data_root: tempfile::TempDir,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(InMemoryRegistry::default()),
            port_settings: Arc::new(InMemoryPortSettings::default()),
            executor: Arc::new(ScriptedExecutor::default()),
            generator: Arc::new(SentinelGenerator::default()),
            events: Arc::new(EnvironmentEventBus::new()),
            data_root: tempfile::TempDir::new().unwrap(),
        }
    }

    pub(crate) fn ports(&self) -> RuntimePorts {
        RuntimePorts::new(
            Arc::clone(&self.registry) as _,
            Arc::clone(&self.port_settings) as _,
            Arc::clone(&self.executor) as _,
            Arc::clone(&self.generator) as _,
            Arc::new(RangeProbe) as _,
            Arc::new(NullAggregator) as _,
        )
    }

    pub(crate) fn manager(&self) -> crate::manager::EnvironmentManager {
        crate::manager::EnvironmentManager::new(
            self.ports(),
            Arc::clone(&self.events),
            RuntimeSettings::with_defaults(),
            self.data_root.path().to_path_buf(),
        )
    }
}
