//! Container log streaming for one environment.
//!
//! Subscribes to the aggregated container log stream, keeps only the
//! lines belonging to this environment's containers, and republishes
//! them to an output sink one line at a time.

use futures_util::StreamExt;
use ledgerbox_core::{ContainerFilter, LogAggregator, OutputSink};
use regex::Regex;
use std::sync::{Arc, LazyLock, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Terminal control/color sequences stripped from every forwarded line.
static ANSI_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap());

/// Remove terminal control sequences from a line.
pub(crate) fn strip_ansi(line: &str) -> String {
    ANSI_SEQUENCE.replace_all(line, "").into_owned()
}

/// Filtered, formatted log republisher for one named environment.
pub struct LogStreamer {
    name: String,
    aggregator: Arc<dyn LogAggregator>,
    active: Mutex<Option<CancellationToken>>,
}

impl LogStreamer {
    /// Create a streamer for the named environment.
    pub fn new(name: impl Into<String>, aggregator: Arc<dyn LogAggregator>) -> Self {
        Self {
            name: name.into(),
            aggregator,
            active: Mutex::new(None),
        }
    }

    /// Start forwarding this environment's container logs to `sink`.
    ///
    /// Each line arrives as `"<containerName>|<line>"` with terminal
    /// control sequences stripped, in arrival order. An already-active
    /// stream is replaced. Subscription failures are logged and
    /// swallowed: log streaming never fails a lifecycle operation.
    pub async fn start_logs(&self, sink: Arc<dyn OutputSink>) {
        self.stop_logs();

        let name = self.name.clone();
        let filter: ContainerFilter = Arc::new(move |container: &str| container.contains(&name));

        let mut stream = match self.aggregator.subscribe(filter).await {
            Ok(stream) => stream,
            Err(error) => {
                warn!(environment = %self.name, %error, "Failed to subscribe to container logs");
                return;
            }
        };

        let token = CancellationToken::new();
        *self.active.lock().unwrap() = Some(token.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    entry = stream.next() => match entry {
                        Some(entry) => {
                            let line = strip_ansi(&entry.line);
                            sink.info(&format!("{}|{line}", entry.container_name));
                        }
                        None => break,
                    },
                    () = token.cancelled() => break,
                }
            }
        });
    }

    /// Stop the active log subscription.
    ///
    /// Calling this when nothing is active is a no-op, never an error.
    pub fn stop_logs(&self) {
        if let Some(token) = self.active.lock().unwrap().take() {
            token.cancel();
        }
    }

    /// Whether a log subscription is currently active.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }
}
