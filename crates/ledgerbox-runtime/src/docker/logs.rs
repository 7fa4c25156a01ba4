//! Docker-backed log aggregation.
//!
//! Discovers running containers by polling `docker ps` and follows the
//! logs of every container the filter selects, republishing lines into
//! one aggregated stream. Followers end when the subscriber drops the
//! stream or the container exits; a container that comes back under the
//! same name is picked up again by the discovery loop.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use ledgerbox_core::{ContainerFilter, ContainerLogEntry, LogAggregator, RuntimeError};
use std::collections::HashSet;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

/// How often the discovery loop re-lists containers.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Channel capacity between followers and the aggregated stream.
const CHANNEL_CAPACITY: usize = 256;

/// Aggregated container log stream backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerLogAggregator {
    poll_interval: Duration,
}

impl DockerLogAggregator {
    /// Create an aggregator with the default discovery interval.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the discovery interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for DockerLogAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogAggregator for DockerLogAggregator {
    async fn subscribe(
        &self,
        filter: ContainerFilter,
    ) -> Result<BoxStream<'static, ContainerLogEntry>, RuntimeError> {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(discover(filter, tx, self.poll_interval));

        let stream = async_stream::stream! {
            while let Some(entry) = rx.recv().await {
                yield entry;
            }
        };
        Ok(stream.boxed())
    }
}

/// Poll for containers matching the filter and attach a follower to each
/// new one. Ends once the subscriber is gone.
async fn discover(
    filter: ContainerFilter,
    tx: mpsc::Sender<ContainerLogEntry>,
    poll_interval: Duration,
) {
    let followed: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

    loop {
        if tx.is_closed() {
            break;
        }

        match list_container_names().await {
            Ok(names) => {
                for name in names {
                    if !filter(&name) {
                        continue;
                    }
                    let fresh = followed.lock().unwrap().insert(name.clone());
                    if fresh {
                        debug!(container = %name, "Following container logs");
                        tokio::spawn(follow(name, tx.clone(), Arc::clone(&followed)));
                    }
                }
            }
            Err(error) => {
                debug!(%error, "Container listing failed");
            }
        }

        sleep(poll_interval).await;
    }
}

async fn list_container_names() -> std::io::Result<Vec<String>> {
    let output = Command::new("docker")
        .args(["ps", "--format", "{{.Names}}"])
        .output()
        .await?;

    if !output.status.success() {
        return Ok(Vec::new());
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .collect())
}

/// Follow one container's logs until it exits or the subscriber goes
/// away.
async fn follow(
    name: String,
    tx: mpsc::Sender<ContainerLogEntry>,
    followed: Arc<Mutex<HashSet<String>>>,
) {
    let mut cmd = Command::new("docker");
    cmd.args(["logs", "--follow", "--tail", "0", &name])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match cmd.spawn() {
        Ok(mut child) => {
            let mut readers = Vec::with_capacity(2);
            if let Some(stdout) = child.stdout.take() {
                readers.push(tokio::spawn(forward_lines(stdout, name.clone(), tx.clone())));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(tokio::spawn(forward_lines(stderr, name.clone(), tx.clone())));
            }

            tokio::select! {
                _ = child.wait() => {}
                () = tx.closed() => {}
            }
            // Child dropped here; kill_on_drop reaps a still-running
            // follower. Readers end once the pipes close.
            drop(child);
            for reader in readers {
                reader.abort();
            }
        }
        Err(error) => {
            debug!(container = %name, %error, "Failed to follow container logs");
        }
    }

    followed.lock().unwrap().remove(&name);
}

async fn forward_lines<R: AsyncRead + Unpin>(
    reader: R,
    container_name: String,
    tx: mpsc::Sender<ContainerLogEntry>,
) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let entry = ContainerLogEntry {
            container_name: container_name.clone(),
            line,
        };
        if tx.send(entry).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_drop_is_clean() {
        let aggregator =
            DockerLogAggregator::new().with_poll_interval(Duration::from_millis(10));
        let filter: ContainerFilter = Arc::new(|name: &str| name.contains("nothing-matches"));

        let stream = aggregator.subscribe(filter).await.unwrap();
        drop(stream);

        // The discovery loop notices the dropped subscriber and exits
        sleep(Duration::from_millis(50)).await;
    }
}
