//! Port allocation policy and free-port probing.

use async_trait::async_trait;
use ledgerbox_core::{FreePortProbe, RuntimeError};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::debug;

/// Number of consecutive free ports requested per allocation. The batch
/// absorbs ports that get claimed between probing and binding.
const FREE_PORT_BATCH: usize = 20;

/// Check if a port is available by attempting to bind to it.
/// This binds and immediately drops the listener, which releases the port.
pub fn is_port_available(host: &str, port: u16) -> bool {
    match TcpListener::bind((host, port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Base-port allocation for new environments.
///
/// Every allocation returns a port strictly greater than all currently
/// assigned ports, so environments provisioned at different times never
/// collide even without a live conflict check against each other.
pub struct PortAllocator {
    probe: Arc<dyn FreePortProbe>,
}

impl PortAllocator {
    /// Create a new allocator over the given probe.
    pub fn new(probe: Arc<dyn FreePortProbe>) -> Self {
        Self { probe }
    }

    /// Compute a free base port for a new environment.
    ///
    /// The search starts at `base_port` when no assignments exist,
    /// otherwise at one past the highest assigned port.
    pub async fn generate_port_configuration(
        &self,
        existing: &BTreeMap<String, u16>,
        base_port: u16,
    ) -> Result<u16, RuntimeError> {
        let start = match existing.values().max() {
            Some(&highest) => highest.checked_add(1).ok_or_else(|| {
                RuntimeError::ResourceExhausted(format!(
                    "highest assigned port {highest} leaves no room above it"
                ))
            })?,
            None => base_port,
        };

        let candidates = self
            .probe
            .find_free_ports(start, None, None, FREE_PORT_BATCH)
            .await?;

        let port = candidates.first().copied().ok_or_else(|| {
            RuntimeError::ResourceExhausted(format!("no free ports found from {start}"))
        })?;

        debug!(port, start, "Allocated environment base port");
        Ok(port)
    }
}

/// Free-port probe backed by loopback bind attempts.
#[derive(Debug, Clone, Default)]
pub struct TcpPortProbe;

impl TcpPortProbe {
    /// Create a new probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FreePortProbe for TcpPortProbe {
    async fn find_free_ports(
        &self,
        start: u16,
        end_hint: Option<u16>,
        host_hint: Option<&str>,
        count: usize,
    ) -> Result<Vec<u16>, RuntimeError> {
        let host = host_hint.unwrap_or("127.0.0.1").to_string();
        let end = end_hint.unwrap_or(u16::MAX);

        // Bind probing is quick but synchronous; keep it off the runtime
        // worker threads.
        tokio::task::spawn_blocking(move || {
            let mut run: Vec<u16> = Vec::with_capacity(count);
            let mut port = start;
            loop {
                if is_port_available(&host, port) {
                    run.push(port);
                } else {
                    run.clear();
                }
                if run.len() == count {
                    return Ok(run);
                }
                if port >= end {
                    return Err(RuntimeError::ResourceExhausted(format!(
                        "no run of {count} consecutive free ports between {start} and {end}"
                    )));
                }
                port += 1;
            }
        })
        .await
        .map_err(|e| RuntimeError::Internal(format!("port probe task failed: {e}")))?
    }
}
