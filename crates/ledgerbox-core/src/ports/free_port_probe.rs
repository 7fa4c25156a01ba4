//! Free port probe trait definition.

use async_trait::async_trait;

use super::RuntimeError;

/// Probe for runs of consecutive free TCP ports.
#[async_trait]
pub trait FreePortProbe: Send + Sync {
    /// Find `count` consecutive free ports, searching upward from `start`.
    ///
    /// `end_hint` bounds the search when given; `host_hint` selects the
    /// interface to probe (loopback when absent). Returns the full run of
    /// ports in ascending order.
    async fn find_free_ports(
        &self,
        start: u16,
        end_hint: Option<u16>,
        host_hint: Option<&str>,
        count: usize,
    ) -> Result<Vec<u16>, RuntimeError>;
}
