//! Log aggregation trait definition.
//!
//! This port abstracts the aggregated container log event stream the
//! log streamer subscribes to. Container introspection internals stay
//! behind this contract.

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::sync::Arc;

use super::RuntimeError;

/// One log line from one of an environment's containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLogEntry {
    /// Name of the container that produced the line.
    pub container_name: String,
    /// The raw line, possibly carrying terminal control sequences.
    pub line: String,
}

/// Predicate selecting containers by name.
pub type ContainerFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Aggregated container log event stream.
#[async_trait]
pub trait LogAggregator: Send + Sync {
    /// Subscribe to log lines from containers matching `filter`, in
    /// arrival order.
    async fn subscribe(
        &self,
        filter: ContainerFilter,
    ) -> Result<BoxStream<'static, ContainerLogEntry>, RuntimeError>;
}
