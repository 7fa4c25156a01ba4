//! Script executor trait definition.
//!
//! This port abstracts execution of an environment's generated lifecycle
//! scripts so the runtime can be tested without spawning processes.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{ExecError, OutputSink};
use crate::environment::LifecycleScript;

/// Executor for an environment's lifecycle scripts.
///
/// Implementations resolve the platform-specific script file, spawn it
/// with the environment directory as working directory, and stream both
/// stdout and stderr lines to `sink` as informational records as they
/// arrive. A non-zero exit maps to [`ExecError::Exited`].
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Run `script` from `directory` with `args`, streaming output to `sink`.
    async fn execute(
        &self,
        directory: &Path,
        script: LifecycleScript,
        args: &[String],
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), ExecError>;
}
