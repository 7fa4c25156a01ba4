//! Lifecycle script execution.
//!
//! This module handles cross-platform invocation of an environment's
//! generated lifecycle scripts and streaming of their output.

use async_trait::async_trait;
use ledgerbox_core::{ExecError, LifecycleScript, OutputSink, ScriptExecutor};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Chaincode containers attach to the peer in dev mode so they can be
/// rebuilt without re-packaging.
const CHAINCODE_MODE_VAR: &str = "CORE_CHAINCODE_MODE";
const CHAINCODE_MODE_DEV: &str = "dev";
const CHAINCODE_TIMEOUT_VAR: &str = "CORE_CHAINCODE_EXECUTETIMEOUT";

/// How a script is launched on one host platform.
struct PlatformInvocation {
    program: String,
    leading_args: Vec<String>,
}

/// Resolve the launch table entry for the current host.
///
/// Windows-family hosts go through the system command shell with the
/// `.cmd` script; POSIX hosts invoke the `.sh` script directly.
fn platform_invocation(directory: &Path, script: LifecycleScript) -> PlatformInvocation {
    if cfg!(windows) {
        PlatformInvocation {
            program: "cmd".to_string(),
            leading_args: vec!["/c".to_string(), script.file_name()],
        }
    } else {
        PlatformInvocation {
            program: directory
                .join(script.file_name())
                .to_string_lossy()
                .into_owned(),
            leading_args: Vec::new(),
        }
    }
}

/// Shell-based lifecycle script executor.
///
/// Scripts run with the environment directory as working directory and a
/// copy of the process environment augmented with the chaincode dev-mode
/// variables. Stdout and stderr lines are both forwarded to the sink as
/// informational records: in this trusted local sandbox, stderr commonly
/// carries benign progress text, not failures.
#[derive(Debug, Clone, Default)]
pub struct ShellScriptExecutor {
    chaincode_execute_timeout_secs: Option<u32>,
}

impl ShellScriptExecutor {
    /// Create a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chaincode_execute_timeout_secs: None,
        }
    }

    /// Set the chaincode execute timeout propagated to the scripts.
    #[must_use]
    pub const fn with_chaincode_timeout(mut self, secs: u32) -> Self {
        self.chaincode_execute_timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl ScriptExecutor for ShellScriptExecutor {
    async fn execute(
        &self,
        directory: &Path,
        script: LifecycleScript,
        args: &[String],
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), ExecError> {
        let invocation = platform_invocation(directory, script);
        debug!(
            command = %invocation.program,
            ?args,
            directory = %directory.display(),
            "Executing lifecycle script"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.leading_args)
            .args(args)
            .current_dir(directory)
            .env(CHAINCODE_MODE_VAR, CHAINCODE_MODE_DEV)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(secs) = self.chaincode_execute_timeout_secs {
            cmd.env(CHAINCODE_TIMEOUT_VAR, format!("{secs}s"));
        }

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            command: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let readers = spawn_line_readers(&mut child, &sink);

        let status = child.wait().await.map_err(|e| ExecError::Io {
            command: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        // Drain the reader tasks so every line reaches the sink before
        // the result is reported.
        for reader in readers {
            let _ = reader.await;
        }

        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ExecError::Exited {
                command: invocation.program,
                args: args.to_vec(),
                code,
            }),
            None => Err(ExecError::Terminated {
                command: invocation.program,
            }),
        }
    }
}

/// Spawn background tasks that stream stdout/stderr lines to the sink.
fn spawn_line_readers(child: &mut Child, sink: &Arc<dyn OutputSink>) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        let sink = Arc::clone(sink);
        readers.push(tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(text)) = lines.next_line().await {
                sink.info(&text);
            }
        }));
    }

    if let Some(stderr) = child.stderr.take() {
        let sink = Arc::clone(sink);
        readers.push(tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(text)) = lines.next_line().await {
                sink.info(&text);
            }
        }));
    }

    readers
}
