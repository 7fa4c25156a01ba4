//! `ledgerbox logs` handler.

use crate::bootstrap::CliContext;
use crate::handlers::TerminalSink;
use anyhow::Result;
use std::sync::Arc;

/// Stream the environment's container logs until interrupted.
pub async fn execute(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;

    controller.start_logs(Arc::new(TerminalSink)).await;
    eprintln!("Streaming logs for {name}; press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    controller.stop_logs();
    Ok(())
}
