//! `ledgerbox connect` handler.

use crate::bootstrap::CliContext;
use crate::handlers::TerminalSink;
use anyhow::Result;
use ledgerbox_core::EnvironmentRegistry;
use std::sync::Arc;

/// Ensure the named environment is reachable and print its gateway.
pub async fn execute(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;

    if !controller.is_running().await {
        controller.start(Some(Arc::new(TerminalSink))).await?;
    }

    if !controller.wait_until_ready().await {
        anyhow::bail!("environment {name} is not reachable");
    }

    let descriptor = ctx.registry.get(name).await?;
    println!("Environment {name} is reachable");
    println!("  console: {}", descriptor.url);
    Ok(())
}
