//! Handlers for the start/stop/restart/teardown/delete commands.

use crate::bootstrap::CliContext;
use crate::handlers::TerminalSink;
use anyhow::Result;
use ledgerbox_core::OutputSink;
use std::sync::Arc;

fn sink() -> Arc<dyn OutputSink> {
    Arc::new(TerminalSink)
}

/// Start the named environment.
pub async fn start(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.start(Some(sink())).await?;

    if controller.wait_until_ready().await {
        println!("Environment {name} started");
    } else {
        anyhow::bail!("environment {name} did not become reachable after starting");
    }
    Ok(())
}

/// Stop the named environment.
pub async fn stop(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.stop(Some(sink())).await?;
    println!("Environment {name} stopped");
    Ok(())
}

/// Restart the named environment.
pub async fn restart(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.restart(Some(sink())).await?;
    println!("Environment {name} restarted ({:?})", controller.state());
    Ok(())
}

/// Tear the named environment down and recreate it in place.
pub async fn teardown(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.teardown(Some(sink())).await?;
    println!("Environment {name} torn down and recreated");
    Ok(())
}

/// Tear the named environment down and remove it entirely.
pub async fn delete(ctx: &CliContext, name: &str) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.delete(Some(sink())).await?;
    ctx.manager.remove_runtime(name).await;
    println!("Environment {name} deleted");
    Ok(())
}

/// Force a chaincode container restart.
pub async fn kill_chaincode(ctx: &CliContext, name: &str, containers: &[String]) -> Result<()> {
    let controller = ctx.manager.ensure_runtime(name, None, None).await?;
    controller.kill_chaincode(containers, Some(sink())).await?;
    Ok(())
}
