//! `ledgerbox list` handler.

use crate::bootstrap::CliContext;
use anyhow::Result;
use ledgerbox_core::EnvironmentRegistry;

/// Print every known environment with its port and live status.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let descriptors = ctx.registry.list().await?;
    if descriptors.is_empty() {
        println!("No environments found. Create one with: ledgerbox init <name>");
        return Ok(());
    }

    for descriptor in descriptors {
        let status = match ctx.manager.get_runtime(&descriptor.name).await {
            Some(controller) if controller.is_running().await => "running",
            Some(_) => "stopped",
            None => "unmanaged",
        };
        println!(
            "{:<24} port {:<6} {:<9} {}",
            descriptor.name, descriptor.port, status, descriptor.url
        );
    }
    Ok(())
}
