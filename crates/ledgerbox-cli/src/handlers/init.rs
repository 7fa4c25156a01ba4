//! `ledgerbox init` handler.

use crate::bootstrap::CliContext;
use anyhow::Result;

/// Create or repair the named environment.
pub async fn execute(ctx: &CliContext, name: &str, orgs: u32) -> Result<()> {
    let controller = ctx.manager.initialize(name, orgs).await?;
    println!(
        "Environment {name} ready on port {} ({} org{})",
        controller.port(),
        controller.num_organizations(),
        if controller.num_organizations() == 1 { "" } else { "s" },
    );
    println!("  directory: {}", controller.directory().display());
    Ok(())
}
