//! CLI entry point - the composition root.
//!
//! This is the ONLY place where infrastructure is wired together via
//! bootstrap. Command dispatch routes to handlers which delegate to the
//! environment manager.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledgerbox_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; --verbose lowers the default filter
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Bootstrap the CLI context (composition root)
    let config = CliConfig::with_defaults(cli.data_dir.clone())?;
    let ctx = bootstrap(config).await?;

    // Dispatch to the appropriate handler
    let Some(command) = cli.command else {
        // No command provided - show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init { name, orgs } => {
            handlers::init::execute(&ctx, &name, orgs).await?;
        }
        Commands::Start { name } => {
            handlers::lifecycle::start(&ctx, &name).await?;
        }
        Commands::Stop { name } => {
            handlers::lifecycle::stop(&ctx, &name).await?;
        }
        Commands::Restart { name } => {
            handlers::lifecycle::restart(&ctx, &name).await?;
        }
        Commands::Teardown { name } => {
            handlers::lifecycle::teardown(&ctx, &name).await?;
        }
        Commands::Delete { name } => {
            handlers::lifecycle::delete(&ctx, &name).await?;
        }
        Commands::Connect { name } => {
            handlers::connect::execute(&ctx, &name).await?;
        }
        Commands::Logs { name } => {
            handlers::logs::execute(&ctx, &name).await?;
        }
        Commands::List => {
            handlers::list::execute(&ctx).await?;
        }
        Commands::KillChaincode { name, containers } => {
            handlers::lifecycle::kill_chaincode(&ctx, &name, &containers).await?;
        }
    }

    Ok(())
}
