//! Subcommand definitions.

use clap::Subcommand;

/// All ledgerbox subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create (or repair) a named environment and assign its ports
    Init {
        /// Environment name
        name: String,

        /// Number of organizations in the network topology
        #[arg(long, default_value_t = 1)]
        orgs: u32,
    },

    /// Start an environment's network
    Start {
        /// Environment name
        name: String,
    },

    /// Stop an environment's network
    Stop {
        /// Environment name
        name: String,
    },

    /// Restart an environment's network
    Restart {
        /// Environment name
        name: String,
    },

    /// Tear an environment down and recreate it in place
    Teardown {
        /// Environment name
        name: String,
    },

    /// Tear an environment down and remove it entirely
    Delete {
        /// Environment name
        name: String,
    },

    /// Wait until an environment is reachable and print its gateway
    Connect {
        /// Environment name
        name: String,
    },

    /// Stream an environment's container logs to stdout
    Logs {
        /// Environment name
        name: String,
    },

    /// List known environments
    List,

    /// Force a chaincode container restart during development
    KillChaincode {
        /// Environment name
        name: String,

        /// Chaincode container names to kill
        #[arg(required = true)]
        containers: Vec<String>,
    },
}
