//! VoterInfo CLI — headless driver for the voter information tool.
//!
//! Commands:
//! - `lookup` — Run a polling-place lookup for an address
//! - `doctor` — Check the local configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "voterinfo",
    about = "VoterInfo — polling place and ballot lookup",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up polling place and ballot information for an address
    Lookup {
        /// The address to look up
        address: String,

        /// Override the configured election id
        #[arg(short, long)]
        election_id: Option<String>,

        /// Request only data from official sources
        #[arg(long)]
        official_only: bool,

        /// Override the configured API key
        #[arg(long, env = "VOTERINFO_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Check the local configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Lookup {
            address,
            election_id,
            official_only,
            api_key,
        } => commands::lookup::run(address, election_id, official_only, api_key).await?,
        Commands::Doctor => commands::doctor::run()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn lookup_parses_address_and_flags() {
        let cli = Cli::parse_from([
            "voterinfo",
            "lookup",
            "1 Main St, Springfield, IL",
            "--election-id",
            "5000",
            "--official-only",
        ]);
        match cli.command {
            Commands::Lookup {
                address,
                election_id,
                official_only,
                ..
            } => {
                assert_eq!(address, "1 Main St, Springfield, IL");
                assert_eq!(election_id.as_deref(), Some("5000"));
                assert!(official_only);
            }
            _ => panic!("expected lookup command"),
        }
    }
}
