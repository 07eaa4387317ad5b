mod hierarchy;
mod resolve;

use clap::{Args, Parser, Subcommand};
use geocerca_resolver::AliasDecision;
use tracing_subscriber::EnvFilter;

use crate::hierarchy::HierarchyCommands;

#[derive(Debug, Parser)]
#[command(name = "geocerca")]
#[command(about = "Resolve map pins to administrative sectors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a coordinate to a sector and print the committed update as JSON
    Resolve {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[command(flatten)]
        decision: DecisionArgs,
    },
    /// Resolve a free-text address, then resolve its coordinate to a sector
    Locate {
        address: String,
        #[command(flatten)]
        decision: DecisionArgs,
    },
    /// Forward-geocode an address and print the match as JSON
    Geocode { address: String },
    /// Print the lookup key for a sector name
    Normalize { name: String },
    /// Inspect the hierarchy table
    Hierarchy {
        #[command(subcommand)]
        command: HierarchyCommands,
    },
}

/// What to do if the detected sector name is not in the hierarchy.
#[derive(Debug, Args)]
struct DecisionArgs {
    /// Alias the detected name onto this sector id
    #[arg(long, value_name = "SECTOR_ID", conflicts_with_all = ["new_location", "dismiss"])]
    alias_to: Option<i64>,
    /// Alias the detected name onto the country's fallback sector
    #[arg(long, conflicts_with_all = ["alias_to", "new_location", "dismiss"])]
    alias_fallback: bool,
    /// Register the detected name as a new sector
    #[arg(long, conflicts_with = "dismiss")]
    new_location: bool,
    /// Name for the new sector (defaults to the detected name)
    #[arg(long, requires = "new_location")]
    name: Option<String>,
    /// Discard the detected name
    #[arg(long)]
    dismiss: bool,
}

impl DecisionArgs {
    fn decision(&self) -> Option<AliasDecision> {
        if let Some(target) = self.alias_to {
            Some(AliasDecision::CreateAlias {
                target_sector_id: Some(target),
            })
        } else if self.alias_fallback {
            Some(AliasDecision::CreateAlias {
                target_sector_id: None,
            })
        } else if self.new_location {
            Some(AliasDecision::CreateNewLocation {
                name: self.name.clone(),
            })
        } else if self.dismiss {
            Some(AliasDecision::Dismiss)
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Normalize { name } = &cli.command {
        print_normalized(name)?;
        return Ok(());
    }

    let config = geocerca_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Resolve { lat, lng, decision } => {
            let coordinate = geocerca_core::Coordinate::new(lat, lng)?;
            resolve::run_resolve(
                &config,
                resolve::Target::Coordinate(coordinate),
                decision.decision(),
            )
            .await?;
        }
        Commands::Locate { address, decision } => {
            resolve::run_resolve(
                &config,
                resolve::Target::Address(address),
                decision.decision(),
            )
            .await?;
        }
        Commands::Geocode { address } => resolve::run_geocode(&config, &address).await?,
        Commands::Hierarchy { command } => hierarchy::run(&config, &command)?,
        Commands::Normalize { .. } => {}
    }

    Ok(())
}

fn print_normalized(name: &str) -> anyhow::Result<()> {
    let out = serde_json::json!({
        "key": geocerca_core::normalize(name),
        "generic": geocerca_core::is_generic(name),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
