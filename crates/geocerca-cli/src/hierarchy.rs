//! `hierarchy` subcommands.

use std::sync::Arc;

use clap::Subcommand;
use geocerca_core::{load_hierarchy, AppConfig, NodeKind};
use geocerca_resolver::HierarchyMapper;

#[derive(Debug, Subcommand)]
pub enum HierarchyCommands {
    /// Validate the hierarchy file and the configured country
    Check,
    /// List the sectors of a province
    Sectors {
        #[arg(long)]
        province: i64,
    },
}

/// # Errors
///
/// Returns an error if the table fails validation, the configured country is
/// missing, or the province does not exist.
pub(crate) fn run(config: &AppConfig, command: &HierarchyCommands) -> anyhow::Result<()> {
    let table = Arc::new(load_hierarchy(&config.hierarchy_path)?);

    match command {
        HierarchyCommands::Check => {
            let mapper = HierarchyMapper::new(Arc::clone(&table), &config.country)?;
            println!(
                "{}: {} countries, {} provinces, {} sectors",
                config.hierarchy_path.display(),
                table.count(NodeKind::Country),
                table.count(NodeKind::Province),
                table.count(NodeKind::Sector),
            );
            println!(
                "bound to '{}' (id {}), fallback sector {}",
                config.country,
                mapper.country_id(),
                mapper.fallback_sector()
            );
        }
        HierarchyCommands::Sectors { province } => {
            match table.node(*province) {
                Some(node) if node.kind == NodeKind::Province => {
                    println!("{} ({})", node.name, node.id);
                }
                _ => anyhow::bail!("{province} is not a province"),
            }
            for sector in table.sectors_of(*province) {
                println!("  {:>6}  {}", sector.id, sector.name);
            }
        }
    }
    Ok(())
}
