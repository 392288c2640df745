//! Ingest command implementation
//!
//! Harvests scene metadata from a provider over a publication window and
//! inserts the mapped STAC items into the inventory catalog.

use crate::cli::commands::{build_catalog, build_provider, parse_cli_datetime};
use crate::catalog::traits::{InsertMode, InventoryStore};
use crate::config::load_config;
use crate::domain::ids::CollectionId;
use crate::providers::SearchWindow;
use clap::Args;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Provider to harvest from (usgs, cdse, cmr)
    #[arg(short, long)]
    pub provider: String,

    /// Start of the publication window (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub date_from: String,

    /// End of the publication window (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub date_to: Option<String>,

    /// Override the target collection (derived from scene ids by default)
    #[arg(short, long)]
    pub collection: Option<String>,

    /// Dry run mode - map scenes without writing to the catalog
    #[arg(long)]
    pub dry_run: bool,
}

impl IngestArgs {
    /// Execute the ingest command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(provider = %self.provider, "Starting ingest command");

        let config = load_config(config_path)?;
        let dry_run = self.dry_run || config.application.dry_run;

        let provider = match build_provider(&config, &self.provider) {
            Ok(provider) => provider,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let date_from = parse_cli_datetime(&self.date_from)?;
        let date_to = self
            .date_to
            .as_deref()
            .map(parse_cli_datetime)
            .transpose()?;
        let window = SearchWindow::new(date_from, date_to);

        let collection = self
            .collection
            .as_deref()
            .map(CollectionId::new)
            .transpose()
            .map_err(anyhow::Error::msg)?;

        println!(
            "🛰  Harvesting {} scenes from {}",
            self.provider, self.date_from
        );

        let items = provider.harvest(&window, collection.as_ref()).await?;
        println!("   {} items mapped", items.len());

        if items.is_empty() {
            println!("✅ Nothing to ingest");
            return Ok(0);
        }

        let insert_mode: InsertMode = config
            .reconcile
            .insert_mode
            .parse()
            .map_err(anyhow::Error::msg)?;

        let catalog = build_catalog(&config).await?;
        let result = catalog.insert_items(&items, insert_mode, dry_run).await?;

        println!();
        println!("Ingest Summary:");
        println!("  Provider: {}", self.provider);
        println!("  Mapped items: {}", items.len());
        println!("  Inserted: {}", result.success_count);
        println!("  Failed: {}", result.failure_count);
        if dry_run {
            println!("  (dry run - no catalog writes)");
        }

        if result.failure_count > 0 {
            for failure in result.failures.iter().take(10) {
                println!("  ❌ {}: {}", failure.item_id, failure.error);
            }
            return Ok(3);
        }

        println!("✅ Ingest completed");
        Ok(0)
    }
}
