//! Status command implementation
//!
//! Aggregates year-bucketed statistics per collection: catalog inventory
//! counts (grouped by order status and deprecation), optional public-catalog
//! item counts, and optional snapshot counts.

use crate::cli::commands::parse_cli_datetime;
use crate::catalog::traits::InventoryStore;
use crate::catalog::{CatalogClient, PostgresCatalog};
use crate::config::load_config;
use crate::core::reconcile::InventorySnapshot;
use crate::core::stats::StatsReport;
use crate::domain::ids::CollectionId;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Collections to report on (comma-separated)
    #[arg(short, long)]
    pub collections: String,

    /// Exclusive upper datetime bound
    #[arg(long)]
    pub max_datetime: Option<String>,

    /// Snapshot file to include in the report (CSV)
    #[arg(long)]
    pub snapshot: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(collections = %self.collections, "Starting status command");

        let config = load_config(config_path)?;
        let max_datetime = self
            .max_datetime
            .as_deref()
            .map(parse_cli_datetime)
            .transpose()?;

        let collections: Vec<CollectionId> = self
            .collections
            .split(',')
            .map(|part| CollectionId::new(part.trim()).map_err(anyhow::Error::msg))
            .collect::<anyhow::Result<_>>()?;

        let client = Arc::new(CatalogClient::new(config.catalog.clone()).await?);
        let inventory = PostgresCatalog::new(client);

        // The public catalog is a second database when configured
        let public_catalog = match &config.catalog.public_connection_string {
            Some(connection_string) => {
                let mut public_config = config.catalog.clone();
                public_config.connection_string = connection_string.clone();
                let client = Arc::new(CatalogClient::new(public_config).await?);
                Some(PostgresCatalog::new(client))
            }
            None => None,
        };

        let snapshot = self
            .snapshot
            .as_deref()
            .map(|path| {
                InventorySnapshot::from_csv_path(
                    path,
                    &config.reconcile.id_column,
                    &config.reconcile.date_column,
                    max_datetime,
                )
            })
            .transpose()?;

        let mut report = StatsReport::new();
        for collection in &collections {
            let rows = inventory
                .status_counts_by_year(collection, max_datetime)
                .await?;
            report.apply_status_counts(collection.as_str(), &rows);

            if let Some(public_catalog) = &public_catalog {
                let counts = public_catalog
                    .item_counts_by_year(collection, max_datetime)
                    .await?;
                report.apply_stac_api_counts(collection.as_str(), &counts);
            }

            if let Some(snapshot) = &snapshot {
                report.apply_snapshot_counts(collection.as_str(), &snapshot.counts_by_year());
            }
        }

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(0)
    }
}
