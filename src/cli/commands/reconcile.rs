//! Reconcile command implementation
//!
//! Diffs a provider bulk-inventory snapshot against the catalog, then
//! (with `--apply`) imports the new scenes and marks the vanished ones
//! removed.

use crate::cli::commands::{build_catalog, build_stac_api, parse_cli_datetime};
use crate::catalog::traits::InsertMode;
use crate::config::load_config;
use crate::core::reconcile::{
    parse_removal_reasons, InventorySnapshot, ReconcileCoordinator, RemovalReason, SceneMapper,
};
use crate::domain::ids::CollectionId;
use crate::providers::CdseProvider;
use clap::Args;
use std::collections::HashMap;

/// Arguments for the reconcile command
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Collection to reconcile
    #[arg(short, long)]
    pub collection: String,

    /// Path to the provider bulk-inventory snapshot (CSV)
    #[arg(short, long)]
    pub snapshot: String,

    /// Exclusive upper datetime bound applied to both sides
    #[arg(long)]
    pub max_datetime: Option<String>,

    /// Apply the changes (default is a diff-only preview)
    #[arg(long)]
    pub apply: bool,

    /// Path to a removal-reasons JSON file keyed by scene id
    #[arg(long)]
    pub reasons: Option<String>,

    /// Snapshot provider whose mapping shapes new scenes (cdse)
    #[arg(long, default_value = "cdse")]
    pub provider: String,
}

impl ReconcileArgs {
    /// Execute the reconcile command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            collection = %self.collection,
            snapshot = %self.snapshot,
            apply = self.apply,
            "Starting reconcile command"
        );

        let config = load_config(config_path)?;
        let collection = CollectionId::new(&self.collection).map_err(anyhow::Error::msg)?;
        let max_datetime = self
            .max_datetime
            .as_deref()
            .map(parse_cli_datetime)
            .transpose()?;

        let snapshot = InventorySnapshot::from_csv_path(
            &self.snapshot,
            &config.reconcile.id_column,
            &config.reconcile.date_column,
            max_datetime,
        )?;
        println!(
            "📄 Snapshot: {} records (extension '{}')",
            snapshot.len(),
            snapshot.extension()
        );

        let reasons: HashMap<String, RemovalReason> = match &self.reasons {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                parse_removal_reasons(serde_json::from_str(&raw)?)?
            }
            None => HashMap::new(),
        };

        // Bulk-inventory snapshots are published by CDSE; other providers
        // reconcile through ingestion searches instead.
        if self.provider != "cdse" {
            println!(
                "❌ No snapshot mapping for provider '{}' (supported: cdse)",
                self.provider
            );
            return Ok(2);
        }
        let cdse = CdseProvider::new(config.providers.cdse.clone().unwrap_or_default())?;
        let mapper_collection = collection.clone();
        let mapper: Box<SceneMapper> =
            Box::new(move |record| cdse.item_from_snapshot(record, Some(&mapper_collection)));

        let insert_mode: InsertMode = config
            .reconcile
            .insert_mode
            .parse()
            .map_err(anyhow::Error::msg)?;

        let catalog = build_catalog(&config).await?;
        let api = build_stac_api(&config)?;
        let coordinator = ReconcileCoordinator::new(catalog, api)
            .with_insert_mode(insert_mode)
            .with_dry_run(!self.apply || config.application.dry_run);

        if !self.apply {
            let diff = coordinator
                .calculate_differences(&collection, &snapshot, max_datetime)
                .await?;
            println!();
            println!("Diff Preview:");
            println!("  New scenes: {}", diff.new_scenes.len());
            println!("  Removal candidates: {}", diff.removed.len());
            for record in diff.new_scenes.iter().take(10) {
                println!("  + {}", record.id);
            }
            for scene_id in diff.removed.iter().take(10) {
                println!("  - {scene_id}");
            }
            println!();
            println!("Run again with --apply to import and remove scenes");
            return Ok(0);
        }

        let summary = coordinator
            .execute(&collection, &snapshot, max_datetime, &mapper, &reasons)
            .await?;

        println!();
        println!("Reconcile Summary:");
        println!("  Snapshot records: {}", summary.snapshot_records);
        println!("  Catalog records: {}", summary.catalog_records);
        println!("  New scenes: {}", summary.new_scenes);
        println!("  Imported: {}", summary.imported);
        println!("  Import failures: {}", summary.import_failures);
        println!("  Removal candidates: {}", summary.removal_candidates);
        println!("  Removed: {}", summary.removed);
        println!("  Missing in inventory: {}", summary.missing);
        println!("  Deleted from public API: {}", summary.deleted_public);
        println!("  Duration: {:.1}s", summary.duration.as_secs_f64());

        if summary.is_clean() {
            println!("✅ Reconciliation completed");
            Ok(0)
        } else {
            println!("⚠️  Reconciliation completed with {} errors", summary.errors.len());
            for error in summary.errors.iter().take(10) {
                println!("  ❌ {error}");
            }
            Ok(3)
        }
    }
}
