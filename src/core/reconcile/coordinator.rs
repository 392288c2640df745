//! Reconciliation coordinator
//!
//! Orchestrates one reconciliation run: diff the provider snapshot against
//! the catalog, import the new scenes through a provider mapping, and mark
//! vanished scenes removed through the STAC APIs.

use crate::catalog::api::StacApiClient;
use crate::catalog::traits::{BulkInsertResult, InsertMode, InventoryStore};
use crate::core::reconcile::diff::{diff_snapshot_against_catalog, SceneDiff};
use crate::core::reconcile::snapshot::{InventorySnapshot, SnapshotRecord};
use crate::core::reconcile::summary::ReconcileSummary;
use crate::domain::ids::{CollectionId, SceneId};
use crate::domain::scene::OrderStatus;
use crate::domain::Result;
use crate::stac::StacItem;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Maps one snapshot row to a STAC item (provider-specific)
pub type SceneMapper = dyn Fn(&SnapshotRecord) -> Result<StacItem> + Send + Sync;

/// Removal reason as published by the provider's deletion feed
#[derive(Debug, Clone, Deserialize)]
pub struct RemovalReason {
    /// When the provider deleted the scene
    #[serde(rename = "DeletionDate")]
    pub deletion_date: String,

    /// Why the provider deleted the scene
    #[serde(rename = "DeletionCause")]
    pub deletion_cause: String,
}

/// Result of the removal phase
#[derive(Debug, Clone, Default)]
pub struct RemovalOutcome {
    /// Scenes marked removed on the inventory API
    pub removed: usize,
    /// Candidates not found on the inventory API
    pub missing: usize,
    /// Succeeded scenes deleted from the public API
    pub deleted_public: usize,
    /// Per-scene errors
    pub errors: Vec<String>,
}

/// Reconciliation coordinator
pub struct ReconcileCoordinator {
    inventory: Arc<dyn InventoryStore>,
    api: Arc<StacApiClient>,
    insert_mode: InsertMode,
    dry_run: bool,
}

impl ReconcileCoordinator {
    /// Create a new coordinator
    pub fn new(inventory: Arc<dyn InventoryStore>, api: Arc<StacApiClient>) -> Self {
        Self {
            inventory,
            api,
            insert_mode: InsertMode::InsertIgnore,
            dry_run: false,
        }
    }

    /// Set the insert mode for imported scenes
    pub fn with_insert_mode(mut self, mode: InsertMode) -> Self {
        self.insert_mode = mode;
        self
    }

    /// Enable dry-run mode (no catalog or API writes)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Diff a snapshot against the catalog's active scene set
    ///
    /// Both sides share the same exclusive `max_datetime` bound: the caller
    /// applies it when loading the snapshot, this method applies it to the
    /// catalog query.
    pub async fn calculate_differences(
        &self,
        collection: &CollectionId,
        snapshot: &InventorySnapshot,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<SceneDiff> {
        let catalog_ids = self
            .inventory
            .active_scene_ids(collection, max_datetime)
            .await?;
        Ok(diff_snapshot_against_catalog(snapshot, &catalog_ids))
    }

    /// Map new snapshot rows to STAC items
    ///
    /// Mapping errors are logged per scene and skip the scene rather than
    /// aborting the import.
    pub fn map_new_scenes(
        &self,
        scenes: &[SnapshotRecord],
        collection: &CollectionId,
        mapper: &SceneMapper,
    ) -> (Vec<StacItem>, Vec<String>) {
        let mut items = Vec::with_capacity(scenes.len());
        let mut errors = Vec::new();

        for scene in scenes {
            match mapper(scene) {
                Ok(mut item) => {
                    if item.collection.is_none() {
                        item.collection = Some(collection.as_str().to_string());
                    }
                    items.push(item);
                }
                Err(e) => {
                    tracing::error!(
                        scene_id = %scene.id,
                        error = %e,
                        "Error while creating metadata for scene"
                    );
                    errors.push(format!("{}: {e}", scene.id));
                }
            }
        }

        (items, errors)
    }

    /// Import new scenes into the catalog
    pub async fn import_new_scenes(
        &self,
        scenes: &[SnapshotRecord],
        collection: &CollectionId,
        mapper: &SceneMapper,
    ) -> Result<(BulkInsertResult, Vec<String>)> {
        let (items, mapping_errors) = self.map_new_scenes(scenes, collection, mapper);

        tracing::info!(
            collection = %collection,
            scenes = scenes.len(),
            items = items.len(),
            "Importing new scenes"
        );

        let result = self
            .inventory
            .insert_items(&items, self.insert_mode, self.dry_run)
            .await?;

        Ok((result, mapping_errors))
    }

    /// Mark vanished scenes removed
    ///
    /// For each candidate: fetch the item from the inventory API (missing
    /// items are counted, not fatal); delete the public copy when the scene
    /// had been delivered (`order:status = succeeded`); then patch the
    /// inventory item to `removed`/`deprecated` with the provider's deletion
    /// reason when one is known.
    pub async fn remove_scenes(
        &self,
        collection: &CollectionId,
        candidates: &[SceneId],
        reasons: &HashMap<String, RemovalReason>,
    ) -> Result<RemovalOutcome> {
        let mut outcome = RemovalOutcome::default();

        for scene_id in candidates {
            let item = match self.api.get_inventory_item(collection, scene_id).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    tracing::warn!(scene_id = %scene_id, "Not found in inventory");
                    outcome.missing += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(scene_id = %scene_id, error = %e, "Inventory lookup failed");
                    outcome.errors.push(format!("{scene_id}: {e}"));
                    continue;
                }
            };

            let status = item.order_status();
            tracing::info!(
                scene_id = %scene_id,
                status = ?status,
                "Removing vanished scene"
            );

            if self.dry_run {
                tracing::info!(scene_id = %scene_id, "DRY RUN: Would mark scene removed");
                outcome.removed += 1;
                continue;
            }

            if status == Some(OrderStatus::Succeeded) {
                match self.api.delete_public_item(collection, scene_id).await {
                    Ok(()) => outcome.deleted_public += 1,
                    Err(e) => {
                        tracing::error!(
                            scene_id = %scene_id,
                            error = %e,
                            "Failed to delete from public STAC API"
                        );
                        outcome.errors.push(format!("{scene_id}: {e}"));
                    }
                }
            }

            let mut item = item;
            item.set_property("order:status", OrderStatus::Removed.as_str());
            if let Some(reason) = reasons.get(scene_id.as_str()) {
                item.set_property("deletion:date", reason.deletion_date.clone());
                item.set_property("deletion:cause", reason.deletion_cause.clone());
            }
            item.set_property("deprecated", true);
            item.set_property(
                "updated",
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            );

            match self.api.put_inventory_item(&item).await {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    tracing::error!(
                        scene_id = %scene_id,
                        error = %e,
                        "Failed to update inventory item"
                    );
                    outcome.errors.push(format!("{scene_id}: {e}"));
                }
            }
        }

        Ok(outcome)
    }

    /// Run a full reconciliation: diff, import, remove
    pub async fn execute(
        &self,
        collection: &CollectionId,
        snapshot: &InventorySnapshot,
        max_datetime: Option<DateTime<Utc>>,
        mapper: &SceneMapper,
        reasons: &HashMap<String, RemovalReason>,
    ) -> Result<ReconcileSummary> {
        let start_time = Instant::now();
        let mut summary = ReconcileSummary::new();
        summary.snapshot_records = snapshot.len();

        let catalog_ids = self
            .inventory
            .active_scene_ids(collection, max_datetime)
            .await?;
        summary.catalog_records = catalog_ids.len();

        let diff = diff_snapshot_against_catalog(snapshot, &catalog_ids);
        summary.new_scenes = diff.new_scenes.len();
        summary.removal_candidates = diff.removed.len();

        if !diff.new_scenes.is_empty() {
            let (insert_result, mapping_errors) = self
                .import_new_scenes(&diff.new_scenes, collection, mapper)
                .await?;
            summary.imported = insert_result.success_count;
            summary.import_failures = insert_result.failure_count + mapping_errors.len();
            for failure in insert_result.failures {
                summary.add_error(format!("{}: {}", failure.item_id, failure.error));
            }
            for error in mapping_errors {
                summary.add_error(error);
            }
        }

        if !diff.removed.is_empty() {
            let outcome = self
                .remove_scenes(collection, &diff.removed, reasons)
                .await?;
            summary.removed = outcome.removed;
            summary.missing = outcome.missing;
            summary.deleted_public = outcome.deleted_public;
            for error in outcome.errors {
                summary.add_error(error);
            }
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}

/// Parse a removal-reasons JSON document keyed by scene id
pub fn parse_removal_reasons(value: Value) -> Result<HashMap<String, RemovalReason>> {
    serde_json::from_value(value)
        .map_err(|e| crate::domain::MeridianError::Reconcile(format!("Invalid reasons file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_removal_reasons() {
        let value = json!({
            "S2A_SCENE": {
                "DeletionDate": "2024-03-01T00:00:00Z",
                "DeletionCause": "Duplicated product"
            }
        });
        let reasons = parse_removal_reasons(value).unwrap();
        assert_eq!(reasons["S2A_SCENE"].deletion_cause, "Duplicated product");
    }

    #[test]
    fn test_parse_removal_reasons_invalid_shape_fails() {
        let value = json!({"S2A_SCENE": "gone"});
        assert!(parse_removal_reasons(value).is_err());
    }
}
