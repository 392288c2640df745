//! Snapshot/catalog set-difference
//!
//! Computes which scenes are new upstream (present in the provider snapshot,
//! absent from the catalog) and which have vanished (present in the catalog,
//! absent from the snapshot). Comparison is on extension-normalized
//! identifier string equality only; there is no fuzzy matching and no
//! multiplicity semantics.

use crate::core::reconcile::snapshot::{normalize_id, InventorySnapshot, SnapshotRecord};
use crate::domain::ids::SceneId;
use std::collections::HashSet;

/// Result of diffing a snapshot against the catalog
#[derive(Debug, Clone, Default)]
pub struct SceneDiff {
    /// Full snapshot rows for scenes missing from the catalog, sorted by
    /// identifier (raw identifiers, extension re-appended)
    pub new_scenes: Vec<SnapshotRecord>,

    /// Catalog identifiers no longer present upstream, sorted
    pub removed: Vec<SceneId>,
}

impl SceneDiff {
    /// Whether snapshot and catalog denote the same logical set
    pub fn is_empty(&self) -> bool {
        self.new_scenes.is_empty() && self.removed.is_empty()
    }
}

/// Diff a snapshot against the catalog's active identifiers
///
/// Snapshot identifiers are normalized by stripping the extension observed
/// on the first snapshot record before the set subtraction. New scenes are
/// reconstructed as full rows by re-appending the extension and looking the
/// raw identifier up in the snapshot. Outputs are sorted so that repeated
/// runs over unchanged inputs produce identical results.
pub fn diff_snapshot_against_catalog(
    snapshot: &InventorySnapshot,
    catalog_ids: &[SceneId],
) -> SceneDiff {
    let extension = snapshot.extension();

    let snapshot_ids: HashSet<String> = snapshot.normalized_ids().into_iter().collect();
    let catalog_set: HashSet<&str> = catalog_ids.iter().map(SceneId::as_str).collect();

    tracing::info!(
        snapshot = snapshot_ids.len(),
        catalog = catalog_set.len(),
        "Computing scene diff"
    );

    let mut new_ids: Vec<&String> = snapshot_ids
        .iter()
        .filter(|id| !catalog_set.contains(id.as_str()))
        .collect();
    new_ids.sort();

    let mut removed: Vec<SceneId> = catalog_ids
        .iter()
        .filter(|id| !snapshot_ids.contains(id.as_str()))
        .cloned()
        .collect();
    removed.sort();
    removed.dedup();

    let by_raw_id = snapshot.by_raw_id();
    let new_scenes: Vec<SnapshotRecord> = new_ids
        .iter()
        .filter_map(|id| {
            let raw_id = format!("{id}{extension}");
            let record = by_raw_id.get(raw_id.as_str()).copied();
            if record.is_none() {
                tracing::warn!(id = %raw_id, "New scene missing from snapshot index");
            }
            record.cloned()
        })
        .collect();

    tracing::info!(
        new = new_scenes.len(),
        removed = removed.len(),
        "Scene diff computed"
    );

    SceneDiff { new_scenes, removed }
}

/// Normalize one catalog-side comparison identifier for a snapshot
///
/// Exposed for callers that need to compare a single identifier against a
/// snapshot without materializing the full diff.
pub fn normalized(snapshot: &InventorySnapshot, id: &str) -> String {
    normalize_id(id, snapshot.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reconcile::snapshot::InventorySnapshot;

    fn snapshot_from(ids: &[&str]) -> InventorySnapshot {
        let mut csv = String::from("Name,ContentDate:Start\n");
        for id in ids {
            csv.push_str(id);
            csv.push_str(",2024-01-01T00:00:00Z\n");
        }
        InventorySnapshot::from_reader(csv.as_bytes(), "Name", "ContentDate:Start", None).unwrap()
    }

    fn scene_ids(ids: &[&str]) -> Vec<SceneId> {
        ids.iter().map(|id| SceneId::new(*id).unwrap()).collect()
    }

    #[test]
    fn test_identical_sets_yield_empty_diff() {
        let snapshot = snapshot_from(&["a.zip", "b.zip", "c.zip"]);
        let catalog = scene_ids(&["a", "b", "c"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_new_and_removed() {
        let snapshot = snapshot_from(&["a.zip", "b.zip", "d.zip"]);
        let catalog = scene_ids(&["a", "b", "c"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);

        let new_ids: Vec<&str> = diff.new_scenes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(new_ids, vec!["d.zip"]);
        assert_eq!(diff.removed, scene_ids(&["c"]));
    }

    #[test]
    fn test_new_and_removed_are_disjoint() {
        let snapshot = snapshot_from(&["a.zip", "b.zip", "x.zip", "y.zip"]);
        let catalog = scene_ids(&["b", "c", "d"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);

        let new_set: HashSet<String> = diff
            .new_scenes
            .iter()
            .map(|r| normalized(&snapshot, &r.id))
            .collect();
        let removed_set: HashSet<&str> = diff.removed.iter().map(SceneId::as_str).collect();
        assert!(new_set.iter().all(|id| !removed_set.contains(id.as_str())));
    }

    #[test]
    fn test_diff_is_idempotent() {
        let snapshot = snapshot_from(&["c.zip", "a.zip", "b.zip", "z.zip"]);
        let catalog = scene_ids(&["b", "q", "p"]);

        let first = diff_snapshot_against_catalog(&snapshot, &catalog);
        let second = diff_snapshot_against_catalog(&snapshot, &catalog);
        assert_eq!(first.new_scenes, second.new_scenes);
        assert_eq!(first.removed, second.removed);
    }

    #[test]
    fn test_outputs_sorted() {
        let snapshot = snapshot_from(&["z.zip", "a.zip", "m.zip"]);
        let catalog = scene_ids(&["x", "b"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);

        let new_ids: Vec<&str> = diff.new_scenes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(new_ids, vec!["a.zip", "m.zip", "z.zip"]);
        assert_eq!(diff.removed, scene_ids(&["b", "x"]));
    }

    #[test]
    fn test_new_rows_reconstructed_with_extension() {
        let snapshot = snapshot_from(&["a.zip", "new_scene.zip"]);
        let catalog = scene_ids(&["a"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);

        assert_eq!(diff.new_scenes.len(), 1);
        assert_eq!(diff.new_scenes[0].id, "new_scene.zip");
        // Full row data survives reconstruction
        assert_eq!(diff.new_scenes[0].fields["Name"], "new_scene.zip");
    }

    #[test]
    fn test_empty_snapshot_removes_everything() {
        let snapshot = snapshot_from(&[]);
        let catalog = scene_ids(&["a", "b"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &catalog);
        assert!(diff.new_scenes.is_empty());
        assert_eq!(diff.removed.len(), 2);
    }

    #[test]
    fn test_empty_catalog_adds_everything() {
        let snapshot = snapshot_from(&["a.zip", "b.zip"]);
        let diff = diff_snapshot_against_catalog(&snapshot, &[]);
        assert_eq!(diff.new_scenes.len(), 2);
        assert!(diff.removed.is_empty());
    }
}
