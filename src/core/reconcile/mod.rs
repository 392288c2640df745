//! Inventory reconciliation
//!
//! The reconciliation core: snapshot loading, the set-difference diff
//! between provider snapshot and catalog, and the coordinator that applies
//! imports and removals.

pub mod coordinator;
pub mod diff;
pub mod snapshot;
pub mod summary;

pub use coordinator::{
    parse_removal_reasons, ReconcileCoordinator, RemovalOutcome, RemovalReason, SceneMapper,
};
pub use diff::{diff_snapshot_against_catalog, SceneDiff};
pub use snapshot::{normalize_id, split_extension, InventorySnapshot, SnapshotRecord};
pub use summary::ReconcileSummary;
