//! Year-bucketed inventory statistics
//!
//! Aggregates per-collection, per-year counts from the catalog, the public
//! STAC API, and provider snapshots into one report. The classification of
//! catalog rows follows the order lifecycle: delivered scenes are `online`,
//! undelivered ones `pending`, vanished ones `removed`, deprecated ones
//! `deprecated`; everything not removed also counts into `inventory`.

use crate::catalog::traits::{YearCount, YearStatusCount};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts for one collection-year bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearStats {
    /// Active scenes (any status except `removed`)
    pub inventory: u64,
    /// Scenes marked removed
    pub removed: u64,
    /// Delivered, non-deprecated scenes
    pub online: u64,
    /// Undelivered, non-deprecated scenes
    pub pending: u64,
    /// Deprecated scenes
    pub deprecated: u64,
    /// Items visible on the public STAC API
    pub stac_api: u64,
    /// Records in the provider snapshot file
    pub snapshot: u64,
    /// Scenes reported by the provider's live API
    pub datasource: u64,
}

/// Per-collection, per-year statistics report
///
/// Years are keyed as strings so the report serializes the way the status
/// command publishes it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport(BTreeMap<String, BTreeMap<String, YearStats>>);

impl StatsReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the aggregated map
    pub fn collections(&self) -> &BTreeMap<String, BTreeMap<String, YearStats>> {
        &self.0
    }

    fn bucket(&mut self, collection: &str, year: i32) -> &mut YearStats {
        self.0
            .entry(collection.to_string())
            .or_default()
            .entry(year.to_string())
            .or_default()
    }

    /// Fold catalog status counts into the report
    pub fn apply_status_counts(&mut self, collection: &str, rows: &[YearStatusCount]) {
        for row in rows {
            let stats = self.bucket(collection, row.year);
            let status = row.status.as_deref();
            let deprecated = row.deprecated.as_deref();

            if status == Some("succeeded") && deprecated == Some("false") {
                stats.online += row.count;
            } else if status == Some("removed") {
                stats.removed += row.count;
            } else if status != Some("succeeded") && deprecated == Some("false") {
                stats.pending += row.count;
            } else if deprecated == Some("true") {
                stats.deprecated += row.count;
            }

            if status != Some("removed") {
                stats.inventory += row.count;
            }
        }
    }

    /// Fold public STAC API item counts into the report
    pub fn apply_stac_api_counts(&mut self, collection: &str, rows: &[YearCount]) {
        for row in rows {
            self.bucket(collection, row.year).stac_api += row.count;
        }
    }

    /// Fold snapshot per-year counts into the report
    pub fn apply_snapshot_counts(&mut self, collection: &str, counts: &BTreeMap<i32, u64>) {
        for (&year, &count) in counts {
            self.bucket(collection, year).snapshot += count;
        }
    }

    /// Fold provider-side per-year counts into the report
    pub fn apply_datasource_counts(&mut self, collection: &str, counts: &BTreeMap<i32, u64>) {
        for (&year, &count) in counts {
            self.bucket(collection, year).datasource += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, status: Option<&str>, deprecated: Option<&str>, count: u64) -> YearStatusCount {
        YearStatusCount {
            year,
            status: status.map(str::to_string),
            deprecated: deprecated.map(str::to_string),
            count,
        }
    }

    #[test]
    fn test_succeeded_not_deprecated_is_online() {
        let mut report = StatsReport::new();
        report.apply_status_counts("c", &[row(2023, Some("succeeded"), Some("false"), 10)]);
        let stats = &report.collections()["c"]["2023"];
        assert_eq!(stats.online, 10);
        assert_eq!(stats.inventory, 10);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_removed_counts_out_of_inventory() {
        let mut report = StatsReport::new();
        report.apply_status_counts("c", &[row(2023, Some("removed"), Some("true"), 4)]);
        let stats = &report.collections()["c"]["2023"];
        assert_eq!(stats.removed, 4);
        assert_eq!(stats.inventory, 0);
    }

    #[test]
    fn test_undelivered_is_pending() {
        let mut report = StatsReport::new();
        report.apply_status_counts(
            "c",
            &[
                row(2023, Some("orderable"), Some("false"), 3),
                row(2023, Some("ordered"), Some("false"), 2),
            ],
        );
        let stats = &report.collections()["c"]["2023"];
        assert_eq!(stats.pending, 5);
        assert_eq!(stats.inventory, 5);
    }

    #[test]
    fn test_deprecated_bucket() {
        let mut report = StatsReport::new();
        report.apply_status_counts("c", &[row(2023, Some("succeeded"), Some("true"), 7)]);
        let stats = &report.collections()["c"]["2023"];
        assert_eq!(stats.deprecated, 7);
        assert_eq!(stats.online, 0);
        // Still part of the active inventory
        assert_eq!(stats.inventory, 7);
    }

    #[test]
    fn test_missing_deprecated_flag_only_counts_inventory() {
        let mut report = StatsReport::new();
        report.apply_status_counts("c", &[row(2023, Some("succeeded"), None, 2)]);
        let stats = &report.collections()["c"]["2023"];
        assert_eq!(stats.inventory, 2);
        assert_eq!(stats.online, 0);
        assert_eq!(stats.deprecated, 0);
    }

    #[test]
    fn test_other_sources_fold_into_own_buckets() {
        let mut report = StatsReport::new();
        report.apply_stac_api_counts("c", &[YearCount { year: 2024, count: 11 }]);

        let mut by_year = BTreeMap::new();
        by_year.insert(2024, 13u64);
        report.apply_snapshot_counts("c", &by_year);
        report.apply_datasource_counts("c", &by_year);

        let stats = &report.collections()["c"]["2024"];
        assert_eq!(stats.stac_api, 11);
        assert_eq!(stats.snapshot, 13);
        assert_eq!(stats.datasource, 13);
        assert_eq!(stats.inventory, 0);
    }

    #[test]
    fn test_report_serializes_with_string_years() {
        let mut report = StatsReport::new();
        report.apply_status_counts("c", &[row(2023, Some("succeeded"), Some("false"), 1)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["c"]["2023"]["online"], 1);
    }
}
