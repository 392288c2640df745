//! Reconciliation summary and reporting

use std::time::Duration;

/// Summary of one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Records in the provider snapshot (after the datetime bound)
    pub snapshot_records: usize,

    /// Active identifiers in the catalog (after the datetime bound)
    pub catalog_records: usize,

    /// Scenes present upstream but missing from the catalog
    pub new_scenes: usize,

    /// New scenes successfully imported
    pub imported: usize,

    /// New scenes that failed mapping or insertion
    pub import_failures: usize,

    /// Catalog scenes no longer present upstream
    pub removal_candidates: usize,

    /// Scenes marked removed on the inventory API
    pub removed: usize,

    /// Removal candidates not found on the inventory API
    pub missing: usize,

    /// Succeeded scenes deleted from the public API
    pub deleted_public: usize,

    /// Duration of the run
    pub duration: Duration,

    /// Errors encountered (the run continues past per-scene errors)
    pub errors: Vec<String>,
}

impl ReconcileSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record an error
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Whether the run completed without any per-scene errors
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.import_failures == 0
    }

    /// Log the summary at completion
    pub fn log_summary(&self) {
        tracing::info!(
            snapshot_records = self.snapshot_records,
            catalog_records = self.catalog_records,
            new_scenes = self.new_scenes,
            imported = self.imported,
            import_failures = self.import_failures,
            removal_candidates = self.removal_candidates,
            removed = self.removed,
            missing = self.missing,
            deleted_public = self.deleted_public,
            duration_secs = self.duration.as_secs_f64(),
            errors = self.errors.len(),
            "Reconciliation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_default_is_clean() {
        let summary = ReconcileSummary::new();
        assert!(summary.is_clean());
        assert_eq!(summary.new_scenes, 0);
    }

    #[test]
    fn test_summary_with_errors_not_clean() {
        let mut summary = ReconcileSummary::new();
        summary.add_error("mapping failed for scene x");
        assert!(!summary.is_clean());
        assert_eq!(summary.errors.len(), 1);
    }

    #[test]
    fn test_summary_duration() {
        let summary = ReconcileSummary::new().with_duration(Duration::from_secs(3));
        assert_eq!(summary.duration.as_secs(), 3);
    }
}
