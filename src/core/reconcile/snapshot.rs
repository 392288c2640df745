//! Inventory snapshot loading
//!
//! A snapshot is the provider's bulk inventory file: an ordered sequence of
//! scene records loaded from CSV, keyed by a configurable identifier column.
//! Provider files carry identifiers with a file extension that the catalog
//! does not store; the extension observed on the FIRST record is treated as
//! uniform across the snapshot and stripped during normalization.

use crate::domain::{MeridianError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// One row of a snapshot file
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    /// Raw identifier as it appears in the file (extension included)
    pub id: String,

    /// Parsed record datetime, when the date column was parseable
    pub datetime: Option<DateTime<Utc>>,

    /// All columns of the row, keyed by header name
    pub fields: BTreeMap<String, String>,
}

/// An inventory snapshot loaded from a provider bulk file
#[derive(Debug, Clone)]
pub struct InventorySnapshot {
    records: Vec<SnapshotRecord>,
    extension: String,
}

impl InventorySnapshot {
    /// Load a snapshot from a CSV file
    ///
    /// `max_datetime` is an exclusive upper bound: only records with a
    /// datetime strictly before it are kept. A SHA-256 fingerprint of the
    /// file is logged for traceability.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, the id or date column is
    /// missing from the header, or the CSV is malformed.
    pub fn from_csv_path(
        path: impl AsRef<Path>,
        id_column: &str,
        date_column: &str,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            MeridianError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let digest = Sha256::digest(&bytes);
        tracing::info!(
            path = %path.display(),
            sha256 = %format!("{digest:x}"),
            "Loading inventory snapshot"
        );

        Self::from_reader(bytes.as_slice(), id_column, date_column, max_datetime)
    }

    /// Load a snapshot from any CSV reader
    pub fn from_reader<R: Read>(
        reader: R,
        id_column: &str,
        date_column: &str,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| MeridianError::Snapshot(format!("Failed to read CSV header: {e}")))?
            .clone();

        if !headers.iter().any(|h| h == id_column) {
            return Err(MeridianError::Snapshot(format!(
                "Snapshot has no '{id_column}' column"
            )));
        }
        if !headers.iter().any(|h| h == date_column) {
            return Err(MeridianError::Snapshot(format!(
                "Snapshot has no '{date_column}' column"
            )));
        }

        let mut records = Vec::new();
        let mut unparsable_dates = 0usize;

        for row in csv_reader.records() {
            let row = row?;

            let mut fields = BTreeMap::new();
            for (header, value) in headers.iter().zip(row.iter()) {
                fields.insert(header.to_string(), value.to_string());
            }

            let id = fields.get(id_column).cloned().unwrap_or_default();
            if id.is_empty() {
                tracing::warn!("Skipping snapshot row with empty identifier");
                continue;
            }

            let datetime = fields.get(date_column).and_then(|raw| {
                let parsed = parse_datetime(raw);
                if parsed.is_none() && !raw.is_empty() {
                    unparsable_dates += 1;
                }
                parsed
            });

            // Exclusive upper bound; records without a parseable datetime
            // are dropped when a bound is requested.
            if let Some(bound) = max_datetime {
                match datetime {
                    Some(dt) if dt < bound => {}
                    _ => continue,
                }
            }

            records.push(SnapshotRecord { id, datetime, fields });
        }

        if unparsable_dates > 0 {
            tracing::warn!(
                count = unparsable_dates,
                column = date_column,
                "Snapshot rows with unparsable datetimes"
            );
        }

        let extension = records
            .first()
            .map(|record| split_extension(&record.id).1.to_string())
            .unwrap_or_default();

        let snapshot = Self { records, extension };

        let stray = snapshot
            .records
            .iter()
            .filter(|r| !snapshot.extension.is_empty() && !r.id.ends_with(&snapshot.extension))
            .count();
        if stray > 0 {
            tracing::warn!(
                count = stray,
                extension = %snapshot.extension,
                "Snapshot identifiers without the detected extension"
            );
        }

        tracing::info!(
            records = snapshot.records.len(),
            extension = %snapshot.extension,
            "Inventory snapshot loaded"
        );

        Ok(snapshot)
    }

    /// Number of records in the snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// File extension observed on the first record (`""` when absent)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// All records in file order
    pub fn records(&self) -> &[SnapshotRecord] {
        &self.records
    }

    /// Identifiers with the detected extension stripped
    pub fn normalized_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| normalize_id(&record.id, &self.extension))
            .collect()
    }

    /// Identifier-indexed view keyed by the RAW identifier (extension kept)
    pub fn by_raw_id(&self) -> HashMap<&str, &SnapshotRecord> {
        self.records
            .iter()
            .map(|record| (record.id.as_str(), record))
            .collect()
    }

    /// Per-year record counts (records without a datetime are skipped)
    pub fn counts_by_year(&self) -> BTreeMap<i32, u64> {
        use chrono::Datelike;
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let Some(datetime) = record.datetime {
                *counts.entry(datetime.year()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Strip the snapshot extension from one identifier
///
/// Only the exact detected extension is removed; identifiers without it are
/// returned unchanged.
pub fn normalize_id(id: &str, extension: &str) -> String {
    if extension.is_empty() {
        return id.to_string();
    }
    id.strip_suffix(extension).unwrap_or(id).to_string()
}

/// Split a name into stem and trailing extension (including the dot)
///
/// `"scene.zip"` → `("scene", ".zip")`; names without a dot return an empty
/// extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(index) => (&name[..index], &name[index..]),
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
        if format == "%Y-%m-%d" {
            if let Ok(parsed) = chrono::NaiveDate::parse_from_str(raw, format) {
                return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CSV: &str = "\
Name,ContentDate:Start,S3Path
S2A_MSIL2A_20240101T101021_N0510_R022_T32TQM_20240101T120000.SAFE,2024-01-01T10:10:21.000Z,/eodata/a
S2B_MSIL2A_20230615T101559_N0509_R065_T32TQM_20230615T120000.SAFE,2023-06-15T10:15:59.000Z,/eodata/b
S2B_MSIL2A_20230616T101559_N0509_R065_T32TQN_20230616T120000.SAFE,2023-06-16T10:15:59.000Z,/eodata/c
";

    fn load(max_datetime: Option<DateTime<Utc>>) -> InventorySnapshot {
        InventorySnapshot::from_reader(CSV.as_bytes(), "Name", "ContentDate:Start", max_datetime)
            .unwrap()
    }

    #[test]
    fn test_load_detects_extension() {
        let snapshot = load(None);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.extension(), ".SAFE");
    }

    #[test]
    fn test_normalized_ids_strip_extension() {
        let snapshot = load(None);
        let ids = snapshot.normalized_ids();
        assert_eq!(
            ids[0],
            "S2A_MSIL2A_20240101T101021_N0510_R022_T32TQM_20240101T120000"
        );
        assert!(ids.iter().all(|id| !id.ends_with(".SAFE")));
    }

    #[test]
    fn test_max_datetime_is_strictly_less_than() {
        let bound = Utc.with_ymd_and_hms(2023, 6, 16, 10, 15, 59).unwrap();
        let snapshot = load(Some(bound));
        // Only the 2023-06-15 record is strictly before the bound
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.records()[0].id.starts_with("S2B_MSIL2A_20230615"));
    }

    #[test]
    fn test_by_raw_id_keeps_extension() {
        let snapshot = load(None);
        let index = snapshot.by_raw_id();
        let record = index
            .get("S2A_MSIL2A_20240101T101021_N0510_R022_T32TQM_20240101T120000.SAFE")
            .unwrap();
        assert_eq!(record.fields["S3Path"], "/eodata/a");
    }

    #[test]
    fn test_counts_by_year() {
        let snapshot = load(None);
        let counts = snapshot.counts_by_year();
        assert_eq!(counts[&2023], 2);
        assert_eq!(counts[&2024], 1);
    }

    #[test]
    fn test_missing_id_column_fails() {
        let result =
            InventorySnapshot::from_reader(CSV.as_bytes(), "id", "ContentDate:Start", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_date_column_fails() {
        let result = InventorySnapshot::from_reader(CSV.as_bytes(), "Name", "datetime", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_snapshot_has_no_extension() {
        let snapshot =
            InventorySnapshot::from_reader("Name,ContentDate:Start\n".as_bytes(), "Name", "ContentDate:Start", None)
                .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.extension(), "");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("scene.zip"), ("scene", ".zip"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("no_extension"), ("no_extension", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("scene.zip", ".zip"), "scene");
        assert_eq!(normalize_id("scene.zip", ""), "scene.zip");
        assert_eq!(normalize_id("other.tar", ".zip"), "other.tar");
    }
}
