//! Sentinel scene-identifier grammar
//!
//! Identifier grammars for Sentinel-1/2/3/5P products, the archive folder
//! layouts derived from them, collection-name mapping, and the Sentinel-2
//! asset rename table.

use crate::datasets::{named_captures, render_template};
use crate::domain::{MeridianError, Result};
use crate::stac::AssetRename;
use chrono::NaiveDateTime;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const S1_PATTERN: &str = r"^(?P<sensor>S1[AB])_(?P<beam>S1|S2|S3|S4|S5|S6|IW|EW|WV|EN|N1|N2|N3|N4|N5|N6|IM)_(?P<product>SLC|GRD|OCN)(?P<resolution>F|H|M|_)_(?P<processingLevel>1|2)(?P<category>S|A)(?P<pols>SH|SV|DH|DV|VV|HH|HV|VH)_(?P<start>[0-9]{8}T[0-9]{6})_(?P<stop>[0-9]{8}T[0-9]{6})_(?P<orbitNumber>[0-9]{6})_(?P<dataTakeID>[0-9A-F]{6})_(?P<productIdentifier>[0-9A-F]{4})$";

const S2_PATTERN: &str = r"^(?P<sensor>S2[AB])_MSI(?P<level>L1C|L2A)_(?P<start>[0-9]{8}T[0-9]{6})_(?P<processingBaseline>N[0-9]{4})_R(?P<orbitNumber>[0-9]{3})_T(?P<utm_zone>[0-9]{2})(?P<mgrs_lat>[A-Z]{1})(?P<square>[A-Z]{2})_(?P<productDiscriminator>[0-9]{8}T[0-9]{6})$";

const S3_PATTERN: &str = r"^(?P<sensor>S3[AB])_(?P<instrument>OL|SL|SR|DO|MW|GN|SY|TM|AX)_(?P<processingLevel>0|1|2)_(?P<product>[A-Z0-9_]{6})_(?P<start>[0-9]{8}T[0-9]{6})_(?P<stop>[0-9]{8}T[0-9]{6})_(?P<productDiscriminator>[0-9]{8}T[0-9]{6})_(?P<instance>[A-Z0-9_]{17})_(?P<center>[A-Z0-9_]{3})_(?P<class>[A-Z0-9_]{8})$";

const S5_PATTERN: &str = r"^(?P<sensor>S5P)_(?P<fileclass>[A-Z]{4})_(?P<category>[A-Z0-9_]{3})_(?P<product>[A-Z0-9_]{6})_(?P<start>[0-9]{8}T[0-9]{6})_(?P<stop>[0-9]{8}T[0-9]{6})_(?P<orbitNumber>[0-9]{5})_(?P<collection>[0-9]{2})_(?P<processorVersion>[0-9]{6})_(?P<productionDate>[0-9]{8}T[0-9]{6})$";

const S5_AUX_PATTERN: &str = r"^(?P<sensor>S5P)_(?P<fileclass>[A-Z]{4})_(?P<category>[A-Z0-9_]{3})_(?P<product>[A-Z0-9_]{6})_(?P<start>[0-9]{8}T[0-9]{6})_(?P<stop>[0-9]{8}T[0-9]{6})_(?P<productionDate>[0-9]{8}T[0-9]{6})$";

/// Sentinel mission family, detected from the identifier prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mission {
    S1,
    S2,
    S3,
    S5,
    S5Aux,
}

impl Mission {
    /// Detect the mission of a scene identifier
    pub fn of(scene_id: &str) -> Result<Self> {
        match scene_id.get(0..2) {
            Some("S1") => Ok(Mission::S1),
            Some("S2") => Ok(Mission::S2),
            Some("S3") => Ok(Mission::S3),
            Some("S5") if scene_id.contains("_AUX_") => Ok(Mission::S5Aux),
            Some("S5") => Ok(Mission::S5),
            _ => Err(MeridianError::SceneId(format!(
                "Satellite not supported: {scene_id}"
            ))),
        }
    }

    fn regex(self) -> &'static Regex {
        fn compiled(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
            cell.get_or_init(|| Regex::new(pattern).expect("hard-coded scene id pattern"))
        }
        static S1: OnceLock<Regex> = OnceLock::new();
        static S2: OnceLock<Regex> = OnceLock::new();
        static S3: OnceLock<Regex> = OnceLock::new();
        static S5: OnceLock<Regex> = OnceLock::new();
        static S5AUX: OnceLock<Regex> = OnceLock::new();
        match self {
            Mission::S1 => compiled(&S1, S1_PATTERN),
            Mission::S2 => compiled(&S2, S2_PATTERN),
            Mission::S3 => compiled(&S3, S3_PATTERN),
            Mission::S5 => compiled(&S5, S5_PATTERN),
            Mission::S5Aux => compiled(&S5AUX, S5_AUX_PATTERN),
        }
    }

    fn folder_template(self) -> &'static str {
        match self {
            Mission::S1 => "{product}/{year}/{month}/{day}",
            Mission::S2 => "{level}/tiles/{utm_zone}/{mgrs_lat}/{square}/{year}/{month}",
            Mission::S3 => "{instrument}/{product}/{year}/{month}/{day}",
            Mission::S5 | Mission::S5Aux => "{category}/{product}/{year}/{month}/{day}",
        }
    }
}

/// Parse a Sentinel scene identifier into its grammar fields
///
/// The `category` field trims trailing underscores; `product` trims trailing
/// underscores and collapses runs of padding underscores.
///
/// # Errors
///
/// Returns an error for unsupported satellites or identifiers that don't
/// match their mission grammar.
pub fn scene_id_info(scene_id: &str) -> Result<BTreeMap<String, String>> {
    let mission = Mission::of(scene_id)?;
    let mut variables = named_captures(mission.regex(), scene_id).ok_or_else(|| {
        MeridianError::SceneId(format!("Scene ID does not match grammar: {scene_id}"))
    })?;

    if let Some(category) = variables.get_mut("category") {
        *category = category.trim_end_matches('_').to_string();
    }
    if let Some(product) = variables.get_mut("product") {
        *product = product
            .trim_end_matches('_')
            .replace("___", "_")
            .replace("__", "_");
    }

    Ok(variables)
}

/// Derive the archive folder of a Sentinel scene
///
/// Uses the mission folder template unless an explicit `folder_format` is
/// given. Sentinel-3 identifiers map the instrument abbreviation to its full
/// name and recompose the padded product field the way the archive lays out
/// its directories.
pub fn scene_id_folder(scene_id: &str, folder_format: Option<&str>) -> Result<String> {
    let mission = Mission::of(scene_id)?;
    let mut variables = scene_id_info(scene_id)?;

    if let Some(start) = variables.get("start") {
        let date = NaiveDateTime::parse_from_str(start, "%Y%m%dT%H%M%S").map_err(|e| {
            MeridianError::SceneId(format!("Invalid start timestamp in {scene_id}: {e}"))
        })?;
        variables.insert("year".to_string(), date.format("%Y").to_string());
        variables.insert("month".to_string(), date.format("%m").to_string());
        variables.insert("day".to_string(), date.format("%d").to_string());
    }

    if mission == Mission::S3 {
        if let Some(instrument) = variables.get("instrument").cloned() {
            let full = instrument_name(&instrument)
                .map(str::to_string)
                .unwrap_or(instrument);
            variables.insert("instrument".to_string(), full.clone());

            let level = variables.get("processingLevel").cloned().unwrap_or_default();
            let product = variables.get("product").cloned().unwrap_or_default();
            let prefix: String = full.chars().take(2).collect();
            variables.insert(
                "product".to_string(),
                format!("{prefix}_{level}_{product}___"),
            );
        }
    }

    let template = folder_format.unwrap_or_else(|| mission.folder_template());
    render_template(template, &variables)
}

/// Full instrument name for a Sentinel-3 instrument abbreviation
pub fn instrument_name(abbreviation: &str) -> Option<&'static str> {
    match abbreviation {
        "OL" => Some("OLCI"),
        "SL" => Some("SLSTR"),
        "SY" => Some("SYNERGY"),
        _ => None,
    }
}

/// Inventory collection name of a Sentinel scene
pub fn collection_name(scene_id: &str) -> Result<&'static str> {
    if scene_id.starts_with("S1") && scene_id.contains("_GRD") {
        Ok("sentinel-1-grd")
    } else if scene_id.starts_with("S1") && scene_id.contains("_SLC") {
        Ok("sentinel-1-slc")
    } else if scene_id.starts_with("S2") && scene_id.contains("_MSIL1C_") {
        Ok("sentinel-2-c1-l1c")
    } else if scene_id.starts_with("S2") && scene_id.contains("_MSIL2A_") {
        Ok("sentinel-2-c1-l2a")
    } else if scene_id.starts_with("S3") && scene_id.contains("_OL_1_EFR_") {
        Ok("sentinel-3-olci-l1-efr")
    } else if scene_id.starts_with("S5") && scene_id.contains("_L1B_") {
        Ok("sentinel-5p-l1b")
    } else if scene_id.starts_with("S5") && scene_id.contains("_L2_") {
        Ok("sentinel-5p-l2")
    } else if scene_id.starts_with("S5") && scene_id.contains("_AUX_") {
        Ok("sentinel-5p-aux")
    } else {
        Err(MeridianError::SceneId(format!(
            "No collection found for {scene_id}"
        )))
    }
}

/// Version-independent unique identifier of a Sentinel scene
///
/// Strips the per-processing segments so that reprocessed products of the
/// same acquisition collapse onto one identifier: S1 drops the trailing
/// product identifier, S2 drops the processing baseline, S3 and S5P are
/// recomposed from their grammar fields.
pub fn unique_id(scene_id: &str) -> Result<String> {
    match Mission::of(scene_id)? {
        Mission::S1 => {
            let parts: Vec<&str> = scene_id.split('_').collect();
            Ok(parts[..parts.len() - 1].join("_"))
        }
        Mission::S2 => {
            let mut parts: Vec<&str> = scene_id.split('_').collect();
            if parts.len() > 3 {
                parts.remove(3);
            }
            Ok(parts.join("_"))
        }
        Mission::S3 => {
            let info = scene_id_info(scene_id)?;
            Ok(format!(
                "{}_{}_{}_{}_{}_{}_{}",
                info["sensor"],
                info["instrument"],
                info["processingLevel"],
                info["product"],
                info["start"],
                info["stop"],
                info["instance"],
            ))
        }
        Mission::S5 => {
            let info = scene_id_info(scene_id)?;
            Ok(format!(
                "{}_{}_{}_{}_{}_{}",
                info["sensor"],
                info["category"],
                info["product"],
                info["start"],
                info["stop"],
                info["orbitNumber"],
            ))
        }
        Mission::S5Aux => Ok(scene_id.to_string()),
    }
}

/// Sentinel-2 asset renames: common band names to mission band codes
pub const S2_ASSET_RENAMES: &[AssetRename] = &[
    AssetRename::new("coastal", "B01", ""),
    AssetRename::new("blue", "B02", ""),
    AssetRename::new("green", "B03", ""),
    AssetRename::new("red", "B04", ""),
    AssetRename::new("rededge1", "B05", ""),
    AssetRename::new("rededge2", "B06", ""),
    AssetRename::new("rededge3", "B07", ""),
    AssetRename::new("nir", "B08", ""),
    AssetRename::new("nir08", "B8A", ""),
    AssetRename::new("nir09", "B09", ""),
    AssetRename::new("cirrus", "B10", ""),
    AssetRename::new("swir16", "B11", ""),
    AssetRename::new("swir22", "B12", ""),
    AssetRename::new("visual", "TCI", ""),
    AssetRename::new("aot_10m", "AOT", ""),
    AssetRename::new("wvp_10m", "WVP", ""),
    AssetRename::new("scl", "SCL", ""),
];

#[cfg(test)]
mod tests {
    use super::*;

    const S1_ID: &str = "S1A_IW_GRDH_1SDV_20240101T052959_20240101T053024_051868_0644E5_7D9B";
    const S2_ID: &str = "S2A_MSIL2A_20240101T101021_N0510_R022_T32TQM_20240101T120000";
    const S3_ID: &str =
        "S3A_OL_1_EFR____20240101T093241_20240101T093541_20240101T113224_0179_107_307_2160_PS1_O_NR_003";
    const S5_ID: &str =
        "S5P_OFFL_L2__NO2____20240101T105353_20240101T123523_32242_03_020600_20240103T042838";

    #[test]
    fn test_s1_scene_id_info() {
        let info = scene_id_info(S1_ID).unwrap();
        assert_eq!(info["sensor"], "S1A");
        assert_eq!(info["beam"], "IW");
        assert_eq!(info["product"], "GRD");
        assert_eq!(info["resolution"], "H");
        assert_eq!(info["start"], "20240101T052959");
        assert_eq!(info["orbitNumber"], "051868");
    }

    #[test]
    fn test_s2_scene_id_info() {
        let info = scene_id_info(S2_ID).unwrap();
        assert_eq!(info["sensor"], "S2A");
        assert_eq!(info["level"], "L2A");
        assert_eq!(info["processingBaseline"], "N0510");
        assert_eq!(info["utm_zone"], "32");
        assert_eq!(info["mgrs_lat"], "T");
        assert_eq!(info["square"], "QM");
    }

    #[test]
    fn test_s3_product_trimming() {
        let info = scene_id_info(S3_ID).unwrap();
        assert_eq!(info["instrument"], "OL");
        // `EFR___` collapses to `EFR`
        assert_eq!(info["product"], "EFR");
    }

    #[test]
    fn test_s5_category_trimming() {
        let info = scene_id_info(S5_ID).unwrap();
        assert_eq!(info["category"], "L2");
        assert_eq!(info["product"], "NO2");
    }

    #[test]
    fn test_unsupported_satellite() {
        assert!(scene_id_info("S4X_SOMETHING").is_err());
        assert!(scene_id_info("LC08_L2SP").is_err());
    }

    #[test]
    fn test_s1_folder() {
        let folder = scene_id_folder(S1_ID, None).unwrap();
        assert_eq!(folder, "GRD/2024/01/01");
    }

    #[test]
    fn test_s2_folder() {
        let folder = scene_id_folder(S2_ID, None).unwrap();
        assert_eq!(folder, "L2A/tiles/32/T/QM/2024/01");
    }

    #[test]
    fn test_s3_folder_recomposes_product() {
        let folder = scene_id_folder(S3_ID, None).unwrap();
        assert_eq!(folder, "OLCI/OL_1_EFR___/2024/01/01");
    }

    #[test]
    fn test_custom_folder_format() {
        let folder = scene_id_folder(S2_ID, Some("{sensor}/{year}")).unwrap();
        assert_eq!(folder, "S2A/2024");
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(collection_name(S1_ID).unwrap(), "sentinel-1-grd");
        assert_eq!(collection_name(S2_ID).unwrap(), "sentinel-2-c1-l2a");
        assert_eq!(collection_name(S3_ID).unwrap(), "sentinel-3-olci-l1-efr");
        assert_eq!(collection_name(S5_ID).unwrap(), "sentinel-5p-l2");
        assert!(collection_name("S9X_UNKNOWN").is_err());
    }

    #[test]
    fn test_s1_unique_id_drops_product_identifier() {
        let uniq = unique_id(S1_ID).unwrap();
        assert_eq!(
            uniq,
            "S1A_IW_GRDH_1SDV_20240101T052959_20240101T053024_051868_0644E5"
        );
    }

    #[test]
    fn test_s2_unique_id_drops_baseline() {
        let uniq = unique_id(S2_ID).unwrap();
        assert_eq!(
            uniq,
            "S2A_MSIL2A_20240101T101021_R022_T32TQM_20240101T120000"
        );
    }

    #[test]
    fn test_s3_unique_id_recomposed() {
        let uniq = unique_id(S3_ID).unwrap();
        assert_eq!(
            uniq,
            "S3A_OL_1_EFR_20240101T093241_20240101T093541_0179_107_307_2160"
        );
    }

    #[test]
    fn test_s2_rename_table_covers_scl() {
        assert!(S2_ASSET_RENAMES.iter().any(|r| r.from == "scl" && r.to == "SCL"));
    }
}
