//! Landsat scene-identifier grammar
//!
//! Collection-2 identifier grammar (see the USGS naming convention for
//! Landsat Collections Level-1 scenes), archive folder layout, collection
//! mapping, and the per-mission asset rename tables.

use crate::datasets::{named_captures, render_template};
use crate::domain::{MeridianError, Result};
use crate::stac::AssetRename;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const SCENE_ID_PATTERN: &str = r"^L(?P<sensor>C|O|T|E|M)(?P<satellite>[0-9]{2})_(?P<processingLevel>[0-9A-Z]{4})_(?P<wrsPath>[0-9]{3})(?P<wrsRow>[0-9]{3})_(?P<start>[0-9]{8})_(?P<processingTime>[0-9]{8})_(?P<collectionNumber>[0-9]{2})_(?P<collectionCategory>[A-Z0-9]{2})$";

const FOLDER_TEMPLATE: &str =
    "level-{processingLevelNo}/standard/{sensor}/{year}/{wrsPath}/{wrsRow}";

fn scene_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SCENE_ID_PATTERN).expect("hard-coded scene id pattern"))
}

/// Sensor name for a Landsat sensor code letter
pub fn sensor_name(code: &str) -> Option<&'static str> {
    match code {
        "C" => Some("oli-tirs"),
        "O" => Some("oli"),
        "E" => Some("etm"),
        "T" => Some("tm"),
        "M" => Some("mss"),
        _ => None,
    }
}

/// Parse a Landsat scene identifier into its grammar fields
pub fn scene_id_info(scene_id: &str) -> Result<BTreeMap<String, String>> {
    named_captures(scene_id_regex(), scene_id).ok_or_else(|| {
        MeridianError::SceneId(format!("Scene ID does not match grammar: {scene_id}"))
    })
}

/// Derive the archive folder of a Landsat scene
pub fn scene_id_folder(scene_id: &str, folder_format: Option<&str>) -> Result<String> {
    let mut variables = scene_id_info(scene_id)?;

    if let Some(start) = variables.get("start") {
        let date = NaiveDate::parse_from_str(start, "%Y%m%d").map_err(|e| {
            MeridianError::SceneId(format!("Invalid acquisition date in {scene_id}: {e}"))
        })?;
        variables.insert("year".to_string(), date.format("%Y").to_string());
        variables.insert("month".to_string(), date.format("%m").to_string());
        variables.insert("day".to_string(), date.format("%d").to_string());
    }
    if let Some(sensor) = variables.get("sensor").cloned() {
        if let Some(name) = sensor_name(&sensor) {
            variables.insert("sensor".to_string(), name.to_string());
        }
    }
    if let Some(level) = variables.get("processingLevel") {
        // L2SP → level number "2"
        let number: String = level.chars().skip(1).take(1).collect();
        variables.insert("processingLevelNo".to_string(), number);
    }

    render_template(folder_format.unwrap_or(FOLDER_TEMPLATE), &variables)
}

/// Inventory collection name of a Landsat scene
///
/// Keyed by `{sensor}_{collection}_{level}`, e.g. `LC_C2_L2` →
/// `landsat-ot-c2-l2`.
pub fn collection_name(scene_id: &str) -> Result<&'static str> {
    let parts: Vec<&str> = scene_id.split('_').collect();
    if parts.len() < 6 || parts[0].len() < 2 || parts[1].len() < 2 || parts[5].len() < 2 {
        return Err(MeridianError::SceneId(format!(
            "Scene ID has too few segments: {scene_id}"
        )));
    }

    let sensor = &parts[0][..2];
    let collection = format!("C{}", &parts[5][1..2]);
    let level = &parts[1][..2];

    match format!("{sensor}_{collection}_{level}").as_str() {
        "LC_C2_L1" => Ok("landsat-ot-c2-l1"),
        "LC_C2_L2" => Ok("landsat-ot-c2-l2"),
        "LE_C2_L1" => Ok("landsat-etm-c2-l1"),
        "LE_C2_L2" => Ok("landsat-etm-c2-l2"),
        "LT_C2_L1" => Ok("landsat-tm-c2-l1"),
        "LT_C2_L2" => Ok("landsat-tm-c2-l2"),
        other => Err(MeridianError::SceneId(format!(
            "Could not find {other} in pre-defined collections for scene {scene_id}"
        ))),
    }
}

/// Processing-independent unique identifier of a Landsat scene
///
/// Drops the processing-date segment so reprocessed scenes collapse onto one
/// identifier.
pub fn unique_id(scene_id: &str) -> Result<String> {
    let mut parts: Vec<&str> = scene_id.split('_').collect();
    if parts.len() < 5 {
        return Err(MeridianError::SceneId(format!(
            "Scene ID has too few segments: {scene_id}"
        )));
    }
    parts.remove(4);
    Ok(parts.join("_"))
}

/// Asset renames shared by Landsat 4/5 (TM) and Landsat 7 (ETM+) products
const TM_ETM_RENAMES: &[AssetRename] = &[
    AssetRename::new("blue", "B01", "Blue Band (B01)"),
    AssetRename::new("green", "B02", "Green Band (B02)"),
    AssetRename::new("red", "B03", "Red Band (B03)"),
    AssetRename::new("nir08", "B04", "Near Infrared Band 0.8 (B04)"),
    AssetRename::new("swir16", "B05", "Short-wave Infrared Band 1.6 (B05)"),
    AssetRename::new("lwir", "B06", "Surface Temperature Band (B06)"),
    AssetRename::new("swir22", "B07", "Short-wave Infrared Band 2.2 (B07)"),
    AssetRename::new("atmos_opacity", "Atmos_Opacity", ""),
    AssetRename::new("atran", "ATRAN", ""),
    AssetRename::new("cdist", "CDIST", ""),
    AssetRename::new("drad", "DRAD", ""),
    AssetRename::new("urad", "URAD", ""),
    AssetRename::new("trad", "TRAD", ""),
    AssetRename::new("emis", "EMIS", ""),
    AssetRename::new("emsd", "EMSD", ""),
    AssetRename::new("qa_pixel", "QA_Pixel", ""),
    AssetRename::new("qa_radsat", "QA_Radsat", ""),
    AssetRename::new("qa", "QA_Temp", ""),
    AssetRename::new("cloud_qa", "QA_Cloud", ""),
];

/// Asset renames for Landsat 8/9 (OLI-TIRS) products
const OLI_RENAMES: &[AssetRename] = &[
    AssetRename::new("coastal", "B01", "Coastal/Aerosol Band (B01)"),
    AssetRename::new("blue", "B02", "Blue Band (B02)"),
    AssetRename::new("green", "B03", "Green Band (B03)"),
    AssetRename::new("red", "B04", "Red Band (B04)"),
    AssetRename::new("nir08", "B05", "Near Infrared Band 0.8 (B05)"),
    AssetRename::new("swir16", "B06", "Short-wave Infrared Band 1.6 (B06)"),
    AssetRename::new("lwir11", "B10", "Surface Temperature Band (B10)"),
    AssetRename::new("swir22", "B07", "Short-wave Infrared Band 2.2 (B07)"),
    AssetRename::new("atran", "ATRAN", ""),
    AssetRename::new("cdist", "CDIST", ""),
    AssetRename::new("drad", "DRAD", ""),
    AssetRename::new("urad", "URAD", ""),
    AssetRename::new("trad", "TRAD", ""),
    AssetRename::new("emis", "EMIS", ""),
    AssetRename::new("emsd", "EMSD", ""),
    AssetRename::new("qa_pixel", "QA_Pixel", ""),
    AssetRename::new("qa_radsat", "QA_Radsat", ""),
    AssetRename::new("qa", "QA_Temp", ""),
    AssetRename::new("qa_aerosol", "QA_Aerosol", ""),
];

/// Asset rename table for a scene's mission family (`LT`, `LE`, `LC`)
pub fn asset_renames(scene_id: &str) -> Result<&'static [AssetRename]> {
    match scene_id.get(0..2) {
        Some("LT") => Ok(TM_ETM_RENAMES),
        Some("LE") => Ok(TM_ETM_RENAMES),
        Some("LC") => Ok(OLI_RENAMES),
        _ => Err(MeridianError::SceneId(format!(
            "No asset rename table for {scene_id}"
        ))),
    }
}
