//! MODIS granule-identifier grammar
//!
//! Dot-separated granule identifiers, e.g.
//! `MOD09GA.A2023255.h08v08.061.2023257025446`. The acquisition date is an
//! ordinal date (`A%Y%j`); satellite and sensor derive from the product
//! prefix.

use crate::datasets::{named_captures, render_template};
use crate::domain::{MeridianError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const SCENE_ID_PATTERN: &str = r"^(?P<product>[0-9A-Z]{7,8})\.A(?P<start>[0-9]{7})\.(?P<tile_id>[0-9a-z]{6})\.(?P<version>[0-9]{3})\.(?P<date_production>[0-9]{13})$";

const FOLDER_TEMPLATE: &str = "{sensor}/{product}.{version}/{year}/{month}/{day}/{tile_id}";
const USGS_PATH_TEMPLATE: &str = "{usgs_path}/{product}.{version}/{year}.{month}.{day}";

fn scene_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SCENE_ID_PATTERN).expect("hard-coded scene id pattern"))
}

/// Parse a MODIS granule identifier into its grammar fields
///
/// Adds derived fields: `year`/`month`/`day` from the ordinal acquisition
/// date, `satellite` (Terra, Aqua, or Terra+Aqua) and `sensor` from the
/// product prefix, and the USGS archive path prefix for the satellite.
pub fn scene_id_info(scene_id: &str) -> Result<BTreeMap<String, String>> {
    let mut variables = named_captures(scene_id_regex(), scene_id).ok_or_else(|| {
        MeridianError::SceneId(format!("Scene ID does not match grammar: {scene_id}"))
    })?;

    if let Some(start) = variables.get("start") {
        let date = NaiveDate::parse_from_str(start, "%Y%j").map_err(|e| {
            MeridianError::SceneId(format!("Invalid ordinal date in {scene_id}: {e}"))
        })?;
        variables.insert("year".to_string(), date.format("%Y").to_string());
        variables.insert("month".to_string(), date.format("%m").to_string());
        variables.insert("day".to_string(), date.format("%d").to_string());
    }

    if let Some(product) = variables.get("product").cloned() {
        let (satellite, usgs_path) = if product.starts_with("MOD") {
            ("Terra", Some("https://e4ftl01.cr.usgs.gov/MOLT"))
        } else if product.starts_with("MYD") {
            ("Aqua", Some("https://e4ftl01.cr.usgs.gov/MOLA"))
        } else {
            ("Terra+Aqua", Some("https://e4ftl01.cr.usgs.gov/MOTA"))
        };
        variables.insert("satellite".to_string(), satellite.to_string());

        if product.starts_with("VNP") {
            variables.insert("sensor".to_string(), "VIIRS".to_string());
        } else {
            variables.insert("sensor".to_string(), "MODIS".to_string());
            if let Some(path) = usgs_path {
                variables.insert("usgs_path".to_string(), path.to_string());
            }
        }
    }

    Ok(variables)
}

/// Derive the archive folder of a MODIS granule
pub fn scene_id_folder(scene_id: &str, folder_format: Option<&str>) -> Result<String> {
    let variables = scene_id_info(scene_id)?;
    render_template(folder_format.unwrap_or(FOLDER_TEMPLATE), &variables)
}

/// USGS archive path of a MODIS granule
pub fn usgs_path(scene_id: &str) -> Result<String> {
    scene_id_folder(scene_id, Some(USGS_PATH_TEMPLATE))
}

/// Inventory collection of a granule, keyed by the full product name
///
/// `MOD09GA.A2023255.h08v08.061....` → `modis-mod09ga-061`
pub fn inventory_collection(scene_id: &str) -> Result<String> {
    let parts: Vec<&str> = scene_id.split('.').collect();
    if parts.len() < 4 {
        return Err(MeridianError::SceneId(format!(
            "Scene ID has too few segments: {scene_id}"
        )));
    }
    Ok(format!("modis-{}-{}", parts[0].to_lowercase(), parts[3]))
}

/// Catalog collection of a granule, keyed by the product minus its prefix
///
/// `MOD09GA.A2023255.h08v08.061....` → `modis-09ga-061`
pub fn collection_name(scene_id: &str) -> Result<String> {
    let parts: Vec<&str> = scene_id.split('.').collect();
    if parts.len() < 4 || parts[0].len() < 4 {
        return Err(MeridianError::SceneId(format!(
            "Scene ID has too few segments: {scene_id}"
        )));
    }
    let product = parts[0].to_lowercase();
    Ok(format!("modis-{}-{}", &product[3..], parts[3]))
}

/// Production-independent unique identifier (drops the production timestamp)
pub fn unique_id(scene_id: &str) -> Result<String> {
    let parts: Vec<&str> = scene_id.split('.').collect();
    if parts.len() < 2 {
        return Err(MeridianError::SceneId(format!(
            "Scene ID has too few segments: {scene_id}"
        )));
    }
    Ok(parts[..parts.len() - 1].join("."))
}
