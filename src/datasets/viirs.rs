//! VIIRS granule-identifier grammar
//!
//! VIIRS products (`VNP09GA`, `VNP13A1`, ...) share the dot-separated MODIS
//! granule grammar but lay out their archive without the sensor prefix.

use crate::datasets::{modis, render_template};
use crate::domain::Result;
use std::collections::BTreeMap;

const FOLDER_TEMPLATE: &str = "{product}.{version}/{year}/{month}/{day}/{tile_id}";

/// Parse a VIIRS granule identifier into its grammar fields
pub fn scene_id_info(scene_id: &str) -> Result<BTreeMap<String, String>> {
    modis::scene_id_info(scene_id)
}

/// Derive the archive folder of a VIIRS granule
pub fn scene_id_folder(scene_id: &str, folder_format: Option<&str>) -> Result<String> {
    let variables = scene_id_info(scene_id)?;
    render_template(folder_format.unwrap_or(FOLDER_TEMPLATE), &variables)
}

/// Inventory collection of a VIIRS granule
///
/// `VNP09GA.A2023255.h08v08.001....` → `viirs-vnp09ga-001`
pub fn inventory_collection(scene_id: &str) -> Result<String> {
    modis::inventory_collection(scene_id).map(|name| name.replacen("modis-", "viirs-", 1))
}

/// Catalog collection of a VIIRS granule (product minus its prefix)
pub fn collection_name(scene_id: &str) -> Result<String> {
    modis::collection_name(scene_id).map(|name| name.replacen("modis-", "viirs-", 1))
}
