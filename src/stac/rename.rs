//! Asset-key renaming
//!
//! Providers emit STAC assets under common-band names (`blue`, `nir08`, ...)
//! while the inventory stores them under mission band codes (`B02`, `B05`,
//! ...). The rename tables live with the mission grammars in
//! [`crate::datasets`]; this module applies them.

use crate::stac::item::StacItem;
use serde_json::Value;
use std::collections::BTreeMap;

/// One asset-key rename rule
#[derive(Debug, Clone, Copy)]
pub struct AssetRename {
    /// Key as produced by the provider metadata
    pub from: &'static str,
    /// Key as stored in the inventory
    pub to: &'static str,
    /// Replacement title; empty keeps the existing title
    pub title: &'static str,
}

impl AssetRename {
    /// Shorthand constructor used by the mission tables
    pub const fn new(from: &'static str, to: &'static str, title: &'static str) -> Self {
        Self { from, to, title }
    }
}

/// Apply a mission rename table to an item's assets
///
/// Matching assets move to their target key; the first `eo:bands` entry (when
/// present) is renamed to the band code, and a non-empty rule title replaces
/// the asset title. When `keep_unmatched` is false, assets without a rule are
/// dropped (Sentinel-2 keeps only the renamed band set); when true they stay
/// under their original key (Landsat keeps QA and angle assets untouched).
pub fn rename_assets(item: &mut StacItem, table: &[AssetRename], keep_unmatched: bool) {
    let mut renamed = BTreeMap::new();

    for rule in table {
        let Some(mut asset) = item.assets.remove(rule.from) else {
            tracing::debug!(from = rule.from, to = rule.to, "Asset key not present, skipping");
            continue;
        };

        if let Some(bands) = asset.extra.get_mut("eo:bands").and_then(Value::as_array_mut) {
            if let Some(first) = bands.first_mut().and_then(Value::as_object_mut) {
                first.insert("name".to_string(), Value::String(rule.to.to_string()));
            }
        }
        if !rule.title.is_empty() {
            asset.title = Some(rule.title.to_string());
        }

        renamed.insert(rule.to.to_string(), asset);
    }

    if keep_unmatched {
        renamed.extend(std::mem::take(&mut item.assets));
    }

    item.assets = renamed;
}

/// Overlay a collection-level asset template onto an item
///
/// Base items carry canonical asset definitions (`item_assets` in collection
/// JSON); every field of a template asset overrides the matching field of the
/// item asset with the same key. Template keys absent from the item are
/// ignored.
pub fn overlay_base_assets(item: &mut StacItem, base_item: &Value) {
    let template = base_item
        .get("item_assets")
        .or_else(|| base_item.get("assets"))
        .and_then(Value::as_object);

    let Some(template) = template else {
        return;
    };

    for (key, fields) in template {
        let Some(asset) = item.assets.get_mut(key) else {
            continue;
        };
        let Some(fields) = fields.as_object() else {
            continue;
        };

        for (field, value) in fields {
            match field.as_str() {
                "href" => {
                    if let Some(href) = value.as_str() {
                        asset.href = href.to_string();
                    }
                }
                "title" => asset.title = value.as_str().map(str::to_string),
                "type" => asset.media_type = value.as_str().map(str::to_string),
                "roles" => {
                    asset.roles = serde_json::from_value(value.clone()).ok();
                }
                _ => {
                    asset.extra.insert(field.clone(), value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stac::item::StacAsset;
    use serde_json::json;

    fn item_with_assets(keys: &[&str]) -> StacItem {
        let mut item = StacItem::new("scene");
        for key in keys {
            item.assets
                .insert((*key).to_string(), StacAsset::new(format!("s3://x/{key}.tif")));
        }
        item
    }

    const TABLE: &[AssetRename] = &[
        AssetRename::new("blue", "B02", "Blue Band (B02)"),
        AssetRename::new("green", "B03", ""),
    ];

    #[test]
    fn test_rename_moves_and_titles() {
        let mut item = item_with_assets(&["blue", "green"]);
        rename_assets(&mut item, TABLE, true);

        assert!(item.assets.contains_key("B02"));
        assert!(item.assets.contains_key("B03"));
        assert!(!item.assets.contains_key("blue"));
        assert_eq!(item.assets["B02"].title.as_deref(), Some("Blue Band (B02)"));
        assert_eq!(item.assets["B03"].title, None);
    }

    #[test]
    fn test_rename_drops_unmatched_when_requested() {
        let mut item = item_with_assets(&["blue", "thumbnail"]);
        rename_assets(&mut item, TABLE, false);
        assert!(item.assets.contains_key("B02"));
        assert!(!item.assets.contains_key("thumbnail"));
    }

    #[test]
    fn test_rename_keeps_unmatched_when_requested() {
        let mut item = item_with_assets(&["blue", "thumbnail"]);
        rename_assets(&mut item, TABLE, true);
        assert!(item.assets.contains_key("B02"));
        assert!(item.assets.contains_key("thumbnail"));
    }

    #[test]
    fn test_rename_rewrites_eo_band_name() {
        let mut item = item_with_assets(&[]);
        let mut asset = StacAsset::new("s3://x/blue.tif");
        asset
            .extra
            .insert("eo:bands".to_string(), json!([{"name": "blue", "common_name": "blue"}]));
        item.assets.insert("blue".to_string(), asset);

        rename_assets(&mut item, TABLE, true);
        assert_eq!(item.assets["B02"].extra["eo:bands"][0]["name"], "B02");
        assert_eq!(item.assets["B02"].extra["eo:bands"][0]["common_name"], "blue");
    }

    #[test]
    fn test_overlay_base_assets() {
        let mut item = item_with_assets(&["B02"]);
        let base = json!({
            "item_assets": {
                "B02": {
                    "type": "image/tiff; application=geotiff; profile=cloud-optimized",
                    "gsd": 10,
                    "roles": ["data"]
                },
                "B99": {"type": "image/tiff"}
            }
        });
        overlay_base_assets(&mut item, &base);

        let asset = &item.assets["B02"];
        assert_eq!(
            asset.media_type.as_deref(),
            Some("image/tiff; application=geotiff; profile=cloud-optimized")
        );
        assert_eq!(asset.roles, Some(vec!["data".to_string()]));
        assert_eq!(asset.extra["gsd"], 10);
        // Template-only keys are not invented on the item
        assert!(!item.assets.contains_key("B99"));
    }
}
