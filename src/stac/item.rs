//! STAC item model
//!
//! A minimal GeoJSON-feature-shaped STAC item used to carry scene metadata
//! between providers and the inventory. Unknown properties and asset fields
//! are passed through untouched so that provider extensions survive the
//! round trip.

use crate::domain::ids::{BatchId, OrderId};
use crate::domain::scene::OrderStatus;
use crate::domain::{MeridianError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// STAC specification version written into produced items
pub const STAC_VERSION: &str = "1.0.0";

/// One asset of a STAC item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacAsset {
    /// Asset location
    pub href: String,

    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Media type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Asset roles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// Extension fields (eo:bands, file:size, proj:*, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StacAsset {
    /// Create an asset pointing at a location
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
            media_type: None,
            roles: None,
            extra: Map::new(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the media type
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// A STAC item: one scene's spatial/temporal extent, properties, and assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    /// GeoJSON type, always `"Feature"`
    #[serde(rename = "type", default = "feature_type")]
    pub item_type: String,

    /// STAC version the item conforms to
    #[serde(default = "default_stac_version")]
    pub stac_version: String,

    /// Activated STAC extensions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,

    /// Scene identifier
    pub id: String,

    /// Collection the item belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// GeoJSON geometry (kept as a raw value; only the bbox is computed here)
    #[serde(default)]
    pub geometry: Option<Value>,

    /// Bounding box `[west, south, east, north]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Item properties (datetime plus arbitrary extension fields)
    pub properties: Map<String, Value>,

    /// Item assets keyed by asset name
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,

    /// Item links (kept opaque)
    #[serde(default)]
    pub links: Vec<Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn default_stac_version() -> String {
    STAC_VERSION.to_string()
}

impl StacItem {
    /// Create an item with an id and empty properties
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            item_type: feature_type(),
            stac_version: default_stac_version(),
            stac_extensions: Vec::new(),
            id: id.into(),
            collection: None,
            geometry: None,
            bbox: None,
            properties: Map::new(),
            assets: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    /// Parse an item from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| MeridianError::Stac(format!("Invalid STAC item: {e}")))
    }

    /// Serialize the item to a JSON value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| MeridianError::Stac(format!("Failed to serialize STAC item: {e}")))
    }

    /// Set the acquisition datetime property
    pub fn set_datetime(&mut self, datetime: DateTime<Utc>) {
        self.properties.insert(
            "datetime".to_string(),
            Value::String(datetime.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
    }

    /// Set a start/end datetime range (items without a single acquisition
    /// instant carry a null `datetime` plus the range, per the STAC spec)
    pub fn set_datetime_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.properties.insert("datetime".to_string(), Value::Null);
        self.properties.insert(
            "start_datetime".to_string(),
            Value::String(start.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        self.properties.insert(
            "end_datetime".to_string(),
            Value::String(end.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
    }

    /// Set a property
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get a property as a string slice
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Current order status carried in the properties, if any
    pub fn order_status(&self) -> Option<OrderStatus> {
        self.property_str("order:status")
            .and_then(|s| s.parse().ok())
    }

    /// Stamp order properties onto the item
    ///
    /// Mirrors the inventory convention: `order:status` is always written,
    /// `order:id` and `order:batch_id` only when present.
    pub fn stamp_order(
        &mut self,
        status: OrderStatus,
        order_id: Option<&OrderId>,
        batch_id: Option<&BatchId>,
    ) {
        self.set_property("order:status", status.as_str());
        if let Some(order_id) = order_id {
            self.set_property("order:id", order_id.as_str());
        }
        if let Some(batch_id) = batch_id {
            self.set_property("order:batch_id", batch_id.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_new_defaults() {
        let item = StacItem::new("LC08_L2SP_187024_20200101_20200823_02_T1");
        assert_eq!(item.item_type, "Feature");
        assert_eq!(item.stac_version, STAC_VERSION);
        assert!(item.assets.is_empty());
        assert!(item.geometry.is_none());
    }

    #[test]
    fn test_item_set_datetime() {
        let mut item = StacItem::new("scene");
        item.set_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 10, 10, 21).unwrap());
        assert_eq!(
            item.property_str("datetime"),
            Some("2024-01-01T10:10:21.000000Z")
        );
    }

    #[test]
    fn test_item_datetime_range_nulls_datetime() {
        let mut item = StacItem::new("scene");
        item.set_datetime_range(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        );
        assert_eq!(item.properties.get("datetime"), Some(&Value::Null));
        assert!(item.property_str("start_datetime").is_some());
        assert!(item.property_str("end_datetime").is_some());
    }

    #[test]
    fn test_item_stamp_order() {
        let mut item = StacItem::new("scene");
        let order = OrderId::new("order-1").unwrap();
        let batch = order.batch(2);
        item.stamp_order(OrderStatus::Ordered, Some(&order), Some(&batch));
        assert_eq!(item.order_status(), Some(OrderStatus::Ordered));
        assert_eq!(item.property_str("order:id"), Some("order-1"));
        assert_eq!(item.property_str("order:batch_id"), Some("order-1_2"));
    }

    #[test]
    fn test_item_stamp_order_without_ids() {
        let mut item = StacItem::new("scene");
        item.stamp_order(OrderStatus::Orderable, None, None);
        assert_eq!(item.property_str("order:status"), Some("orderable"));
        assert!(!item.properties.contains_key("order:id"));
        assert!(!item.properties.contains_key("order:batch_id"));
    }

    #[test]
    fn test_item_serde_round_trip() {
        let mut item = StacItem::new("scene-1");
        item.collection = Some("sentinel-2-c1-l2a".to_string());
        item.set_property("deprecated", false);
        item.assets.insert(
            "B02".to_string(),
            StacAsset::new("s3://bucket/B02.tif").with_title("Blue Band (B02)"),
        );

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["assets"]["B02"]["title"], "Blue Band (B02)");

        let back = StacItem::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_asset_extra_fields_pass_through() {
        let json = serde_json::json!({
            "href": "s3://bucket/B02.tif",
            "eo:bands": [{"name": "B02"}],
            "file:size": 1234
        });
        let asset: StacAsset = serde_json::from_value(json).unwrap();
        assert_eq!(asset.extra["file:size"], 1234);
        let back = serde_json::to_value(&asset).unwrap();
        assert_eq!(back["eo:bands"][0]["name"], "B02");
    }
}
