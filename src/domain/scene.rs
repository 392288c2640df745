//! Scene lifecycle types
//!
//! A scene is one satellite acquisition product. The inventory tracks each
//! scene's order lifecycle through the `order:status` property.

use crate::domain::ids::{CollectionId, SceneId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status of a scene in the inventory
///
/// Transitions move forward: `orderable → pending → ordered → succeeded`.
/// `removed` marks a scene that is no longer available upstream; the
/// inventory keeps the record (with `deprecated = true`) instead of deleting
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Known upstream, not yet part of any order
    Orderable,
    /// Selected for an order, waiting to be picked up
    Pending,
    /// Part of a submitted order batch
    Ordered,
    /// Successfully delivered and available
    Succeeded,
    /// No longer present in the upstream inventory
    Removed,
}

impl OrderStatus {
    /// Returns the lowercase wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Orderable => "orderable",
            OrderStatus::Pending => "pending",
            OrderStatus::Ordered => "ordered",
            OrderStatus::Succeeded => "succeeded",
            OrderStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orderable" => Ok(OrderStatus::Orderable),
            "pending" => Ok(OrderStatus::Pending),
            "ordered" => Ok(OrderStatus::Ordered),
            "succeeded" => Ok(OrderStatus::Succeeded),
            "removed" => Ok(OrderStatus::Removed),
            other => Err(format!("Unknown order status: {other}")),
        }
    }
}

/// One scene record as tracked by the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Provider-specific scene identifier
    pub id: SceneId,

    /// Collection the scene belongs to
    pub collection: CollectionId,

    /// Acquisition datetime
    pub datetime: DateTime<Utc>,

    /// Current order lifecycle status
    pub status: OrderStatus,

    /// Whether the scene is deprecated (kept for history only)
    pub deprecated: bool,
}

impl SceneRecord {
    /// Create a new scene record in the `orderable` state
    pub fn new(id: SceneId, collection: CollectionId, datetime: DateTime<Utc>) -> Self {
        Self {
            id,
            collection,
            datetime,
            status: OrderStatus::Orderable,
            deprecated: false,
        }
    }

    /// Whether the scene still counts toward the active inventory
    pub fn is_active(&self) -> bool {
        self.status != OrderStatus::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Orderable,
            OrderStatus::Pending,
            OrderStatus::Ordered,
            OrderStatus::Succeeded,
            OrderStatus::Removed,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_order_status_unknown_fails() {
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Orderable).unwrap();
        assert_eq!(json, "\"orderable\"");
        let back: OrderStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(back, OrderStatus::Succeeded);
    }

    #[test]
    fn test_scene_record_defaults() {
        let record = SceneRecord::new(
            SceneId::new("LC08_L2SP_187024_20200101_20200823_02_T1").unwrap(),
            CollectionId::new("landsat-ot-c2-l2").unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap(),
        );
        assert_eq!(record.status, OrderStatus::Orderable);
        assert!(!record.deprecated);
        assert!(record.is_active());
    }

    #[test]
    fn test_scene_record_removed_not_active() {
        let mut record = SceneRecord::new(
            SceneId::new("scene").unwrap(),
            CollectionId::new("coll").unwrap(),
            Utc::now(),
        );
        record.status = OrderStatus::Removed;
        assert!(!record.is_active());
    }
}
