//! STAC item model and shaping
//!
//! Provides the serde types for STAC items and assets, bbox computation over
//! GeoJSON geometry values, and mission asset-key renaming.

pub mod geometry;
pub mod item;
pub mod rename;

pub use geometry::{calculate_bbox, polygon_from_points};
pub use item::{StacAsset, StacItem, STAC_VERSION};
pub use rename::{overlay_base_assets, rename_assets, AssetRename};
