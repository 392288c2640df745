//! GeoJSON geometry helpers
//!
//! Bounding-box computation over raw GeoJSON geometry values and polygon
//! construction from provider point lists. Geometries stay `serde_json`
//! values end to end; only the coordinate arrays are interpreted here.

use crate::domain::{MeridianError, Result};
use serde_json::{json, Value};

/// Compute the `[west, south, east, north]` bounding box of a GeoJSON geometry
///
/// Supports Point, LineString, Polygon, MultiPolygon, and MultiLineString
/// coordinate shapes by walking the nested coordinate arrays.
///
/// # Errors
///
/// Returns an error if the value carries no finite coordinate pairs.
pub fn calculate_bbox(geometry: &Value) -> Result<[f64; 4]> {
    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| MeridianError::Stac("Geometry has no coordinates".to_string()))?;

    let mut bbox = BboxAccumulator::new();
    collect_positions(coordinates, &mut bbox);

    bbox.finish()
        .ok_or_else(|| MeridianError::Stac("Geometry has no valid positions".to_string()))
}

/// Build a GeoJSON Polygon from `(longitude, latitude)` points
///
/// The input point order is reversed (CMR GPolygon boundaries list points
/// clockwise; GeoJSON exterior rings are counter-clockwise) and the ring is
/// closed if the first and last points differ.
pub fn polygon_from_points(points: &[(f64, f64)]) -> Result<Value> {
    if points.len() < 3 {
        return Err(MeridianError::Stac(format!(
            "Polygon needs at least 3 points, got {}",
            points.len()
        )));
    }

    let mut ring: Vec<[f64; 2]> = points.iter().rev().map(|&(lon, lat)| [lon, lat]).collect();
    if ring.first() != ring.last() {
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
    }

    Ok(json!({
        "type": "Polygon",
        "coordinates": [ring],
    }))
}

struct BboxAccumulator {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    seen: bool,
}

impl BboxAccumulator {
    fn new() -> Self {
        Self {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
            seen: false,
        }
    }

    fn push(&mut self, lon: f64, lat: f64) {
        if !lon.is_finite() || !lat.is_finite() {
            return;
        }
        self.west = self.west.min(lon);
        self.south = self.south.min(lat);
        self.east = self.east.max(lon);
        self.north = self.north.max(lat);
        self.seen = true;
    }

    fn finish(self) -> Option<[f64; 4]> {
        if self.seen {
            Some([self.west, self.south, self.east, self.north])
        } else {
            None
        }
    }
}

fn collect_positions(value: &Value, bbox: &mut BboxAccumulator) {
    let Some(array) = value.as_array() else {
        return;
    };

    // A position is an array whose first two elements are numbers.
    if array.len() >= 2 {
        if let (Some(lon), Some(lat)) = (array[0].as_f64(), array[1].as_f64()) {
            bbox.push(lon, lat);
            return;
        }
    }

    for element in array {
        collect_positions(element, bbox);
    }
}
