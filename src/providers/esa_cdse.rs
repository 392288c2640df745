//! ESA Copernicus Data Space provider (OData API)
//!
//! Searches `/Products` with an OData `$filter` over the publication window
//! and follows `@odata.nextLink` pagination. Scene documents flatten the
//! OData `Attributes` array into top-level fields; the same mapping also
//! shapes rows of the CDSE bulk-inventory snapshot, which carries the same
//! columns.

use crate::config::schema::CdseConfig;
use crate::core::reconcile::snapshot::{split_extension, SnapshotRecord};
use crate::datasets::sentinel;
use crate::domain::ids::CollectionId;
use crate::domain::scene::OrderStatus;
use crate::domain::{MeridianError, ProviderError, Result};
use crate::providers::provider::{SceneProvider, SearchWindow};
use crate::stac::{calculate_bbox, StacItem};
use async_trait::async_trait;
use chrono::{NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::time::Duration;

/// Mission filters used when the configuration doesn't override them:
/// S1 SLC/GRD excluding COG and CARD backscatter products, S2 L2A excluding
/// invalidated `N9999` reprocessings.
const DEFAULT_FILTERS: &[&str] = &[
    "(startswith(Name,'S1') and (contains(Name,'SLC') or contains(Name,'GRD')) and not contains(Name,'_COG') and not contains(Name, 'CARD_BS'))&$expand=Attributes",
    "(startswith(Name,'S2') and (contains(Name,'L2A')) and not contains(Name,'_N9999'))",
];

/// ESA CDSE provider client
pub struct CdseProvider {
    http: reqwest::Client,
    config: CdseConfig,
}

impl CdseProvider {
    /// Create a new CDSE provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: CdseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| MeridianError::Connection(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Run one OData query, following `@odata.nextLink` pagination
    pub async fn search_data(&self, query_filter: &str) -> Result<Vec<Value>> {
        let mut scenes = Vec::new();
        let mut query_url = Some(format!("{}{query_filter}", self.config.api_url));

        while let Some(url) = query_url.take() {
            tracing::debug!(url = %url, "CDSE query");

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| ProviderError::ConnectionFailed(format!("GET {url} failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::SearchFailed(format!("{status}: {message}")).into());
            }

            let data: Value = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Invalid OData response: {e}"))
            })?;

            if let Some(features) = data["value"].as_array() {
                tracing::info!(count = features.len(), "Found scenes");
                for feature in features {
                    scenes.push(flatten_odata_scene(feature));
                }
            }

            query_url = data["@odata.nextLink"].as_str().map(str::to_string);
        }

        Ok(scenes)
    }

    /// Build a STAC item from a bulk-inventory snapshot row
    ///
    /// Snapshot rows carry the same columns the OData API serves (`Name`,
    /// `S3Path`, `GeoFootprint`, `ContentLength`, publication and
    /// modification dates), so they reuse the provider's item mapping.
    pub fn item_from_snapshot(
        &self,
        record: &SnapshotRecord,
        collection: Option<&CollectionId>,
    ) -> Result<StacItem> {
        let field = |name: &str| record.fields.get(name).cloned().unwrap_or_default();

        let geo_footprint = record
            .fields
            .get("GeoFootprint")
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .unwrap_or(Value::Null);

        let scene = json!({
            "uid": field("Id"),
            "scene_id": record.id,
            "S3Path": field("S3Path"),
            "GeoFootprint": geo_footprint,
            "ContentLength": field("ContentLength"),
            "PublicationDate": field("PublicationDate"),
            "ModificationDate": field("ModificationDate"),
        });

        self.to_item(&scene, collection)
    }
}

/// Flatten one OData product into the provider scene shape
fn flatten_odata_scene(feature: &Value) -> Value {
    let mut scene = json!({
        "uid": feature["Id"],
        "scene_id": feature["Name"],
        "S3Path": feature["S3Path"],
        "GeoFootprint": feature["GeoFootprint"],
        "ContentLength": feature["ContentLength"],
        "PublicationDate": feature["PublicationDate"],
        "ModificationDate": feature["ModificationDate"],
    });

    if let Some(attributes) = feature["Attributes"].as_array() {
        for attribute in attributes {
            if let Some(name) = attribute["Name"].as_str() {
                scene[name] = attribute["Value"].clone();
            }
        }
    }

    scene
}

#[async_trait]
impl SceneProvider for CdseProvider {
    fn name(&self) -> &'static str {
        "cdse"
    }

    async fn search_scenes(&self, window: &SearchWindow) -> Result<Vec<Value>> {
        let date_from = window.date_from.to_rfc3339_opts(SecondsFormat::Millis, true);
        let date_to = window
            .date_to
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let filter_base = format!(
            "((PublicationDate ge {date_from} and PublicationDate lt {date_to}) and (Online eq true))"
        );

        let filters: Vec<String> = match &self.config.filters {
            Some(filters) => filters.clone(),
            None => DEFAULT_FILTERS.iter().map(|f| f.to_string()).collect(),
        };

        let mut scenes = Vec::new();
        for filter in &filters {
            let filter_all = format!("{filter_base} and {filter}");
            let query = format!(
                "/Products?$filter={filter_all}&$top={}",
                self.config.page_size
            );

            match self.search_data(&query).await {
                Ok(found) => {
                    tracing::info!(count = found.len(), filter = %filter, "Scenes found");
                    scenes.extend(found);
                }
                Err(e) => {
                    tracing::error!(error = %e, filter = %filter, "Search failed");
                    return Err(e);
                }
            }
        }

        Ok(scenes)
    }

    fn to_item(&self, scene: &Value, collection: Option<&CollectionId>) -> Result<StacItem> {
        let uid = scene["uid"].as_str().unwrap_or_default().to_string();
        let raw_name = scene["scene_id"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidScene("Scene has no name".to_string()))?;
        let (scene_id, _extension) = split_extension(raw_name);

        let info = sentinel::scene_id_info(scene_id)?;
        let id_parts: Vec<&str> = scene_id.split('_').collect();

        let datetime = NaiveDateTime::parse_from_str(&info["start"], "%Y%m%dT%H%M%S")
            .map_err(|e| {
                ProviderError::InvalidScene(format!("Invalid start timestamp in {scene_id}: {e}"))
            })?
            .and_utc();

        let mut item = StacItem::new(scene_id);
        item.set_datetime(datetime);

        if !scene["GeoFootprint"].is_null() {
            let geometry = scene["GeoFootprint"].clone();
            match calculate_bbox(&geometry) {
                Ok(bbox) => item.bbox = Some(bbox),
                Err(e) => tracing::error!(scene_id = scene_id, error = %e, "Bbox failed"),
            }
            item.geometry = Some(geometry);
        }

        item.set_property("esa:uuid", uid.clone());
        item.set_property("esa:scene_id", scene_id);
        if scene_id.starts_with("S2") && id_parts.len() > 5 {
            item.set_property("s2:tile", id_parts[5][1..].to_string());
            item.set_property("s2:baseline", id_parts[3].to_string());
        }

        let publication_date = scene["PublicationDate"].as_str().unwrap_or_default();
        let modification_date = scene["ModificationDate"].as_str().unwrap_or_default();
        item.set_property("cdse:publication_date", publication_date);
        item.set_property("cdse:modification_date", modification_date);
        item.set_property("version", modification_date);
        item.set_property("deprecated", false);
        item.stamp_order(OrderStatus::Orderable, None, None);

        let folder = sentinel::scene_id_folder(scene_id, None)?;
        item.set_property("meridian:folder", format!("{folder}/{raw_name}"));

        let collection_id = match collection {
            Some(collection) => collection.as_str().to_string(),
            None => sentinel::collection_name(scene_id)?.to_string(),
        };
        item.collection = Some(collection_id.clone());

        // S5P products have no dedicated inventory collection yet
        if scene_id.starts_with("S5") {
            item.set_property("meridian:collection_id", "");
        } else {
            item.set_property("meridian:collection_id", collection_id.clone());
        }

        let unique_id = sentinel::unique_id(scene_id)?;
        item.set_property("meridian:uniq_id", unique_id.clone());

        let s3_path = scene["S3Path"].as_str().unwrap_or_default();
        item.set_property("cdse:s3path", s3_path);

        item.set_property(
            "meridian:order",
            json!({
                "cdse_id": uid,
                "scene_id": scene_id,
                "uniq_id": unique_id,
                "inventory": item.collection,
                "collection": item.property_str("meridian:collection_id"),
                "download_folder": folder,
                "s3path": s3_path,
            }),
        );

        Ok(item)
    }
}
