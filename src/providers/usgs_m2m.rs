//! USGS provider (M2M API + landsatlook STAC server)
//!
//! The machine-to-machine API wraps every response in a JSON envelope with
//! `errorCode`/`errorMessage`/`data`; rate-limit error codes get exactly one
//! retry. Ingestion searches run against the landsatlook STAC server, which
//! returns plain STAC features.

use crate::config::schema::UsgsConfig;
use crate::domain::ids::CollectionId;
use crate::domain::{MeridianError, ProviderError, Result};
use crate::providers::provider::{SceneProvider, SearchWindow};
use crate::stac::StacItem;
use crate::datasets::landsat;
use async_trait::async_trait;
use chrono::SecondsFormat;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::time::Duration;

/// M2M error codes that indicate an authentication problem
const AUTHENTICATION_ERRORS: &[&str] = &["AUTH_INVALID", "AUTH_KEY_INVALID"];

/// M2M error codes that trigger a single retry
const RATE_LIMIT_ERRORS: &[&str] = &["RATE_LIMIT", "RATE_LIMIT_USER"];

/// One downloadable product from the `download-options` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOption {
    /// M2M entity identifier
    pub entity_id: String,
    /// Display (scene) identifier
    pub display_id: String,
    /// Product identifier for the download request
    pub product_id: String,
    /// Download system serving the product
    pub download_system: String,
}

/// USGS provider client
pub struct UsgsM2mProvider {
    http: reqwest::Client,
    config: UsgsConfig,
}

impl UsgsM2mProvider {
    /// Create a new USGS provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: UsgsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| MeridianError::Connection(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    async fn post_envelope(&self, url: &str, payload: &Value) -> Result<(u16, Value)> {
        let mut request = self.http.post(url).json(payload);
        if let Some(token) = &self.config.token {
            request = request.header("X-Auth-Token", token.expose_secret().to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(format!("POST {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let body: Value = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Invalid M2M response from {url}: {e}"))
        })?;

        Ok((status, body))
    }

    /// Send an M2M request and unwrap the response envelope
    ///
    /// Rate-limit error codes are retried exactly once; authentication error
    /// codes and HTTP 400/401/404 map to typed errors.
    pub async fn send_m2m_request(&self, endpoint: &str, payload: Value) -> Result<Value> {
        let url = format!("{}{endpoint}", self.config.m2m_url);

        let (mut status, mut body) = self.post_envelope(&url, &payload).await?;

        if let Some(code) = body["errorCode"].as_str().map(str::to_string) {
            let code = code.as_str();
            let message = body["errorMessage"].as_str().unwrap_or_default().to_string();
            tracing::warn!(code = code, message = %message, endpoint, "M2M error response");

            if RATE_LIMIT_ERRORS.contains(&code) {
                tracing::info!(endpoint, "Rate limited, retrying once");
                (status, body) = self.post_envelope(&url, &payload).await?;

                if let Some(code) = body["errorCode"].as_str() {
                    let message =
                        body["errorMessage"].as_str().unwrap_or_default().to_string();
                    return Err(ProviderError::RateLimitExceeded(format!(
                        "{code}: {message}"
                    ))
                    .into());
                }
            } else if AUTHENTICATION_ERRORS.contains(&code) {
                return Err(ProviderError::AuthenticationFailed(format!(
                    "{code}: {message}"
                ))
                .into());
            } else {
                return Err(ProviderError::ApiError { code: code.to_string(), message }.into());
            }
        }

        match status {
            400 | 401 | 404 => Err(ProviderError::ClientError {
                status,
                message: body["errorMessage"].as_str().unwrap_or_default().to_string(),
            }
            .into()),
            500..=599 => Err(ProviderError::ServerError {
                status,
                message: body["errorMessage"].as_str().unwrap_or_default().to_string(),
            }
            .into()),
            _ => Ok(body["data"].take()),
        }
    }

    /// Search scenes through the M2M `scene-search` endpoint
    pub async fn scene_search(&self, dataset_name: &str, query: Value) -> Result<Value> {
        let mut payload = query;
        payload["datasetName"] = Value::String(dataset_name.to_string());
        self.send_m2m_request("scene-search", payload).await
    }

    /// Download options for a set of scenes, deduplicated by entity id
    ///
    /// Products that are unavailable or served by the `folder` download
    /// system are skipped; each entity is returned at most once even when
    /// several download systems carry it.
    pub async fn download_options(
        &self,
        dataset_name: &str,
        entity_ids: &[String],
    ) -> Result<Vec<DownloadOption>> {
        let payload = json!({
            "datasetName": dataset_name,
            "entityIds": entity_ids,
        });

        let data = self.send_m2m_request("download-options", payload).await?;
        let Some(products) = data.as_array() else {
            tracing::info!(dataset = dataset_name, "No downloadable scenes found");
            return Ok(Vec::new());
        };

        let mut downloads = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for product in products {
            let available = product["available"].as_bool().unwrap_or(false);
            let download_system = product["downloadSystem"].as_str().unwrap_or_default();
            if !available || download_system == "folder" {
                continue;
            }

            let entity_id = product["entityId"].as_str().unwrap_or_default().to_string();
            if entity_id.is_empty() || !seen.insert(entity_id.clone()) {
                continue;
            }

            downloads.push(DownloadOption {
                entity_id,
                display_id: product["displayId"].as_str().unwrap_or_default().to_string(),
                product_id: product["id"].as_str().unwrap_or_default().to_string(),
                download_system: download_system.to_string(),
            });
        }

        tracing::info!(
            dataset = dataset_name,
            downloads = downloads.len(),
            "Downloadable data records found"
        );

        Ok(downloads)
    }
}

#[async_trait]
impl SceneProvider for UsgsM2mProvider {
    fn name(&self) -> &'static str {
        "usgs"
    }

    /// Search the landsatlook STAC server for scenes created in the window
    ///
    /// Returned features are stripped of their assets and a trailing `_SR`
    /// id suffix, matching how the inventory keys Landsat scenes.
    async fn search_scenes(&self, window: &SearchWindow) -> Result<Vec<Value>> {
        let mut created = json!({
            "gte": window.date_from.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        if let Some(date_to) = window.date_to {
            created["lt"] = Value::String(date_to.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        let payload = json!({
            "collections": self.config.collections,
            "limit": self.config.max_items,
            "query": { "created": created },
        });

        let url = format!("{}/search", self.config.stac_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::SearchFailed(format!("{status}: {message}")).into());
        }

        let body: Value = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Invalid STAC search response: {e}"))
        })?;

        let mut scenes = Vec::new();
        if let Some(features) = body["features"].as_array() {
            for feature in features {
                let mut feature = feature.clone();
                if let Some(object) = feature.as_object_mut() {
                    object.remove("assets");
                    if let Some(id) = object.get("id").and_then(Value::as_str) {
                        let id = id.strip_suffix("_SR").unwrap_or(id).to_string();
                        object.insert("id".to_string(), Value::String(id));
                    }
                }
                scenes.push(feature);
            }
        }

        tracing::info!(scenes = scenes.len(), "Scenes found");
        Ok(scenes)
    }

    fn to_item(&self, scene: &Value, collection: Option<&CollectionId>) -> Result<StacItem> {
        let mut scene = scene.clone();
        if let Some(object) = scene.as_object_mut() {
            object.remove("collection");
            object.remove("links");
        }

        let mut item = StacItem::from_value(scene)?;
        let item_id = item.id.clone();

        let unique_id = landsat::unique_id(&item_id)?;
        let folder = landsat::scene_id_folder(&item_id, None)?;
        let collection_id = match collection {
            Some(collection) => collection.as_str().to_string(),
            None => landsat::collection_name(&item_id)?.to_string(),
        };

        item.set_property("deprecated", false);
        item.stamp_order(crate::domain::scene::OrderStatus::Orderable, None, None);
        if let Some(updated) = item.property_str("updated").map(str::to_string) {
            item.set_property("version", updated);
        }

        // landsatlook serves the WRS coordinates as strings
        for key in ["landsat:wrs_row", "landsat:wrs_path"] {
            if let Some(parsed) = item
                .property_str(key)
                .and_then(|raw| raw.parse::<i64>().ok())
            {
                item.set_property(key, parsed);
            }
        }

        let landsat_id = item
            .property_str("landsat:scene_id")
            .unwrap_or(&item_id)
            .to_string();

        item.set_property("meridian:item_id", unique_id);
        item.set_property("meridian:folder", format!("{folder}/{item_id}"));
        item.set_property("meridian:collection_id", collection_id.clone());
        item.set_property(
            "meridian:order",
            json!({
                "scene_id": item_id,
                "landsat_id": landsat_id,
                "inventory": collection_id,
                "collection": collection_id,
                "download_folder": folder,
            }),
        );

        item.collection = Some(collection_id);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret::secret_string;

    fn test_config(m2m_url: String, stac_url: String) -> UsgsConfig {
        UsgsConfig {
            m2m_url,
            stac_url,
            token: Some(secret_string("token".to_string())),
            collections: vec!["landsat-c2l2-sr".to_string()],
            max_items: 100,
            timeout_seconds: 5,
        }
    }

    fn landsat_feature() -> Value {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "LC08_L2SP_187024_20200101_20200823_02_T1",
            "collection": "landsat-c2l2-sr",
            "geometry": {"type": "Point", "coordinates": [20.0, 50.0]},
            "links": [{"rel": "self", "href": "x"}],
            "properties": {
                "datetime": "2020-01-01T09:30:00Z",
                "updated": "2020-08-23T00:00:00Z",
                "landsat:scene_id": "LC81870242020001LGN00",
                "landsat:wrs_row": "024",
                "landsat:wrs_path": "187"
            }
        })
    }

    #[test]
    fn test_to_item_mapping() {
        let provider =
            UsgsM2mProvider::new(test_config("http://x/".to_string(), "http://y".to_string()))
                .unwrap();
        let item = provider.to_item(&landsat_feature(), None).unwrap();

        assert_eq!(item.collection.as_deref(), Some("landsat-ot-c2-l2"));
        assert_eq!(item.property_str("order:status"), Some("orderable"));
        assert_eq!(item.property_str("version"), Some("2020-08-23T00:00:00Z"));
        assert_eq!(
            item.property_str("meridian:item_id"),
            Some("LC08_L2SP_187024_20200101_02_T1")
        );
        assert_eq!(item.properties["landsat:wrs_row"], 24);
        assert_eq!(item.properties["landsat:wrs_path"], 187);
        assert_eq!(
            item.properties["meridian:order"]["landsat_id"],
            "LC81870242020001LGN00"
        );
        assert!(item.links.is_empty());
    }

    #[test]
    fn test_to_item_collection_override() {
        let provider =
            UsgsM2mProvider::new(test_config("http://x/".to_string(), "http://y".to_string()))
                .unwrap();
        let collection = CollectionId::new("custom-collection").unwrap();
        let item = provider.to_item(&landsat_feature(), Some(&collection)).unwrap();
        assert_eq!(item.collection.as_deref(), Some("custom-collection"));
    }

    #[tokio::test]
    async fn test_m2m_envelope_unwrap() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scene-search")
            .match_header("x-auth-token", "token")
            .with_status(200)
            .with_body(
                json!({"errorCode": null, "errorMessage": null, "data": {"recordsReturned": 2}})
                    .to_string(),
            )
            .create_async()
            .await;

        let provider = UsgsM2mProvider::new(test_config(
            format!("{}/", server.url()),
            "http://unused".to_string(),
        ))
        .unwrap();

        let data = provider
            .send_m2m_request("scene-search", json!({"datasetName": "landsat_ot_c2_l2"}))
            .await
            .unwrap();
        assert_eq!(data["recordsReturned"], 2);
    }

    #[tokio::test]
    async fn test_m2m_rate_limit_retries_once() {
        let mut server = mockito::Server::new_async().await;
        let rate_limited = server
            .mock("POST", "/download-options")
            .with_status(200)
            .with_body(
                json!({"errorCode": "RATE_LIMIT", "errorMessage": "slow down", "data": null})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/download-options")
            .with_status(200)
            .with_body(json!({"errorCode": null, "errorMessage": null, "data": []}).to_string())
            .expect(1)
            .create_async()
            .await;

        let provider = UsgsM2mProvider::new(test_config(
            format!("{}/", server.url()),
            "http://unused".to_string(),
        ))
        .unwrap();

        let data = provider
            .send_m2m_request("download-options", json!({}))
            .await
            .unwrap();
        assert!(data.as_array().unwrap().is_empty());
        rate_limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_m2m_auth_error_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scene-search")
            .with_status(200)
            .with_body(
                json!({"errorCode": "AUTH_INVALID", "errorMessage": "bad token", "data": null})
                    .to_string(),
            )
            .create_async()
            .await;

        let provider = UsgsM2mProvider::new(test_config(
            format!("{}/", server.url()),
            "http://unused".to_string(),
        ))
        .unwrap();

        let err = provider
            .send_m2m_request("scene-search", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[tokio::test]
    async fn test_download_options_dedup() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download-options")
            .with_status(200)
            .with_body(
                json!({
                    "errorCode": null,
                    "errorMessage": null,
                    "data": [
                        {"entityId": "e1", "displayId": "d1", "id": "p1", "available": true, "downloadSystem": "dds"},
                        {"entityId": "e1", "displayId": "d1", "id": "p2", "available": true, "downloadSystem": "ls_zip"},
                        {"entityId": "e2", "displayId": "d2", "id": "p3", "available": true, "downloadSystem": "folder"},
                        {"entityId": "e3", "displayId": "d3", "id": "p4", "available": false, "downloadSystem": "dds"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = UsgsM2mProvider::new(test_config(
            format!("{}/", server.url()),
            "http://unused".to_string(),
        ))
        .unwrap();

        let downloads = provider
            .download_options("landsat_ot_c2_l2", &["e1".to_string(), "e2".to_string()])
            .await
            .unwrap();

        // e1 once (dedup), e2 skipped (folder), e3 skipped (unavailable)
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].entity_id, "e1");
        assert_eq!(downloads[0].download_system, "dds");
    }

    #[tokio::test]
    async fn test_search_scenes_strips_assets_and_sr_suffix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/search")
            .with_status(200)
            .with_body(
                json!({
                    "type": "FeatureCollection",
                    "features": [{
                        "type": "Feature",
                        "id": "LC08_L2SP_187024_20200101_20200823_02_T1_SR",
                        "assets": {"thumbnail": {"href": "x"}},
                        "properties": {"datetime": "2020-01-01T09:30:00Z"}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = UsgsM2mProvider::new(test_config(
            "http://unused/".to_string(),
            server.url(),
        ))
        .unwrap();

        let window = SearchWindow::new(chrono::Utc::now(), None);
        let scenes = provider.search_scenes(&window).await.unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0]["id"], "LC08_L2SP_187024_20200101_20200823_02_T1");
        assert!(scenes[0].get("assets").is_none());
    }
}
