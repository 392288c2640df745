//! STAC HTTP API client
//!
//! The removal flow talks to two STAC APIs: the inventory API (full history,
//! items are fetched and patched back) and the public API (the outward-facing
//! catalog, where delivered items are deleted once a scene vanishes
//! upstream).

use crate::config::schema::StacApiConfig;
use crate::domain::ids::{CollectionId, SceneId};
use crate::domain::{CatalogError, MeridianError, Result};
use crate::stac::StacItem;
use secrecy::ExposeSecret;
use std::time::Duration;

/// Client for the inventory and public STAC APIs
pub struct StacApiClient {
    http: reqwest::Client,
    config: StacApiConfig,
}

impl StacApiClient {
    /// Create a new STAC API client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: StacApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                MeridianError::Connection(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, config })
    }

    /// Fetch an item from the inventory API
    ///
    /// Returns `None` when the item does not exist (HTTP 404).
    pub async fn get_inventory_item(
        &self,
        collection: &CollectionId,
        scene_id: &SceneId,
    ) -> Result<Option<StacItem>> {
        let url = item_url(&self.config.inventory_url, collection, scene_id.as_str());

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MeridianError::Connection(format!("GET {url} failed: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let value = response.json().await.map_err(|e| {
                    CatalogError::DeserializationFailed(format!("Invalid item JSON: {e}"))
                })?;
                Ok(Some(StacItem::from_value(value)?))
            }
            404 => Ok(None),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(CatalogError::StacApi { status, message }.into())
            }
        }
    }

    /// Replace an item on the inventory API
    pub async fn put_inventory_item(&self, item: &StacItem) -> Result<()> {
        let collection = item.collection.as_deref().ok_or_else(|| {
            MeridianError::Stac(format!("Item {} has no collection", item.id))
        })?;
        let url = format!(
            "{}/collections/{}/items/{}",
            self.config.inventory_url.trim_end_matches('/'),
            collection,
            item.id
        );

        let response = self
            .http
            .put(&url)
            .json(&item.to_value()?)
            .send()
            .await
            .map_err(|e| MeridianError::Connection(format!("PUT {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(item_id = %item.id, status = status.as_u16(), "Inventory item updated");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(CatalogError::StacApi {
                status: status.as_u16(),
                message,
            }
            .into())
        }
    }

    /// Delete an item from the public API
    ///
    /// Uses basic auth with the configured credentials.
    pub async fn delete_public_item(
        &self,
        collection: &CollectionId,
        scene_id: &SceneId,
    ) -> Result<()> {
        let url = item_url(&self.config.public_url, collection, scene_id.as_str());

        let mut request = self.http.delete(&url);
        if let Some(username) = &self.config.username {
            let password = self
                .config
                .password
                .as_ref()
                .map(|secret| secret.expose_secret().to_string());
            request = request.basic_auth(username, password);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MeridianError::Connection(format!("DELETE {url} failed: {e}")))?;

        let status = response.status();
        tracing::info!(
            scene_id = %scene_id,
            status = status.as_u16(),
            "Delete from public STAC API"
        );

        if status.is_success() || status.as_u16() == 404 {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(CatalogError::StacApi {
                status: status.as_u16(),
                message,
            }
            .into())
        }
    }
}

fn item_url(base: &str, collection: &CollectionId, scene_id: &str) -> String {
    format!(
        "{}/collections/{}/items/{}",
        base.trim_end_matches('/'),
        collection.as_str(),
        scene_id
    )
}
