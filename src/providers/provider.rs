//! Scene provider trait
//!
//! Abstracts the agency-specific search APIs behind a common interface so
//! ingestion can iterate providers uniformly. Each provider returns raw
//! scene documents from `search_scenes` and maps one document to a STAC
//! item in `to_item`; the provided `harvest` combines both with per-scene
//! error handling.

use crate::domain::ids::CollectionId;
use crate::domain::Result;
use crate::stac::StacItem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Publication-date window for an ingestion search
#[derive(Debug, Clone)]
pub struct SearchWindow {
    /// Inclusive lower bound
    pub date_from: DateTime<Utc>,

    /// Exclusive upper bound; open-ended searches ask the provider for
    /// everything updated since `date_from`
    pub date_to: Option<DateTime<Utc>>,
}

impl SearchWindow {
    /// Create a bounded window
    pub fn new(date_from: DateTime<Utc>, date_to: Option<DateTime<Utc>>) -> Self {
        Self { date_from, date_to }
    }
}

/// Trait for agency data-provider implementations
///
/// # Example
///
/// ```no_run
/// use meridian::providers::{SceneProvider, SearchWindow};
/// use chrono::Utc;
///
/// # async fn example(provider: &dyn SceneProvider) -> meridian::domain::Result<()> {
/// let window = SearchWindow::new(Utc::now() - chrono::Duration::days(1), Some(Utc::now()));
/// let items = provider.harvest(&window, None).await?;
/// println!("Harvested {} items", items.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SceneProvider: Send + Sync {
    /// Short provider name used in logs and configuration
    fn name(&self) -> &'static str;

    /// Search the provider for scenes in a publication window
    ///
    /// Returns raw scene documents in the provider's own shape.
    async fn search_scenes(&self, window: &SearchWindow) -> Result<Vec<Value>>;

    /// Map one raw scene document to a STAC item
    ///
    /// The optional collection overrides the collection derived from the
    /// scene identifier.
    fn to_item(&self, scene: &Value, collection: Option<&CollectionId>) -> Result<StacItem>;

    /// Search and map, skipping scenes that fail to map
    ///
    /// Mapping errors are logged per scene; a failed scene never aborts the
    /// harvest.
    async fn harvest(
        &self,
        window: &SearchWindow,
        collection: Option<&CollectionId>,
    ) -> Result<Vec<StacItem>> {
        let scenes = self.search_scenes(window).await?;
        tracing::info!(
            provider = self.name(),
            scenes = scenes.len(),
            "Mapping harvested scenes"
        );

        let mut items = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            match self.to_item(scene, collection) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::error!(
                        provider = self.name(),
                        error = %e,
                        "Error while creating metadata for scene"
                    );
                }
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FlakyProvider;

    #[async_trait]
    impl SceneProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn search_scenes(&self, _window: &SearchWindow) -> Result<Vec<Value>> {
            Ok(vec![json!({"id": "good"}), json!({"id": "bad"})])
        }

        fn to_item(&self, scene: &Value, _collection: Option<&CollectionId>) -> Result<StacItem> {
            let id = scene["id"].as_str().unwrap_or_default();
            if id == "bad" {
                return Err(crate::domain::MeridianError::Stac("broken scene".to_string()));
            }
            Ok(StacItem::new(id))
        }
    }

    #[tokio::test]
    async fn test_harvest_skips_failed_scenes() {
        let provider = FlakyProvider;
        let window = SearchWindow::new(Utc::now(), None);
        let items = provider.harvest(&window, None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "good");
    }
}
