//! NASA CMR provider (UMM-G granule search)
//!
//! Searches `search/granules.umm_json` per configured product and maps
//! UMM-G granules to STAC items. Pagination follows the `CMR-Search-After`
//! response header until a page comes back smaller than the page size.

use crate::config::schema::CmrConfig;
use crate::datasets::modis;
use crate::domain::ids::CollectionId;
use crate::domain::scene::OrderStatus;
use crate::domain::{MeridianError, ProviderError, Result};
use crate::providers::provider::{SceneProvider, SearchWindow};
use crate::stac::{calculate_bbox, polygon_from_points, StacAsset, StacItem};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::time::Duration;

/// NASA CMR provider client
pub struct CmrProvider {
    http: reqwest::Client,
    config: CmrConfig,
}

impl CmrProvider {
    /// Create a new CMR provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: CmrConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| MeridianError::Connection(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Search granules of one product over a window
    ///
    /// `product` is `"<short_name>.<version>"`. MODIS snow products strip
    /// the zeros from their version tag, matching how the archive numbers
    /// them.
    pub async fn search_product(
        &self,
        product: &str,
        window: &SearchWindow,
    ) -> Result<Vec<Value>> {
        let (short_name, version) = product.split_once('.').ok_or_else(|| {
            ProviderError::SearchFailed(format!("Product must be <short_name>.<version>: {product}"))
        })?;

        let version = if product.contains("MOD10") || product.contains("MYD10") {
            version.replace('0', "")
        } else {
            version.to_string()
        };

        let url = format!(
            "{}/granules.umm_json",
            self.config.api_url.trim_end_matches('/')
        );

        let mut granules = Vec::new();
        let mut search_after: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[
                    ("short_name", short_name),
                    ("version", version.as_str()),
                    ("page_size", &self.config.page_size.to_string()),
                ])
                .query(&window_params(window));

            if let Some(cursor) = &search_after {
                request = request.header("CMR-Search-After", cursor);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ProviderError::ConnectionFailed(format!("GET {url} failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::SearchFailed(format!("{status}: {message}")).into());
            }

            search_after = response
                .headers()
                .get("CMR-Search-After")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            let body: Value = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Invalid UMM-JSON response: {e}"))
            })?;

            let page = body["items"].as_array().cloned().unwrap_or_default();
            let page_len = page.len();
            granules.extend(page);

            if page_len < self.config.page_size || search_after.is_none() {
                break;
            }
        }

        tracing::info!(
            product = product,
            granules = granules.len(),
            "Granules found"
        );

        Ok(granules)
    }
}

fn window_params(window: &SearchWindow) -> Vec<(String, String)> {
    let date_from = window.date_from.to_rfc3339_opts(SecondsFormat::Secs, true);
    match window.date_to {
        Some(date_to) => vec![(
            "production_date[]".to_string(),
            format!(
                "{date_from},{}",
                date_to.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        )],
        None => vec![("updated_since".to_string(), date_from)],
    }
}

/// Granule identifier, resolving staged (`SC*`) ids to the producer id
fn granule_id(scene: &Value) -> Result<String> {
    let native_id = scene["meta"]["native-id"]
        .as_str()
        .ok_or_else(|| ProviderError::InvalidScene("Granule has no native-id".to_string()))?;

    if !native_id.starts_with("SC") {
        return Ok(native_id.to_string());
    }

    let identifiers = scene["umm"]["DataGranule"]["Identifiers"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    for identifier in identifiers {
        if identifier["IdentifierType"] == "ProducerGranuleId" {
            if let Some(id) = identifier["Identifier"].as_str() {
                let (stem, _ext) = crate::core::reconcile::snapshot::split_extension(id);
                return Ok(stem.to_string());
            }
        }
    }

    Err(ProviderError::InvalidScene("Could not find identifier".to_string()).into())
}

fn parse_umm_datetime(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::InvalidScene(format!("Invalid datetime '{raw}': {e}")).into())
}

#[async_trait]
impl SceneProvider for CmrProvider {
    fn name(&self) -> &'static str {
        "cmr"
    }

    async fn search_scenes(&self, window: &SearchWindow) -> Result<Vec<Value>> {
        let mut scenes = Vec::new();
        for product in &self.config.products {
            let granules = self.search_product(product, window).await?;
            scenes.extend(granules);
        }
        Ok(scenes)
    }

    fn to_item(&self, scene: &Value, collection: Option<&CollectionId>) -> Result<StacItem> {
        let item_id = granule_id(scene)?;
        let item_parts: Vec<&str> = item_id.split('.').collect();
        let unique_id = modis::unique_id(&item_id)?;

        let umm = &scene["umm"];
        let range = &umm["TemporalExtent"]["RangeDateTime"];
        let begin = parse_umm_datetime(range["BeginningDateTime"].as_str().ok_or_else(|| {
            ProviderError::InvalidScene(format!("Granule {item_id} has no beginning datetime"))
        })?)?;
        let end = parse_umm_datetime(range["EndingDateTime"].as_str().ok_or_else(|| {
            ProviderError::InvalidScene(format!("Granule {item_id} has no ending datetime"))
        })?)?;

        let mut item = StacItem::new(&item_id);
        item.set_datetime_range(begin, end);

        let points: Vec<(f64, f64)> = umm["SpatialExtent"]["HorizontalSpatialDomain"]["Geometry"]
            ["GPolygons"][0]["Boundary"]["Points"]
            .as_array()
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| Some((p["Longitude"].as_f64()?, p["Latitude"].as_f64()?)))
                    .collect()
            })
            .unwrap_or_default();
        if !points.is_empty() {
            let geometry = polygon_from_points(&points)?;
            item.bbox = Some(calculate_bbox(&geometry)?);
            item.geometry = Some(geometry);
        }

        item.set_property("modis:scene_id", item_id.clone());
        item.set_property("deprecated", false);
        item.stamp_order(OrderStatus::Orderable, None, None);
        if let Some(version) = item_parts.last() {
            item.set_property("version", *version);
        }

        let meta = &scene["meta"];
        if let Some(revision_date) = meta["revision-date"].as_str() {
            item.set_property(
                "modis:revision-date",
                parse_umm_datetime(revision_date)?
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            );
        }
        if !meta["revision-id"].is_null() {
            item.set_property("modis:revision-id", meta["revision-id"].clone());
        }
        item.set_property("modis:provider-id", meta["provider-id"].clone());
        item.set_property("modis:concept-id", meta["concept-id"].clone());

        if let Some(attributes) = umm["AdditionalAttributes"].as_array() {
            for attribute in attributes {
                let value = attribute["Values"][0].clone();
                match attribute["Name"].as_str() {
                    Some("VERTICALTILENUMBER") => {
                        if let Some(tile) = value.as_str().and_then(|v| v.parse::<i64>().ok()) {
                            item.set_property("modis:vertical-tile", tile);
                        }
                    }
                    Some("HORIZONTALTILENUMBER") => {
                        if let Some(tile) = value.as_str().and_then(|v| v.parse::<i64>().ok()) {
                            item.set_property("modis:horizontal-tile", tile);
                        }
                    }
                    Some("PROCESSVERSION") => {
                        item.set_property("modis:processor-version", value);
                    }
                    _ => {}
                }
            }
        }

        let archive_info = &umm["DataGranule"]["ArchiveAndDistributionInformation"][0];
        item.set_property("file:size", archive_info["Size"].clone());
        item.set_property("file:unit", archive_info["SizeUnit"].clone());

        let folder = modis::scene_id_folder(&item_id, None)?;
        item.set_property("meridian:item_id", unique_id);
        item.set_property("meridian:folder", format!("{folder}/{item_id}.hdf"));

        let collection_id = match collection {
            Some(collection) => collection.as_str().to_string(),
            None => modis::collection_name(&item_id)?,
        };
        item.set_property("meridian:collection_id", collection_id.clone());
        item.collection = Some(modis::inventory_collection(&item_id)?);

        let mut provider_dates = serde_json::Map::new();
        if let Some(dates) = umm["ProviderDates"].as_array() {
            for date in dates {
                if let (Some(date_type), Some(raw)) =
                    (date["Type"].as_str(), date["Date"].as_str())
                {
                    provider_dates.insert(
                        date_type.to_string(),
                        Value::String(
                            parse_umm_datetime(raw)?
                                .to_rfc3339_opts(SecondsFormat::Micros, true),
                        ),
                    );
                }
            }
        }
        item.set_property("modis:dates", Value::Object(provider_dates));

        if let Some(urls) = umm["RelatedUrls"].as_array() {
            for url in urls {
                let href = url["URL"].as_str().unwrap_or_default();
                if url["Type"] == "GET DATA" {
                    item.assets
                        .insert("hdf".to_string(), StacAsset::new(href));
                } else if href.contains(".xml") && href.contains("https://") {
                    item.assets
                        .insert("xml".to_string(), StacAsset::new(href));
                }
            }
        }

        let url_hdf = item.assets.get("hdf").map(|a| a.href.clone());
        let url_xml = item.assets.get("xml").map(|a| a.href.clone());
        item.set_property(
            "meridian:order",
            json!({
                "scene_id": item_id,
                "inventory": item.collection,
                "collection": collection_id,
                "download_folder": folder,
                "url_hdf": url_hdf,
                "url_xml": url_xml,
            }),
        );

        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_config(api_url: String) -> CmrConfig {
        CmrConfig {
            api_url,
            products: vec!["MOD09GA.061".to_string()],
            page_size: 2,
            timeout_seconds: 5,
        }
    }

    fn umm_granule() -> Value {
        json!({
            "meta": {
                "native-id": "MOD09GA.A2023255.h08v08.061.2023257025446",
                "provider-id": "LPCLOUD",
                "concept-id": "G1234-LPCLOUD",
                "revision-id": 2,
                "revision-date": "2023-09-14T02:54:46Z"
            },
            "umm": {
                "TemporalExtent": {
                    "RangeDateTime": {
                        "BeginningDateTime": "2023-09-12T00:00:00Z",
                        "EndingDateTime": "2023-09-13T00:00:00Z"
                    }
                },
                "SpatialExtent": {
                    "HorizontalSpatialDomain": {
                        "Geometry": {
                            "GPolygons": [{
                                "Boundary": {
                                    "Points": [
                                        {"Longitude": -80.0, "Latitude": 10.0},
                                        {"Longitude": -70.0, "Latitude": 10.0},
                                        {"Longitude": -70.0, "Latitude": 20.0},
                                        {"Longitude": -80.0, "Latitude": 20.0}
                                    ]
                                }
                            }]
                        }
                    }
                },
                "AdditionalAttributes": [
                    {"Name": "VERTICALTILENUMBER", "Values": ["8"]},
                    {"Name": "HORIZONTALTILENUMBER", "Values": ["8"]},
                    {"Name": "PROCESSVERSION", "Values": ["6.1.0"]}
                ],
                "DataGranule": {
                    "ArchiveAndDistributionInformation": [
                        {"Size": 123.4, "SizeUnit": "MB"}
                    ],
                    "Identifiers": []
                },
                "ProviderDates": [
                    {"Type": "Insert", "Date": "2023-09-14T00:00:00Z"},
                    {"Type": "Update", "Date": "2023-09-15T00:00:00Z"}
                ],
                "RelatedUrls": [
                    {"Type": "GET DATA", "URL": "https://data.example/MOD09GA.hdf"},
                    {"Type": "EXTENDED METADATA", "URL": "https://data.example/MOD09GA.hdf.xml"}
                ]
            }
        })
    }

    #[test]
    fn test_to_item_mapping() {
        let provider = CmrProvider::new(test_config("http://x".to_string())).unwrap();
        let item = provider.to_item(&umm_granule(), None).unwrap();

        assert_eq!(item.id, "MOD09GA.A2023255.h08v08.061.2023257025446");
        assert_eq!(item.collection.as_deref(), Some("modis-mod09ga-061"));
        assert_eq!(
            item.property_str("meridian:collection_id"),
            Some("modis-09ga-061")
        );
        assert_eq!(item.properties["modis:vertical-tile"], 8);
        assert_eq!(item.property_str("version"), Some("2023257025446"));
        assert_eq!(item.properties["file:size"], 123.4);
        assert_eq!(item.bbox, Some([-80.0, 10.0, -70.0, 20.0]));
        assert_eq!(item.assets["hdf"].href, "https://data.example/MOD09GA.hdf");
        assert_eq!(
            item.assets["xml"].href,
            "https://data.example/MOD09GA.hdf.xml"
        );
        assert!(item.properties["modis:dates"]["Insert"]
            .as_str()
            .unwrap()
            .starts_with("2023-09-14"));
        assert_eq!(
            item.properties["meridian:order"]["url_hdf"],
            "https://data.example/MOD09GA.hdf"
        );
        // Range datetimes carry a null instant
        assert!(item.properties["datetime"].is_null());
    }

    #[test]
    fn test_granule_id_resolves_staged_ids() {
        let scene = json!({
            "meta": {"native-id": "SC:MOD09GA.061:2400000000"},
            "umm": {
                "DataGranule": {
                    "Identifiers": [
                        {"IdentifierType": "ProducerGranuleId",
                         "Identifier": "MOD09GA.A2023255.h08v08.061.2023257025446.hdf"}
                    ]
                }
            }
        });
        assert_eq!(
            granule_id(&scene).unwrap(),
            "MOD09GA.A2023255.h08v08.061.2023257025446"
        );
    }

    #[test]
    fn test_granule_id_missing_identifier_fails() {
        let scene = json!({
            "meta": {"native-id": "SC:MOD09GA.061:2400000000"},
            "umm": {"DataGranule": {"Identifiers": []}}
        });
        assert!(granule_id(&scene).is_err());
    }

    #[tokio::test]
    async fn test_search_product_paginates_with_search_after() {
        let mut server = mockito::Server::new_async().await;
        let page = json!({
            "items": [umm_granule(), umm_granule()]
        });
        let last_page = json!({
            "items": [umm_granule()]
        });

        server
            .mock("GET", "/granules.umm_json")
            .match_query(mockito::Matcher::UrlEncoded(
                "short_name".to_string(),
                "MOD09GA".to_string(),
            ))
            .with_status(200)
            .with_header("CMR-Search-After", "cursor-1")
            .with_body(page.to_string())
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/granules.umm_json")
            .match_header("CMR-Search-After", "cursor-1")
            .with_status(200)
            .with_body(last_page.to_string())
            .expect(1)
            .create_async()
            .await;

        let provider = CmrProvider::new(test_config(server.url())).unwrap();
        let window = SearchWindow::new(
            Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap(),
            None,
        );

        let granules = provider.search_product("MOD09GA.061", &window).await.unwrap();
        assert_eq!(granules.len(), 3);
    }

    #[test]
    fn test_window_params() {
        let from = Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap();
        let params = window_params(&SearchWindow::new(from, None));
        assert_eq!(params[0].0, "updated_since");

        let to = Utc.with_ymd_and_hms(2023, 9, 2, 0, 0, 0).unwrap();
        let params = window_params(&SearchWindow::new(from, Some(to)));
        assert_eq!(params[0].0, "production_date[]");
        assert!(params[0].1.contains(','));
    }
}
