//! CLI command implementations
//!
//! This module contains all CLI command implementations plus the shared
//! wiring helpers that build catalog stores and providers from the loaded
//! configuration.

pub mod ingest;
pub mod init;
pub mod order;
pub mod reconcile;
pub mod status;
pub mod validate;

use crate::catalog::{CatalogClient, PostgresCatalog, StacApiClient};
use crate::config::MeridianConfig;
use crate::domain::{MeridianError, Result};
use crate::providers::{CdseProvider, CmrProvider, SceneProvider, UsgsM2mProvider};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Build the PostgreSQL catalog store from configuration
pub(crate) async fn build_catalog(config: &MeridianConfig) -> Result<Arc<PostgresCatalog>> {
    let client = Arc::new(CatalogClient::new(config.catalog.clone()).await?);
    client.test_connection().await?;
    Ok(Arc::new(PostgresCatalog::new(client)))
}

/// Build the STAC API client from configuration
pub(crate) fn build_stac_api(config: &MeridianConfig) -> Result<Arc<StacApiClient>> {
    Ok(Arc::new(StacApiClient::new(config.stac_api.clone())?))
}

/// Build a provider by its configured name
pub(crate) fn build_provider(
    config: &MeridianConfig,
    name: &str,
) -> Result<Arc<dyn SceneProvider>> {
    match name {
        "usgs" => {
            let usgs = config.providers.usgs.clone().ok_or_else(|| {
                MeridianError::Configuration(
                    "providers.usgs is not configured".to_string(),
                )
            })?;
            Ok(Arc::new(UsgsM2mProvider::new(usgs)?))
        }
        "cdse" => {
            let cdse = config.providers.cdse.clone().ok_or_else(|| {
                MeridianError::Configuration(
                    "providers.cdse is not configured".to_string(),
                )
            })?;
            Ok(Arc::new(CdseProvider::new(cdse)?))
        }
        "cmr" => {
            let cmr = config.providers.cmr.clone().ok_or_else(|| {
                MeridianError::Configuration("providers.cmr is not configured".to_string())
            })?;
            Ok(Arc::new(CmrProvider::new(cmr)?))
        }
        other => Err(MeridianError::Configuration(format!(
            "Unknown provider '{other}'. Supported providers: usgs, cdse, cmr"
        ))),
    }
}

/// Parse a CLI datetime argument (RFC 3339 or plain date)
pub(crate) fn parse_cli_datetime(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime.and_utc());
        }
    }
    Err(MeridianError::Validation(format!(
        "Invalid datetime '{raw}'. Use RFC 3339 or YYYY-MM-DD"
    )))
}
