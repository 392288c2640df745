//! Domain error types
//!
//! This module defines the error hierarchy for Meridian.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Meridian error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum MeridianError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider-related errors (USGS M2M, ESA CDSE, NASA CMR)
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Inventory catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Snapshot file errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Reconciliation process errors
    #[error("Reconcile error: {0}")]
    Reconcile(String),

    /// Scene identifier parsing errors
    #[error("Scene ID error: {0}")]
    SceneId(String),

    /// STAC item shaping errors
    #[error("STAC error: {0}")]
    Stac(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Provider-specific errors
///
/// Errors that occur when interacting with agency data-provider APIs.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to connect to the provider endpoint
    #[error("Failed to connect to provider: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid response from the provider
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// Provider API reported an error code
    #[error("Provider API error ({code}): {message}")]
    ApiError { code: String, message: String },

    /// Rate limit exceeded after retry
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Search/query failed
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Scene document missing an expected field
    #[error("Invalid scene document: {0}")]
    InvalidScene(String),
}

/// Catalog-specific errors
///
/// Errors that occur when interacting with the PostgreSQL inventory
/// or the STAC HTTP APIs in front of it.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to connect to the inventory database
    #[error("Failed to connect to catalog: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Statement execution failed
    #[error("Statement execution failed: {0}")]
    ExecutionFailed(String),

    /// An update that must match exactly one row affected none
    ///
    /// Only single-row status transitions treat this as fatal; the
    /// paginated batch loop treats zero affected rows as termination.
    #[error("0 affected rows for {0}")]
    NoRowsAffected(String),

    /// Failed to insert an item
    #[error("Failed to insert item: {0}")]
    InsertFailed(String),

    /// Item not found in the inventory
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// STAC API request failed
    #[error("STAC API error: {status} - {message}")]
    StacApi { status: u16, message: String },

    /// Failed to deserialize a row or response
    #[error("Failed to deserialize: {0}")]
    DeserializationFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for MeridianError {
    fn from(err: std::io::Error) -> Self {
        MeridianError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MeridianError {
    fn from(err: serde_json::Error) -> Self {
        MeridianError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MeridianError {
    fn from(err: toml::de::Error) -> Self {
        MeridianError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from csv errors (snapshot files)
impl From<csv::Error> for MeridianError {
    fn from(err: csv::Error) -> Self {
        MeridianError::Snapshot(err.to_string())
    }
}
