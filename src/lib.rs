// Meridian - Satellite Scene Inventory Reconciliation Tool
// Copyright (c) 2025 Meridian Contributors
// Licensed under the MIT License

//! # Meridian - Satellite Scene Inventory Reconciliation
//!
//! Meridian harvests remote-sensing scene metadata (Landsat, Sentinel,
//! MODIS/VIIRS) from space-agency data providers, normalizes it into STAC
//! items, and reconciles it against a PostgreSQL inventory to detect new,
//! removed, and updated scenes over time.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Harvesting** scene metadata from USGS M2M/landsatlook, ESA CDSE
//!   (OData), and NASA CMR (UMM-G)
//! - **Reconciling** provider bulk-inventory snapshots against the catalog
//!   via extension-normalized set difference
//! - **Ordering** scenes in paginated batches with idempotent status
//!   transitions (`orderable → pending → ordered → succeeded → removed`)
//! - **Reporting** year-bucketed inventory statistics
//!
//! ## Architecture
//!
//! Meridian follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (reconciliation, ordering, statistics)
//! - [`providers`] - Agency API integrations (USGS, ESA CDSE, NASA CMR)
//! - [`catalog`] - PostgreSQL inventory and STAC API access
//! - [`datasets`] - Mission scene-identifier grammars
//! - [`stac`] - STAC item model and shaping
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian::catalog::{CatalogClient, PostgresCatalog, StacApiClient};
//! use meridian::config::MeridianConfig;
//! use meridian::core::reconcile::{InventorySnapshot, ReconcileCoordinator};
//! use meridian::domain::CollectionId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = MeridianConfig::from_file("meridian.toml")?;
//!
//!     // Connect the catalog and STAC APIs
//!     let client = Arc::new(CatalogClient::new(config.catalog.clone()).await?);
//!     let store = Arc::new(PostgresCatalog::new(client));
//!     let api = Arc::new(StacApiClient::new(config.stac_api.clone())?);
//!
//!     // Diff a provider snapshot against the catalog
//!     let snapshot = InventorySnapshot::from_csv_path(
//!         "inventory.csv",
//!         &config.reconcile.id_column,
//!         &config.reconcile.date_column,
//!         None,
//!     )?;
//!     let collection = CollectionId::new("sentinel-2-c1-l2a")?;
//!
//!     let coordinator = ReconcileCoordinator::new(store, api);
//!     let diff = coordinator
//!         .calculate_differences(&collection, &snapshot, None)
//!         .await?;
//!
//!     println!("New: {}, removed: {}", diff.new_scenes.len(), diff.removed.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Meridian uses the [`domain::MeridianError`] type for all errors:
//!
//! ```rust,no_run
//! use meridian::domain::MeridianError;
//!
//! fn example() -> Result<(), MeridianError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = meridian::config::load_config("meridian.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Meridian uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn, error};
//!
//! info!("Starting reconciliation");
//! warn!(collection = "sentinel-2-c1-l2a", "No scenes found");
//! error!(error = "connection refused", "Reconciliation failed");
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod datasets;
pub mod domain;
pub mod logging;
pub mod providers;
pub mod stac;
