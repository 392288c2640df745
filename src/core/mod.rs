//! Core business logic for Meridian.
//!
//! This module contains the reconciliation, ordering, and statistics logic.
//!
//! # Modules
//!
//! - [`reconcile`] - Snapshot loading, snapshot/catalog diffing, import and
//!   removal coordination
//! - [`order`] - Order state transitions and paginated batch creation
//! - [`stats`] - Year-bucketed inventory statistics
//!
//! # Reconciliation Workflow
//!
//! The typical reconciliation workflow:
//!
//! 1. **Load Snapshot**: Read the provider's bulk inventory file
//! 2. **Load Catalog**: Query active scene ids from the inventory database
//! 3. **Diff**: Set-difference over extension-normalized identifiers
//! 4. **Import**: Map new rows to STAC items and insert them
//! 5. **Remove**: Mark vanished scenes removed through the STAC APIs
//! 6. **Report**: Generate a reconciliation summary
//!
//! # Example
//!
//! ```rust,no_run
//! use meridian::catalog::{CatalogClient, PostgresCatalog, StacApiClient};
//! use meridian::core::reconcile::{InventorySnapshot, ReconcileCoordinator};
//! use meridian::domain::CollectionId;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example(config: meridian::config::MeridianConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(CatalogClient::new(config.catalog.clone()).await?);
//! let store = Arc::new(PostgresCatalog::new(client));
//! let api = Arc::new(StacApiClient::new(config.stac_api.clone())?);
//!
//! let coordinator = ReconcileCoordinator::new(store, api);
//! let snapshot = InventorySnapshot::from_csv_path("inventory.csv", "Name", "ContentDate:Start", None)?;
//! let collection = CollectionId::new("sentinel-2-c1-l2a")?;
//!
//! let diff = coordinator.calculate_differences(&collection, &snapshot, None).await?;
//! println!("New: {}, removed: {}", diff.new_scenes.len(), diff.removed.len());
//! # Ok(())
//! # }
//! ```

pub mod order;
pub mod reconcile;
pub mod stats;
