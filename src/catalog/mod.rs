//! Inventory catalog access
//!
//! The catalog is a PostgreSQL database with a pgSTAC-style `items` table
//! plus the STAC HTTP APIs in front of it. Storage operations live behind
//! the [`InventoryStore`] and [`OrderStore`] traits so the coordinators can
//! be tested against in-memory mocks.

pub mod api;
pub mod client;
pub mod postgres;
pub mod traits;

pub use api::StacApiClient;
pub use client::CatalogClient;
pub use postgres::{PostgresCatalog, ORDER_PAYLOAD_PROPERTY};
pub use traits::{
    BulkInsertFailure, BulkInsertResult, InsertMode, InventoryStore, OrderPredicate, OrderStore,
    OrderUpdate, YearCount, YearStatusCount,
};
