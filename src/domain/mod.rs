//! Domain models and types for Meridian.
//!
//! This module contains the core domain models, types, and business rules.
//! All types use the newtype pattern for identifiers and an explicit error
//! hierarchy so that provider and catalog failures stay distinguishable.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SceneId`], [`CollectionId`],
//!   [`OrderId`], [`BatchId`])
//! - **Scene lifecycle types** ([`SceneRecord`], [`OrderStatus`])
//! - **Error types** ([`MeridianError`], [`ProviderError`], [`CatalogError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes to prevent mixing different ID kinds:
//!
//! ```rust
//! use meridian::domain::{SceneId, OrderId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scene_id = SceneId::new("LC08_L2SP_187024_20200101_20200823_02_T1")?;
//! let order_id = OrderId::new("order-2024-07")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: SceneId = order_id;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod scene;

// Re-export commonly used types for convenience
pub use errors::{CatalogError, MeridianError, ProviderError};
pub use ids::{BatchId, CollectionId, OrderId, SceneId};
pub use result::Result;
pub use scene::{OrderStatus, SceneRecord};
