//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for scene, collection, order, and
//! batch identifiers. Each type ensures type safety and basic format
//! validation so that identifiers can't be mixed up at API boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scene identifier newtype wrapper
///
/// Represents a provider-specific scene identifier, e.g.
/// `LC08_L2SP_187024_20200101_20200823_02_T1` (Landsat) or
/// `S2A_MSIL2A_20240101T101021_N0510_R022_T32TQM_20240101T120000` (Sentinel).
///
/// # Examples
///
/// ```
/// use meridian::domain::ids::SceneId;
/// use std::str::FromStr;
///
/// let id = SceneId::from_str("LC08_L2SP_187024_20200101_20200823_02_T1").unwrap();
/// assert_eq!(id.as_str(), "LC08_L2SP_187024_20200101_20200823_02_T1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(String);

impl SceneId {
    /// Creates a new SceneId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Scene ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the scene ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SceneId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SceneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Collection identifier newtype wrapper
///
/// A collection tag such as `sentinel-2-c1-l2a` or `landsat-ot-c2-l2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a new CollectionId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Collection ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the collection ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order identifier newtype wrapper
///
/// Identifies one ordering run. Batch identifiers are derived from the order
/// identifier plus a 1-based page number.
///
/// # Examples
///
/// ```
/// use meridian::domain::ids::OrderId;
///
/// let order = OrderId::new("order-2024-07").unwrap();
/// let batch = order.batch(3);
/// assert_eq!(batch.as_str(), "order-2024-07_3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new OrderId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Order ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Generates a fresh random order identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the order ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the batch identifier for a 1-based page number
    pub fn batch(&self, page: usize) -> BatchId {
        BatchId(format!("{}_{}", self.0, page))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Batch identifier newtype wrapper
///
/// A page-sized group of scenes sharing one order. Format: `{order}_{page}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(String);

impl BatchId {
    /// Creates a new BatchId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Batch ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the batch ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BatchId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
