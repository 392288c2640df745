//! Catalog abstraction traits
//!
//! This module defines the traits that catalog backends must implement:
//! [`InventoryStore`] for scene/item storage and statistics, and
//! [`OrderStore`] for the order state-transition protocol. The order
//! coordinator is generic over these traits so the pagination logic can be
//! tested against in-memory mocks.

use crate::domain::ids::{BatchId, CollectionId, OrderId, SceneId};
use crate::domain::scene::OrderStatus;
use crate::domain::Result;
use crate::stac::StacItem;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::str::FromStr;

/// Result of a bulk insert operation
#[derive(Debug, Clone, Default)]
pub struct BulkInsertResult {
    /// Number of items successfully inserted
    pub success_count: usize,

    /// Number of items that failed to insert
    pub failure_count: usize,

    /// Details of failed items
    pub failures: Vec<BulkInsertFailure>,
}

/// Details of a failed bulk insert item
#[derive(Debug, Clone)]
pub struct BulkInsertFailure {
    /// Item ID that failed
    pub item_id: String,

    /// Error message
    pub error: String,
}

/// How conflicting item ids are handled during bulk insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Skip items that already exist (`ON CONFLICT DO NOTHING`)
    InsertIgnore,
    /// Replace datetime and content of existing items
    Upsert,
}

impl InsertMode {
    /// Lowercase wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertMode::InsertIgnore => "insert-ignore",
            InsertMode::Upsert => "upsert",
        }
    }
}

impl FromStr for InsertMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "insert-ignore" | "insert_ignore" => Ok(InsertMode::InsertIgnore),
            "upsert" => Ok(InsertMode::Upsert),
            other => Err(format!("Unknown insert mode: {other}")),
        }
    }
}

/// One row of the per-year status aggregation
#[derive(Debug, Clone)]
pub struct YearStatusCount {
    /// Bucket year
    pub year: i32,
    /// `order:status` property value (absent on unmanaged items)
    pub status: Option<String>,
    /// `deprecated` property value as stored (`"true"`/`"false"`)
    pub deprecated: Option<String>,
    /// Item count in this bucket
    pub count: u64,
}

/// One row of the per-year item count aggregation
#[derive(Debug, Clone)]
pub struct YearCount {
    /// Bucket year
    pub year: i32,
    /// Item count
    pub count: u64,
}

/// Inventory storage operations
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Identifiers of all scenes in a collection whose status is not
    /// `removed`, optionally bounded by an exclusive upper datetime
    async fn active_scene_ids(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<SceneId>>;

    /// Bulk-insert STAC items
    ///
    /// Failures are collected per item; the call only errors on a failure of
    /// the connection itself.
    async fn insert_items(
        &self,
        items: &[StacItem],
        mode: InsertMode,
        dry_run: bool,
    ) -> Result<BulkInsertResult>;

    /// Set the `order:status` property of a single scene
    ///
    /// Returns the number of affected rows; callers decide whether zero is
    /// fatal.
    async fn update_scene_status(
        &self,
        scene_id: &SceneId,
        collection: &CollectionId,
        status: OrderStatus,
    ) -> Result<u64>;

    /// Per-year counts grouped by status and deprecation flag
    async fn status_counts_by_year(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<YearStatusCount>>;

    /// Per-year item counts (no status grouping)
    async fn item_counts_by_year(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<YearCount>>;
}

/// Order selection predicate
///
/// The `where_sql` fragment is caller-supplied SQL evaluated against the
/// `items` table (matching the operator-driven usage of the ordering CLI);
/// the optional collection list is appended as an `AND collection IN (...)`
/// clause with quote escaping.
#[derive(Debug, Clone)]
pub struct OrderPredicate {
    /// SQL fragment selecting item rows
    pub where_sql: String,

    /// Collections to restrict the selection to (empty = no restriction)
    pub collections: Vec<CollectionId>,
}

impl OrderPredicate {
    /// Create a predicate without a collection restriction
    pub fn new(where_sql: impl Into<String>) -> Self {
        Self {
            where_sql: where_sql.into(),
            collections: Vec::new(),
        }
    }

    /// Restrict the predicate to a set of collections
    pub fn with_collections(mut self, collections: Vec<CollectionId>) -> Self {
        self.collections = collections;
        self
    }

    /// Render the full WHERE fragment
    pub fn to_sql(&self) -> String {
        if self.collections.is_empty() {
            return self.where_sql.clone();
        }
        format!(
            "{} AND collection IN ({})",
            self.where_sql,
            quoted_list(&self.collections)
        )
    }
}

/// Render a quoted, comma-separated SQL string list
pub(crate) fn quoted_list(collections: &[CollectionId]) -> String {
    collections
        .iter()
        .map(|c| format!("'{}'", c.as_str().replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The JSONB merge-patch applied to ordered items
///
/// Sets `order:status`, `order:id`, `order:date`, and `order:batch_id` when
/// batching.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    /// Status to transition matched items to
    pub status: OrderStatus,
    /// Order this update belongs to
    pub order_id: OrderId,
    /// Timestamp written as `order:date`
    pub date: DateTime<Utc>,
    /// Batch identifier (paginated updates only)
    pub batch_id: Option<BatchId>,
}

impl OrderUpdate {
    /// Create an update for an order
    pub fn new(status: OrderStatus, order_id: OrderId, date: DateTime<Utc>) -> Self {
        Self {
            status,
            order_id,
            date,
            batch_id: None,
        }
    }

    /// Attach a batch identifier
    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Render the merge-patch JSON object
    pub fn to_patch(&self) -> Value {
        let mut patch = json!({
            "order:status": self.status.as_str(),
            "order:id": self.order_id.as_str(),
            "order:date": self.date.to_rfc3339_opts(SecondsFormat::Micros, true),
        });
        if let Some(batch_id) = &self.batch_id {
            patch["order:batch_id"] = Value::String(batch_id.as_str().to_string());
        }
        patch
    }
}

/// Order state-transition operations
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Apply an order merge-patch to items matching a predicate
    ///
    /// With a `limit`, only up to that many matching rows are patched (one
    /// pagination page). Returns the number of affected rows.
    async fn apply_order_update(
        &self,
        update: &OrderUpdate,
        predicate: &OrderPredicate,
        limit: Option<usize>,
    ) -> Result<u64>;

    /// Order payloads (`meridian:order` property) of all items of an order
    async fn order_payloads(
        &self,
        order_id: &OrderId,
        collections: &[CollectionId],
    ) -> Result<Vec<Value>>;

    /// Order payload of a single scene, if any
    async fn order_payload_for_scene(&self, scene_id: &SceneId) -> Result<Option<Value>>;

    /// Fetch all items of a batch and transition them to `pending`
    async fn take_batch(
        &self,
        batch_id: &BatchId,
        collections: &[CollectionId],
    ) -> Result<Vec<StacItem>>;

    /// Set the status of all items whose `order:id` or `order:batch_id`
    /// property equals a value
    async fn update_status_by_property(
        &self,
        property: &str,
        value: &str,
        collections: &[CollectionId],
        status: OrderStatus,
    ) -> Result<u64>;
}
