//! PostgreSQL implementations of the catalog traits
//!
//! Implements [`InventoryStore`] and [`OrderStore`] on top of the pooled
//! [`CatalogClient`]. Items live in a pgSTAC-style `items` table whose
//! `content` column holds the full STAC item as JSONB; order state is
//! carried inside `content->'properties'` and updated via JSONB merge
//! patches.

use crate::catalog::client::CatalogClient;
use crate::catalog::traits::{
    quoted_list, BulkInsertFailure, BulkInsertResult, InsertMode, InventoryStore, OrderPredicate,
    OrderStore, OrderUpdate, YearCount, YearStatusCount,
};
use crate::domain::ids::{BatchId, CollectionId, OrderId, SceneId};
use crate::domain::scene::OrderStatus;
use crate::domain::{CatalogError, Result};
use crate::stac::StacItem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// The item property carrying the downstream order payload
pub const ORDER_PAYLOAD_PROPERTY: &str = "meridian:order";

/// Properties accepted by [`OrderStore::update_status_by_property`]
const STATUS_UPDATE_PROPERTIES: &[&str] = &["order:id", "order:batch_id"];

/// PostgreSQL-backed catalog store
pub struct PostgresCatalog {
    client: Arc<CatalogClient>,
}

impl PostgresCatalog {
    /// Create a new store on top of a catalog client
    pub fn new(client: Arc<CatalogClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<CatalogClient> {
        &self.client
    }

    fn item_row(item: &StacItem) -> std::result::Result<ItemRow, String> {
        let collection = item
            .collection
            .clone()
            .ok_or_else(|| "Item has no collection".to_string())?;
        let datetime = item_datetime(item)?;
        let content = serde_json::to_value(item).map_err(|e| e.to_string())?;
        Ok(ItemRow {
            id: item.id.clone(),
            collection,
            datetime,
            content,
        })
    }
}

struct ItemRow {
    id: String,
    collection: String,
    datetime: DateTime<Utc>,
    content: Value,
}

/// Acquisition datetime of an item, falling back to `start_datetime`
fn item_datetime(item: &StacItem) -> std::result::Result<DateTime<Utc>, String> {
    let raw = item
        .property_str("datetime")
        .or_else(|| item.property_str("start_datetime"))
        .ok_or_else(|| format!("Item {} has no datetime", item.id))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Item {} has invalid datetime '{raw}': {e}", item.id))
}

#[async_trait]
impl InventoryStore for PostgresCatalog {
    async fn active_scene_ids(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<SceneId>> {
        let rows = if let Some(bound) = max_datetime {
            let query = "SELECT id FROM items \
                 WHERE collection = $1 \
                 AND content->'properties'->>'order:status' != 'removed' \
                 AND datetime < $2";
            self.client
                .query(query, &[&collection.as_str(), &bound])
                .await?
        } else {
            let query = "SELECT id FROM items \
                 WHERE collection = $1 \
                 AND content->'properties'->>'order:status' != 'removed'";
            self.client.query(query, &[&collection.as_str()]).await?
        };

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get(0);
            ids.push(SceneId::new(id).map_err(CatalogError::DeserializationFailed)?);
        }

        tracing::debug!(
            collection = %collection,
            count = ids.len(),
            "Loaded active scene ids from catalog"
        );

        Ok(ids)
    }

    async fn insert_items(
        &self,
        items: &[StacItem],
        mode: InsertMode,
        dry_run: bool,
    ) -> Result<BulkInsertResult> {
        if dry_run {
            tracing::info!(
                count = items.len(),
                mode = mode.as_str(),
                "DRY RUN: Would insert {} items into catalog",
                items.len()
            );
            return Ok(BulkInsertResult {
                success_count: items.len(),
                failure_count: 0,
                failures: Vec::new(),
            });
        }

        let insert_query = match mode {
            InsertMode::InsertIgnore => {
                "INSERT INTO items (id, collection, datetime, content) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id, collection) DO NOTHING"
            }
            InsertMode::Upsert => {
                "INSERT INTO items (id, collection, datetime, content) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id, collection) DO UPDATE SET \
                     datetime = EXCLUDED.datetime, \
                     content = EXCLUDED.content"
            }
        };

        let mut success_count = 0;
        let mut failures = Vec::new();

        for item in items {
            let row = match Self::item_row(item) {
                Ok(row) => row,
                Err(e) => {
                    failures.push(BulkInsertFailure {
                        item_id: item.id.clone(),
                        error: format!("Failed to convert item: {e}"),
                    });
                    continue;
                }
            };

            match self
                .client
                .execute(
                    insert_query,
                    &[&row.id, &row.collection, &row.datetime, &row.content],
                )
                .await
            {
                Ok(_) => {
                    success_count += 1;
                }
                Err(e) => {
                    tracing::error!(
                        item_id = %row.id,
                        error = %e,
                        "Failed to insert item into catalog"
                    );
                    failures.push(BulkInsertFailure {
                        item_id: row.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(BulkInsertResult {
            success_count,
            failure_count: failures.len(),
            failures,
        })
    }

    async fn update_scene_status(
        &self,
        scene_id: &SceneId,
        collection: &CollectionId,
        status: OrderStatus,
    ) -> Result<u64> {
        let statement = "UPDATE items \
             SET content = jsonb_set(content, '{properties,order:status}', to_jsonb($1::text)) \
             WHERE id = $2 AND collection = $3";

        let affected = self
            .client
            .execute(
                statement,
                &[&status.as_str(), &scene_id.as_str(), &collection.as_str()],
            )
            .await?;

        tracing::info!(
            scene_id = %scene_id,
            collection = %collection,
            status = %status,
            affected_rows = affected,
            "Updated scene status"
        );

        Ok(affected)
    }

    async fn status_counts_by_year(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<YearStatusCount>> {
        let rows = if let Some(bound) = max_datetime {
            let query = "SELECT DATE_TRUNC('year', datetime) AS year, \
                     content->'properties'->>'order:status' AS status, \
                     content->'properties'->>'deprecated' AS deprecated, \
                     count(id) \
                 FROM items \
                 WHERE collection = $1 AND datetime < $2 \
                 GROUP BY year, status, deprecated";
            self.client
                .query(query, &[&collection.as_str(), &bound])
                .await?
        } else {
            let query = "SELECT DATE_TRUNC('year', datetime) AS year, \
                     content->'properties'->>'order:status' AS status, \
                     content->'properties'->>'deprecated' AS deprecated, \
                     count(id) \
                 FROM items \
                 WHERE collection = $1 \
                 GROUP BY year, status, deprecated";
            self.client.query(query, &[&collection.as_str()]).await?
        };

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            use chrono::Datelike;
            let year: DateTime<Utc> = row.get(0);
            let status: Option<String> = row.get(1);
            let deprecated: Option<String> = row.get(2);
            let count: i64 = row.get(3);
            counts.push(YearStatusCount {
                year: year.year(),
                status,
                deprecated,
                count: count.max(0) as u64,
            });
        }

        Ok(counts)
    }

    async fn item_counts_by_year(
        &self,
        collection: &CollectionId,
        max_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<YearCount>> {
        let rows = if let Some(bound) = max_datetime {
            let query = "SELECT DATE_TRUNC('year', datetime) AS year, count(id) \
                 FROM items \
                 WHERE collection = $1 AND datetime < $2 \
                 GROUP BY year";
            self.client
                .query(query, &[&collection.as_str(), &bound])
                .await?
        } else {
            let query = "SELECT DATE_TRUNC('year', datetime) AS year, count(id) \
                 FROM items \
                 WHERE collection = $1 \
                 GROUP BY year";
            self.client.query(query, &[&collection.as_str()]).await?
        };

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            use chrono::Datelike;
            let year: DateTime<Utc> = row.get(0);
            let count: i64 = row.get(1);
            counts.push(YearCount {
                year: year.year(),
                count: count.max(0) as u64,
            });
        }

        Ok(counts)
    }
}

#[async_trait]
impl OrderStore for PostgresCatalog {
    async fn apply_order_update(
        &self,
        update: &OrderUpdate,
        predicate: &OrderPredicate,
        limit: Option<usize>,
    ) -> Result<u64> {
        let patch = update.to_patch();

        // The predicate is operator-supplied SQL; it selects the rows the
        // JSONB merge patch is applied to.
        let statement = match limit {
            Some(limit) => format!(
                "UPDATE items \
                 SET content = jsonb_set(content, '{{properties}}', content->'properties' || $1::jsonb) \
                 WHERE id IN (SELECT id FROM items WHERE {} LIMIT {})",
                predicate.to_sql(),
                limit
            ),
            None => format!(
                "UPDATE items \
                 SET content = jsonb_set(content, '{{properties}}', content->'properties' || $1::jsonb) \
                 WHERE id IN (SELECT id FROM items WHERE {})",
                predicate.to_sql()
            ),
        };

        tracing::debug!(statement = %statement, "Applying order update");
        let affected = self.client.execute(&statement, &[&patch]).await?;
        tracing::info!(
            order_id = %update.order_id,
            batch_id = update.batch_id.as_ref().map(BatchId::as_str),
            affected_rows = affected,
            "Order update applied"
        );

        Ok(affected)
    }

    async fn order_payloads(
        &self,
        order_id: &OrderId,
        collections: &[CollectionId],
    ) -> Result<Vec<Value>> {
        let query = if collections.is_empty() {
            format!(
                "SELECT content->'properties'->'{ORDER_PAYLOAD_PROPERTY}' FROM items \
                 WHERE content->'properties'->>'order:id' = $1"
            )
        } else {
            format!(
                "SELECT content->'properties'->'{ORDER_PAYLOAD_PROPERTY}' FROM items \
                 WHERE content->'properties'->>'order:id' = $1 \
                 AND collection IN ({})",
                quoted_list(collections)
            )
        };

        let rows = self.client.query(&query, &[&order_id.as_str()]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get::<_, Option<Value>>(0))
            .collect())
    }

    async fn order_payload_for_scene(&self, scene_id: &SceneId) -> Result<Option<Value>> {
        let query = format!(
            "SELECT content->'properties'->'{ORDER_PAYLOAD_PROPERTY}' FROM items WHERE id = $1"
        );
        let rows = self.client.query(&query, &[&scene_id.as_str()]).await?;
        Ok(rows.first().and_then(|row| row.get::<_, Option<Value>>(0)))
    }

    async fn take_batch(
        &self,
        batch_id: &BatchId,
        collections: &[CollectionId],
    ) -> Result<Vec<StacItem>> {
        let collection_clause = if collections.is_empty() {
            String::new()
        } else {
            format!(" AND collection IN ({})", quoted_list(collections))
        };

        let query = format!(
            "SELECT content FROM items \
             WHERE content->'properties'->>'order:batch_id' = $1{collection_clause}"
        );
        let rows = self.client.query(&query, &[&batch_id.as_str()]).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let content: Value = row.get(0);
            items.push(StacItem::from_value(content)?);
        }

        let statement = format!(
            "UPDATE items \
             SET content = jsonb_set(content, '{{properties,order:status}}', to_jsonb($1::text)) \
             WHERE content->'properties'->>'order:batch_id' = $2{collection_clause}"
        );
        let affected = self
            .client
            .execute(
                &statement,
                &[&OrderStatus::Pending.as_str(), &batch_id.as_str()],
            )
            .await?;

        tracing::info!(
            batch_id = %batch_id,
            items = items.len(),
            affected_rows = affected,
            "Batch taken and transitioned to pending"
        );

        Ok(items)
    }

    async fn update_status_by_property(
        &self,
        property: &str,
        value: &str,
        collections: &[CollectionId],
        status: OrderStatus,
    ) -> Result<u64> {
        if !STATUS_UPDATE_PROPERTIES.contains(&property) {
            return Err(CatalogError::ExecutionFailed(format!(
                "Property not allowed for status update: {property}"
            ))
            .into());
        }

        let collection_clause = if collections.is_empty() {
            String::new()
        } else {
            format!(" AND collection IN ({})", quoted_list(collections))
        };

        let statement = format!(
            "UPDATE items \
             SET content = jsonb_set(content, '{{properties,order:status}}', to_jsonb($1::text)) \
             WHERE content->'properties'->>'{property}' = $2{collection_clause}"
        );

        let affected = self
            .client
            .execute(&statement, &[&status.as_str(), &value])
            .await?;

        tracing::info!(
            property = property,
            value = value,
            status = %status,
            affected_rows = affected,
            "Status updated by property"
        );

        Ok(affected)
    }
}
