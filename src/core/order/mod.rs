//! Order coordination
//!
//! Drives the order state-transition protocol over an [`OrderStore`]:
//! paginated batch creation, unpaginated staging, batch pickup, and
//! single-scene completion.
//!
//! The paginated loop is at-least-once and non-transactional: every page
//! commits independently, so a failure mid-sequence leaves the earlier
//! batches already marked `ordered`. Callers re-run with a fresh order id to
//! continue; there is no compensating rollback.

use crate::catalog::traits::{InventoryStore, OrderPredicate, OrderStore, OrderUpdate};
use crate::domain::ids::{BatchId, CollectionId, OrderId, SceneId};
use crate::domain::scene::OrderStatus;
use crate::domain::{CatalogError, Result};
use crate::stac::StacItem;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Coordinates order state transitions against the catalog
pub struct OrderCoordinator {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryStore>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl OrderCoordinator {
    /// Create a new order coordinator
    pub fn new(orders: Arc<dyn OrderStore>, inventory: Arc<dyn InventoryStore>) -> Self {
        Self {
            orders,
            inventory,
            shutdown: None,
        }
    }

    /// Attach a shutdown signal checked between pagination pages
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Create order batches by paginated update
    ///
    /// Repeatedly applies a `LIMIT batch_size` JSONB patch that marks
    /// matching rows `ordered` and stamps `order:id`, `order:date`, and the
    /// page's `order:batch_id`, until a page affects fewer rows than the
    /// batch size. A page affecting zero rows is never recorded, so for `N`
    /// matching rows the number of batches is `ceil(N / batch_size)`; when
    /// nothing matches at all the result is an empty list, not an error.
    pub async fn generate_batches(
        &self,
        order_id: &OrderId,
        predicate: &OrderPredicate,
        batch_size: usize,
    ) -> Result<Vec<BatchId>> {
        tracing::info!(
            order_id = %order_id,
            predicate = %predicate.to_sql(),
            batch_size,
            "Generating order batches"
        );

        let mut batches = Vec::new();
        let mut page = 1usize;

        loop {
            if self.shutdown_requested() {
                tracing::warn!(
                    order_id = %order_id,
                    batches = batches.len(),
                    "Shutdown requested, stopping batch generation"
                );
                break;
            }

            let batch_id = order_id.batch(page);
            let update = OrderUpdate::new(OrderStatus::Ordered, order_id.clone(), Utc::now())
                .with_batch(batch_id.clone());

            let affected = self
                .orders
                .apply_order_update(&update, predicate, Some(batch_size))
                .await?;

            if affected == 0 {
                if batches.is_empty() {
                    tracing::info!(order_id = %order_id, "No scenes found");
                }
                break;
            }

            batches.push(batch_id);

            if (affected as usize) < batch_size {
                break;
            }
            page += 1;
        }

        tracing::info!(
            order_id = %order_id,
            batches = batches.len(),
            "Order batches generated"
        );

        Ok(batches)
    }

    /// Stage matching scenes as `pending` without batching
    ///
    /// Applies the order patch to every matching row, then returns the order
    /// payloads of the staged scenes.
    pub async fn stage_order(
        &self,
        order_id: &OrderId,
        predicate: &OrderPredicate,
    ) -> Result<Vec<Value>> {
        let update = OrderUpdate::new(OrderStatus::Pending, order_id.clone(), Utc::now());
        let affected = self
            .orders
            .apply_order_update(&update, predicate, None)
            .await?;

        tracing::info!(
            order_id = %order_id,
            affected_rows = affected,
            "Scenes staged as pending"
        );

        self.orders
            .order_payloads(order_id, &predicate.collections)
            .await
    }

    /// Stage the most recent orderable scenes of one collection
    pub async fn stage_latest_orderables(
        &self,
        order_id: &OrderId,
        collection: &CollectionId,
        max_items: usize,
    ) -> Result<Vec<Value>> {
        let predicate = OrderPredicate::new(format!(
            "collection = '{}' \
             AND content->'properties'->>'order:status' = 'orderable' \
             ORDER BY datetime DESC LIMIT {}",
            collection.as_str().replace('\'', "''"),
            max_items
        ));

        let update = OrderUpdate::new(OrderStatus::Pending, order_id.clone(), Utc::now());
        self.orders
            .apply_order_update(&update, &predicate, None)
            .await?;

        let collections = vec![collection.clone()];
        self.orders.order_payloads(order_id, &collections).await
    }

    /// Fetch a batch's items and transition them to `pending`
    pub async fn pick_up_batch(
        &self,
        batch_id: &BatchId,
        collections: &[CollectionId],
    ) -> Result<Vec<StacItem>> {
        self.orders.take_batch(batch_id, collections).await
    }

    /// Mark a single delivered scene `succeeded`
    ///
    /// Zero affected rows is fatal here: a completion for an unknown scene
    /// means the inventory and the delivery pipeline disagree. (The
    /// paginated loop above intentionally treats zero rows as a normal
    /// termination instead.)
    pub async fn complete_scene(
        &self,
        scene_id: &SceneId,
        collection: &CollectionId,
    ) -> Result<()> {
        let affected = self
            .inventory
            .update_scene_status(scene_id, collection, OrderStatus::Succeeded)
            .await?;

        if affected == 0 {
            return Err(CatalogError::NoRowsAffected(scene_id.to_string()).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::traits::{BulkInsertResult, InsertMode, YearCount, YearStatusCount};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// In-memory order store with a fixed number of matching rows
    struct MockOrderStore {
        matching_rows: Mutex<usize>,
        applied: Mutex<Vec<(OrderUpdate, Option<usize>)>>,
    }

    impl MockOrderStore {
        fn with_rows(rows: usize) -> Self {
            Self {
                matching_rows: Mutex::new(rows),
                applied: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OrderStore for MockOrderStore {
        async fn apply_order_update(
            &self,
            update: &OrderUpdate,
            _predicate: &OrderPredicate,
            limit: Option<usize>,
        ) -> Result<u64> {
            let mut remaining = self.matching_rows.lock().unwrap();
            let affected = match limit {
                Some(limit) => (*remaining).min(limit),
                None => *remaining,
            };
            *remaining -= affected;
            self.applied
                .lock()
                .unwrap()
                .push((update.clone(), limit));
            Ok(affected as u64)
        }

        async fn order_payloads(
            &self,
            order_id: &OrderId,
            _collections: &[CollectionId],
        ) -> Result<Vec<Value>> {
            Ok(vec![serde_json::json!({"order_id": order_id.as_str()})])
        }

        async fn order_payload_for_scene(&self, _scene_id: &SceneId) -> Result<Option<Value>> {
            Ok(None)
        }

        async fn take_batch(
            &self,
            _batch_id: &BatchId,
            _collections: &[CollectionId],
        ) -> Result<Vec<StacItem>> {
            Ok(Vec::new())
        }

        async fn update_status_by_property(
            &self,
            _property: &str,
            _value: &str,
            _collections: &[CollectionId],
            _status: OrderStatus,
        ) -> Result<u64> {
            Ok(0)
        }
    }

    /// Inventory mock that reports a configurable affected-row count
    struct MockInventory {
        affected: u64,
    }

    #[async_trait]
    impl InventoryStore for MockInventory {
        async fn active_scene_ids(
            &self,
            _collection: &CollectionId,
            _max_datetime: Option<DateTime<Utc>>,
        ) -> Result<Vec<SceneId>> {
            Ok(Vec::new())
        }

        async fn insert_items(
            &self,
            _items: &[StacItem],
            _mode: InsertMode,
            _dry_run: bool,
        ) -> Result<BulkInsertResult> {
            Ok(BulkInsertResult::default())
        }

        async fn update_scene_status(
            &self,
            _scene_id: &SceneId,
            _collection: &CollectionId,
            _status: OrderStatus,
        ) -> Result<u64> {
            Ok(self.affected)
        }

        async fn status_counts_by_year(
            &self,
            _collection: &CollectionId,
            _max_datetime: Option<DateTime<Utc>>,
        ) -> Result<Vec<YearStatusCount>> {
            Ok(Vec::new())
        }

        async fn item_counts_by_year(
            &self,
            _collection: &CollectionId,
            _max_datetime: Option<DateTime<Utc>>,
        ) -> Result<Vec<YearCount>> {
            Ok(Vec::new())
        }
    }

    fn coordinator(rows: usize, affected: u64) -> (OrderCoordinator, Arc<MockOrderStore>) {
        let orders = Arc::new(MockOrderStore::with_rows(rows));
        let inventory = Arc::new(MockInventory { affected });
        (
            OrderCoordinator::new(orders.clone(), inventory),
            orders,
        )
    }

    #[tokio::test]
    async fn test_generate_batches_exact_multiple() {
        let (coordinator, _store) = coordinator(2000, 1);
        let order_id = OrderId::new("order-x").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        let batches = coordinator
            .generate_batches(&order_id, &predicate, 1000)
            .await
            .unwrap();

        // 2000 rows / 1000 per page = exactly 2 batches, no trailing empty one
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].as_str(), "order-x_1");
        assert_eq!(batches[1].as_str(), "order-x_2");
    }

    #[tokio::test]
    async fn test_generate_batches_with_remainder() {
        let (coordinator, _store) = coordinator(2500, 1);
        let order_id = OrderId::new("order-x").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        let batches = coordinator
            .generate_batches(&order_id, &predicate, 1000)
            .await
            .unwrap();

        // ceil(2500 / 1000) = 3
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].as_str(), "order-x_3");
    }

    #[tokio::test]
    async fn test_generate_batches_no_matches_is_empty_not_error() {
        let (coordinator, _store) = coordinator(0, 1);
        let order_id = OrderId::new("order-x").unwrap();
        let predicate = OrderPredicate::new("1 = 0");

        let batches = coordinator
            .generate_batches(&order_id, &predicate, 1000)
            .await
            .unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn test_generate_batches_single_partial_page() {
        let (coordinator, store) = coordinator(37, 1);
        let order_id = OrderId::new("order-x").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        let batches = coordinator
            .generate_batches(&order_id, &predicate, 100)
            .await
            .unwrap();
        assert_eq!(batches.len(), 1);

        // Only one page was issued
        assert_eq!(store.applied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_batches_stamps_ordered_status() {
        let (coordinator, store) = coordinator(10, 1);
        let order_id = OrderId::new("order-x").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        coordinator
            .generate_batches(&order_id, &predicate, 100)
            .await
            .unwrap();

        let applied = store.applied.lock().unwrap();
        let (update, limit) = &applied[0];
        assert_eq!(update.status, OrderStatus::Ordered);
        assert_eq!(update.batch_id.as_ref().unwrap().as_str(), "order-x_1");
        assert_eq!(*limit, Some(100));
    }

    #[tokio::test]
    async fn test_stage_order_uses_pending_without_limit() {
        let (coordinator, store) = coordinator(5, 1);
        let order_id = OrderId::new("order-y").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        let payloads = coordinator.stage_order(&order_id, &predicate).await.unwrap();
        assert_eq!(payloads.len(), 1);

        let applied = store.applied.lock().unwrap();
        let (update, limit) = &applied[0];
        assert_eq!(update.status, OrderStatus::Pending);
        assert!(update.batch_id.is_none());
        assert!(limit.is_none());
    }

    #[tokio::test]
    async fn test_complete_scene_zero_rows_is_fatal() {
        let (coordinator, _store) = coordinator(0, 0);
        let scene_id = SceneId::new("ghost").unwrap();
        let collection = CollectionId::new("landsat-ot-c2-l2").unwrap();

        let err = coordinator
            .complete_scene(&scene_id, &collection)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("0 affected rows"));
    }

    #[tokio::test]
    async fn test_complete_scene_success() {
        let (coordinator, _store) = coordinator(0, 1);
        let scene_id = SceneId::new("delivered").unwrap();
        let collection = CollectionId::new("landsat-ot-c2-l2").unwrap();

        coordinator
            .complete_scene(&scene_id, &collection)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_batches_respects_shutdown() {
        let orders = Arc::new(MockOrderStore::with_rows(10_000));
        let inventory = Arc::new(MockInventory { affected: 1 });
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let coordinator = OrderCoordinator::new(orders, inventory).with_shutdown(rx);
        let order_id = OrderId::new("order-z").unwrap();
        let predicate = OrderPredicate::new("1 = 1");

        let batches = coordinator
            .generate_batches(&order_id, &predicate, 100)
            .await
            .unwrap();
        assert!(batches.is_empty());
    }
}
