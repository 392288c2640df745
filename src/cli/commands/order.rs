//! Order command implementation
//!
//! Drives the order state-transition protocol: paginated batch creation,
//! unpaginated staging, batch pickup, and single-scene completion.

use crate::cli::commands::build_catalog;
use crate::catalog::traits::OrderPredicate;
use crate::config::load_config;
use crate::core::order::OrderCoordinator;
use crate::domain::ids::{BatchId, CollectionId, OrderId, SceneId};
use clap::{Args, Subcommand};
use tokio::sync::watch;

/// Arguments for the order command
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Order action to perform
    #[command(subcommand)]
    pub action: OrderAction,
}

/// Order subcommands
#[derive(Subcommand, Debug)]
pub enum OrderAction {
    /// Create order batches by paginated update
    Create {
        /// Order identifier (generated when omitted)
        #[arg(long)]
        order_id: Option<String>,

        /// SQL predicate selecting the scenes to order
        #[arg(long = "where")]
        where_sql: String,

        /// Collections to restrict the selection to (comma-separated)
        #[arg(long)]
        collections: Option<String>,

        /// Scenes per batch (configuration default when omitted)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Stage scenes as pending without batching
    Stage {
        /// Order identifier (generated when omitted)
        #[arg(long)]
        order_id: Option<String>,

        /// SQL predicate selecting the scenes to stage
        #[arg(long = "where")]
        where_sql: Option<String>,

        /// Stage the most recent orderable scenes of this collection instead
        #[arg(long)]
        latest: Option<String>,

        /// Maximum scenes for --latest (configuration default when omitted)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Fetch a batch's scenes and transition them to pending
    Take {
        /// Batch identifier
        #[arg(long)]
        batch_id: String,

        /// Collections to restrict the lookup to (comma-separated)
        #[arg(long)]
        collections: Option<String>,
    },

    /// Mark a delivered scene succeeded
    Complete {
        /// Scene identifier
        #[arg(long)]
        scene_id: String,

        /// Collection the scene belongs to
        #[arg(long)]
        collection: String,
    },
}

fn parse_collections(raw: Option<&str>) -> anyhow::Result<Vec<CollectionId>> {
    raw.map(|raw| {
        raw.split(',')
            .map(|part| CollectionId::new(part.trim()).map_err(anyhow::Error::msg))
            .collect()
    })
    .unwrap_or_else(|| Ok(Vec::new()))
}

fn order_id_or_generated(raw: Option<&str>) -> anyhow::Result<OrderId> {
    match raw {
        Some(raw) => OrderId::new(raw).map_err(anyhow::Error::msg),
        None => Ok(OrderId::generate()),
    }
}

impl OrderArgs {
    /// Execute the order command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let catalog = build_catalog(&config).await?;
        let coordinator = OrderCoordinator::new(catalog.clone(), catalog)
            .with_shutdown(shutdown_signal);

        match &self.action {
            OrderAction::Create {
                order_id,
                where_sql,
                collections,
                batch_size,
            } => {
                let order_id = order_id_or_generated(order_id.as_deref())?;
                let predicate = OrderPredicate::new(where_sql.clone())
                    .with_collections(parse_collections(collections.as_deref())?);
                let batch_size = batch_size.unwrap_or(config.order.batch_size);

                println!("📦 Creating batches for order {order_id}");
                let batches = coordinator
                    .generate_batches(&order_id, &predicate, batch_size)
                    .await?;

                if batches.is_empty() {
                    println!("No scenes found");
                    return Ok(0);
                }

                println!();
                println!("Order Summary:");
                println!("  Order ID: {order_id}");
                println!("  Batch size: {batch_size}");
                println!("  Batches: {}", batches.len());
                for batch in &batches {
                    println!("  📦 {batch}");
                }
                println!("✅ Order created");
                Ok(0)
            }

            OrderAction::Stage {
                order_id,
                where_sql,
                latest,
                max_items,
            } => {
                let order_id = order_id_or_generated(order_id.as_deref())?;

                let payloads = match (where_sql, latest) {
                    (Some(where_sql), None) => {
                        let predicate = OrderPredicate::new(where_sql.clone());
                        coordinator.stage_order(&order_id, &predicate).await?
                    }
                    (None, Some(collection)) => {
                        let collection =
                            CollectionId::new(collection).map_err(anyhow::Error::msg)?;
                        let max_items = max_items.unwrap_or(config.order.max_items);
                        coordinator
                            .stage_latest_orderables(&order_id, &collection, max_items)
                            .await?
                    }
                    _ => {
                        println!("❌ Provide exactly one of --where or --latest");
                        return Ok(2);
                    }
                };

                println!("Staged {} scenes under order {order_id}", payloads.len());
                println!("{}", serde_json::to_string_pretty(&payloads)?);
                Ok(0)
            }

            OrderAction::Take {
                batch_id,
                collections,
            } => {
                let batch_id = BatchId::new(batch_id.clone()).map_err(anyhow::Error::msg)?;
                let collections = parse_collections(collections.as_deref())?;

                let items = coordinator.pick_up_batch(&batch_id, &collections).await?;
                println!("Batch {batch_id}: {} scenes now pending", items.len());
                for item in items.iter().take(20) {
                    println!("  {}", item.id);
                }
                Ok(0)
            }

            OrderAction::Complete {
                scene_id,
                collection,
            } => {
                let scene_id = SceneId::new(scene_id.clone()).map_err(anyhow::Error::msg)?;
                let collection =
                    CollectionId::new(collection.clone()).map_err(anyhow::Error::msg)?;

                coordinator.complete_scene(&scene_id, &collection).await?;
                println!("✅ {scene_id} marked succeeded");
                Ok(0)
            }
        }
    }
}
