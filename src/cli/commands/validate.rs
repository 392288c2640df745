//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Meridian configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration file loaded successfully");
                config
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Environment: {:?}", config.environment);
                println!(
                    "  Catalog: {}",
                    config
                        .catalog
                        .connection_string
                        .split('@')
                        .next_back()
                        .unwrap_or("***")
                );
                println!("  Inventory API: {}", config.stac_api.inventory_url);
                println!("  Public API: {}", config.stac_api.public_url);

                let mut providers = Vec::new();
                if config.providers.usgs.is_some() {
                    providers.push("usgs");
                }
                if config.providers.cdse.is_some() {
                    providers.push("cdse");
                }
                if config.providers.cmr.is_some() {
                    providers.push("cmr");
                }
                println!(
                    "  Providers: {}",
                    if providers.is_empty() {
                        "none".to_string()
                    } else {
                        providers.join(", ")
                    }
                );

                println!("  Snapshot columns: {} / {}", config.reconcile.id_column, config.reconcile.date_column);
                println!("  Insert Mode: {}", config.reconcile.insert_mode);
                println!("  Batch Size: {}", config.order.batch_size);
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                Ok(2)
            }
        }
    }
}
