//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Meridian using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Meridian - Satellite scene inventory reconciliation tool
#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(version, about, long_about = None)]
#[command(author = "Meridian Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "meridian.toml", env = "MERIDIAN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MERIDIAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest scene metadata from a provider into the catalog
    Ingest(commands::ingest::IngestArgs),

    /// Diff a provider snapshot against the catalog and apply the changes
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Create, stage, take, or complete orders
    Order(commands::order::OrderArgs),

    /// Show year-bucketed inventory statistics
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::parse_from([
            "meridian",
            "ingest",
            "--provider",
            "cdse",
            "--date-from",
            "2024-01-01",
        ]);
        assert_eq!(cli.config, "meridian.toml");
        assert!(matches!(cli.command, Commands::Ingest(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from([
            "meridian",
            "--config",
            "custom.toml",
            "validate-config",
        ]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["meridian", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_reconcile() {
        let cli = Cli::parse_from([
            "meridian",
            "reconcile",
            "--collection",
            "sentinel-2-c1-l2a",
            "--snapshot",
            "inventory.csv",
        ]);
        assert!(matches!(cli.command, Commands::Reconcile(_)));
    }

    #[test]
    fn test_cli_parse_order_create() {
        let cli = Cli::parse_from([
            "meridian",
            "order",
            "create",
            "--where",
            "content->'properties'->>'order:status' = 'orderable'",
        ]);
        let Commands::Order(args) = cli.command else {
            panic!("expected order command");
        };
        assert!(matches!(
            args.action,
            commands::order::OrderAction::Create { .. }
        ));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from([
            "meridian",
            "status",
            "--collections",
            "sentinel-2-c1-l2a",
        ]);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["meridian", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
