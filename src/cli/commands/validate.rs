//! Validate config command implementation
//!
//! Loads and validates the configuration, resolves the run plan and
//! optionally checks both backends are reachable.

use crate::adapters::backend::create_backend;
use crate::config::{load_config, ConnectionConfig, ReelConfig};
use crate::core::dispatch::RunPlan;
use crate::domain::BackendKind;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Also connect to the source and destination
    #[arg(long)]
    pub check_connections: bool,
}

fn connection_summary(connection: &ConnectionConfig) -> String {
    match connection.kind {
        BackendKind::Postgres => connection
            .postgresql
            .as_ref()
            .map(|pg| format!("postgres {}.{}", pg.schema, pg.table)),
        BackendKind::Elasticsearch => connection
            .elasticsearch
            .as_ref()
            .map(|es| format!("elasticsearch {}/{}", es.url, es.index)),
        BackendKind::Sqlite => connection
            .sqlite
            .as_ref()
            .map(|db| format!("sqlite {} ({})", db.path, db.table)),
    }
    .unwrap_or_else(|| connection.kind.to_string())
}

fn print_summary(config: &ReelConfig, plan: &RunPlan) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Dry Run: {}", config.application.dry_run);
    println!("  Source: {}", connection_summary(&config.source));
    println!("  Destination: {}", connection_summary(&config.destination));
    println!("  Chunk Size: {}", plan.chunk_size);
    println!("  Fields: {}", plan.selection.columns().join(", "));
    println!("  Genre Names: {}", config.sync.genres.len());
    println!("  State: {} [{}]", config.state.path, config.state.key);
    println!();
    println!("Run Plan:");
    println!("  {}", plan.source);
    println!("  {}", plan.destination);
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("OK   Configuration file loaded and validated");
                c
            }
            Err(e) => {
                println!("FAIL Failed to load configuration file");
                println!("     Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let plan = match RunPlan::from_config(&config) {
            Ok(plan) => {
                println!("OK   Field selection resolves for both backends");
                plan
            }
            Err(e) => {
                println!("FAIL Field selection is invalid");
                println!("     Error: {e}");
                return Ok(e.exit_code());
            }
        };

        println!();
        print_summary(&config, &plan);
        println!();

        if !self.check_connections {
            return Ok(0);
        }

        let mut exit_code = 0;
        for (side, connection) in [("source", &config.source), ("destination", &config.destination)] {
            let outcome = match create_backend(connection).await {
                Ok(backend) => backend.test_connection().await.map(|_| backend.describe()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(target) => println!("OK   {side} reachable: {target}"),
                Err(e) => {
                    tracing::error!(side, error = %e, "Connection check failed");
                    println!("FAIL {side} unreachable");
                    println!("     Error: {e}");
                    exit_code = 4;
                }
            }
        }
        println!();

        Ok(exit_code)
    }
}
