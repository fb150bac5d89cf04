//! Status command implementation
//!
//! Prints the watermark entries held in the state file.

use crate::config::load_config;
use crate::core::state::{JsonFileStorage, StateStorage, Watermark};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Show every key in the state file, not only the configured one
    #[arg(long)]
    pub all: bool,
}

fn format_row(watermark: &Watermark) -> String {
    let last_run = watermark
        .last_run_completed_at
        .or(watermark.last_run_started_at)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Never".to_string());

    format!(
        "{:<30} {:<22} {:<12} {:<10} {:<20}",
        watermark.key,
        watermark.last_synced.to_string(),
        watermark.last_run_status.to_string(),
        watermark.records_synced_count,
        last_run
    )
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(e.exit_code());
            }
        };

        let storage = JsonFileStorage::new(&config.state.path);
        let watermarks = match storage.get_all_watermarks().await {
            Ok(w) => w,
            Err(e) => {
                println!("Failed to read state file {}", config.state.path);
                println!("   Error: {}", e);
                return Ok(e.exit_code());
            }
        };

        let shown: Vec<&Watermark> = watermarks
            .iter()
            .filter(|w| self.all || w.key == config.state.key)
            .collect();

        println!("Sync Status ({})", config.state.path);
        println!();

        if shown.is_empty() {
            println!("No sync history found for '{}'.", config.state.key);
            println!("Run 'reel sync' to start replicating.");
            return Ok(0);
        }

        println!(
            "{:<30} {:<22} {:<12} {:<10} {:<20}",
            "Key", "Last Synced", "Status", "Records", "Last Run"
        );
        println!("{}", "-".repeat(96));
        for watermark in shown {
            println!("{}", format_row(watermark));
            if let Some(duration) = watermark.last_run_duration() {
                println!("{:<30} last run took {}s", "", duration.num_seconds());
            }
        }
        println!();
        Ok(0)
    }
}
