//! Sync command implementation
//!
//! Runs exactly one chunk. Schedulers call `reel sync` repeatedly; the
//! watermark carries progress between invocations.

use crate::config::loader::split_list;
use crate::config::{load_config, ReelConfig};
use crate::core::sync::SyncCoordinator;
use clap::Args;
use tokio::sync::watch;

/// Exit code for a run interrupted by a signal
pub const EXIT_INTERRUPTED: i32 = 130;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Extract and transform but skip schema creation, load and commit
    #[arg(long)]
    pub dry_run: bool,

    /// Override the chunk size (minimum 10)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Override the field selection (comma-separated)
    #[arg(long)]
    pub fields: Option<String>,
}

impl SyncArgs {
    /// Apply command line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut ReelConfig) {
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Some(chunk_size) = self.chunk_size {
            tracing::info!(chunk_size, "Overriding chunk size from CLI");
            config.sync.chunk_size = chunk_size;
        }

        if let Some(fields) = &self.fields {
            let fields = split_list(fields);
            tracing::info!(fields = ?fields, "Overriding field selection from CLI");
            config.sync.fields = fields;
        }
    }

    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(e.exit_code());
            }
        };

        self.apply(&mut config);
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.application.dry_run {
            println!("DRY RUN MODE - nothing will be written and the watermark will not move");
            println!();
        }

        let coordinator = match SyncCoordinator::from_config(&config).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to prepare sync run");
                eprintln!("Failed to prepare sync run: {e}");
                return Ok(e.exit_code());
            }
        };

        let result = tokio::select! {
            result = coordinator.run_once() => result,
            Ok(()) = shutdown_signal.changed() => {
                tracing::warn!("Sync run interrupted; watermark left unchanged");
                eprintln!("Interrupted before commit; the next run will repeat this chunk.");
                return Ok(EXIT_INTERRUPTED);
            }
        };

        match result {
            Ok(summary) => {
                summary.log();
                println!("{summary}");
                Ok(0)
            }
            Err(e) => {
                crate::log_error_with_context!(&e, "Sync run failed");
                eprintln!("Sync failed: {e}");
                Ok(e.exit_code())
            }
        }
    }
}
