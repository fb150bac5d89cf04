//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Reel using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Reel - incremental movie catalogue replication
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(version, about, long_about = None)]
#[command(author = "Reel Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "reel.toml", env = "REEL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "REEL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replicate one chunk of changed films from source to destination
    Sync(commands::sync::SyncArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the stored watermark
    Status(commands::status::StatusArgs),
}
