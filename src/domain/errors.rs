//! Domain error types
//!
//! This module defines the error hierarchy for Reel. Errors are grouped by the
//! stage of a sync run that raised them so the CLI can map them to exit codes
//! and the coordinator can decide whether the watermark may advance.

use thiserror::Error;

/// Main Reel error type
#[derive(Debug, Error)]
pub enum ReelError {
    /// Invalid or missing configuration (raised before any I/O)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A selected field does not resolve in the field catalog
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Reading changed records from the source failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Creating the destination table or index failed
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Bulk upsert into the destination failed
    #[error("Load error: {0}")]
    Load(String),

    /// Relational or embedded database errors
    #[error("Database error: {0}")]
    Database(String),

    /// Search engine transport or protocol errors
    #[error("Search engine error: {0}")]
    Search(String),

    /// Watermark persistence errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ReelError {
    /// Whether this error is raised before the run touches any backend.
    pub fn is_pre_execution(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Mapping(_))
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Mapping(_) => 2,
            Self::Provisioning(_) | Self::Database(_) | Self::Search(_) => 4,
            _ => 5,
        }
    }
}

impl From<std::io::Error> for ReelError {
    fn from(err: std::io::Error) -> Self {
        ReelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(err: serde_json::Error) -> Self {
        ReelError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ReelError {
    fn from(err: toml::de::Error) -> Self {
        ReelError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<rusqlite::Error> for ReelError {
    fn from(err: rusqlite::Error) -> Self {
        ReelError::Database(format!("SQLite: {err}"))
    }
}
