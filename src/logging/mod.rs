//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human readable console output, filtered by `RUST_LOG` or `reel=<level>`
//! - optional JSON log files with daily or hourly rotation
//!
//! # Example
//!
//! ```no_run
//! use reel::logging::init_logging;
//! use reel::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(records = 10, "Chunk loaded");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use reel::log_error_with_context;
/// use reel::domain::ReelError;
///
/// let error = ReelError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
