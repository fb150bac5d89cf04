//! Result type alias for Reel

use super::errors::ReelError;

/// Result type alias for Reel operations
///
/// # Examples
///
/// ```
/// use reel::domain::result::Result;
/// use reel::domain::errors::ReelError;
///
/// fn failing_function() -> Result<()> {
///     Err(ReelError::Mapping("unknown field".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ReelError>;
