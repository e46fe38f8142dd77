//! Result type alias for Scrub

use super::errors::ScrubError;

/// Result type alias for Scrub operations
///
/// This is a convenience type alias that uses `ScrubError` as the error type.
/// Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use scrub::domain::result::Result;
/// use scrub::domain::errors::ScrubError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ScrubError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ScrubError>;
