//! Domain error types
//!
//! This module defines the error hierarchy for Scrub. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Scrub error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum ScrubError {
    /// Malformed policy, tag, or input data
    #[error("Validation error: {0}")]
    Validation(String),

    /// Policy lookup by id or name failed
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// Policy is not in an approved state and unapproved use was not requested
    #[error("Policy not approved for use: {0}")]
    PolicyNotApproved(String),

    /// Illegal policy lifecycle transition
    #[error("Invalid policy state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Audit chain verification detected tampering.
    /// Never produced by a normal append, only by verification.
    #[error("Chain integrity error: {0}")]
    ChainIntegrity(String),

    /// Durable audit write failed after exhausting retries.
    /// Fatal to the request: an unrecorded operation violates tamper evidence.
    #[error("Audit write error: {0}")]
    AuditWrite(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cryptographic operation errors (signing, at-rest encryption)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Policy store persistence errors
    #[error("State management error: {0}")]
    State(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ScrubError {
    fn from(err: std::io::Error) -> Self {
        ScrubError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ScrubError {
    fn from(err: serde_json::Error) -> Self {
        ScrubError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ScrubError {
    fn from(err: toml::de::Error) -> Self {
        ScrubError::Configuration(format!("TOML parse error: {err}"))
    }
}
