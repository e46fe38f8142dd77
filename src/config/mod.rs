//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! The service uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Environment variable overrides (`SCRUB_*` prefix)
//! - Default values for optional settings
//! - Comprehensive validation
//! - Type-safe configuration structs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scrub::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("scrub.toml")?;
//!
//! println!("Policy store: {}", config.policy.store_path);
//! println!("Audit log dir: {}", config.audit.log_dir);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! name = "scrub"
//! log_level = "info"
//!
//! [engine]
//! salt = "${SCRUB_ENGINE_SALT}"
//! uid_root = "2.25."
//!
//! [policy]
//! store_path = "policies.json"
//!
//! [audit]
//! log_dir = "audit"
//!
//! [audit.signing]
//! algorithm = "hmac"
//! key = "${SCRUB_AUDIT_SIGNING_KEY}"
//!
//! [audit.encryption]
//! enabled = false
//! ```
//!
//! Secrets referenced with `${VAR_NAME}` are read from the environment at
//! load time and held in [`SecretString`] so they stay out of logs.

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AuditConfig, EncryptionConfig, EngineConfig, LoggingConfig, PolicyConfig,
    RetryConfig, ScrubConfig, SigningConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
