//! Configuration schema for the de-identification service
//!
//! Mirrors the layout of `scrub.toml`. Key material (the pseudonymization
//! salt, the chain signing key, the optional at-rest encryption key) is
//! held in [`SecretString`] so it never appears in Debug output or logs.

use super::secret::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubConfig {
    #[serde(default)]
    pub application: ApplicationConfig,

    pub engine: EngineConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScrubConfig {
    /// Validates the configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        self.engine.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

/// De-identification engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keyed salt for deterministic pseudonym derivation. Rotating it
    /// changes every derived pseudonym.
    pub salt: SecretString,

    /// Root prefix for replacement unique identifiers
    #[serde(default = "default_uid_root")]
    pub uid_root: String,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.salt.expose_secret().is_empty() {
            return Err("engine.salt must not be empty".to_string());
        }
        if !self.uid_root.ends_with('.') {
            return Err("engine.uid_root must end with '.'".to_string());
        }
        if !self
            .uid_root
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.')
        {
            return Err(format!(
                "engine.uid_root '{}' must contain only digits and '.'",
                self.uid_root
            ));
        }
        // Replacement identifiers are root + 16 hex chars; keep them
        // within the 64 character identifier limit
        if self.uid_root.len() + 16 > 64 {
            return Err(format!(
                "engine.uid_root is too long ({} chars); derived identifiers would exceed 64 characters",
                self.uid_root.len()
            ));
        }
        Ok(())
    }
}

/// Policy store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Path of the JSON file holding policies and approval requests
    #[serde(default = "default_policy_store_path")]
    pub store_path: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            store_path: default_policy_store_path(),
        }
    }
}

/// Audit chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding the day-partitioned log segments and the chain
    /// state sidecar
    #[serde(default = "default_audit_log_dir")]
    pub log_dir: String,

    pub signing: SigningConfig,

    #[serde(default)]
    pub encryption: EncryptionConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl AuditConfig {
    pub fn validate(&self) -> Result<(), String> {
        let valid_algorithms = ["hmac", "ed25519"];
        if !valid_algorithms.contains(&self.signing.algorithm.as_str()) {
            return Err(format!(
                "Invalid audit.signing.algorithm '{}'. Must be one of: {}",
                self.signing.algorithm,
                valid_algorithms.join(", ")
            ));
        }
        if self.signing.key.expose_secret().is_empty() {
            return Err("audit.signing.key must not be empty".to_string());
        }

        if self.encryption.enabled {
            match &self.encryption.key {
                Some(key) if !key.expose_secret().is_empty() => {}
                _ => {
                    return Err(
                        "audit.encryption.key is required when audit.encryption.enabled is true"
                            .to_string(),
                    )
                }
            }
        }

        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(
                "audit.retry.max_delay_ms must be >= audit.retry.initial_delay_ms".to_string(),
            );
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err("audit.retry.backoff_multiplier must be >= 1.0".to_string());
        }

        Ok(())
    }
}

/// Chain signature settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// "hmac" (shared secret) or "ed25519" (32-byte hex seed)
    #[serde(default = "default_signing_algorithm")]
    pub algorithm: String,

    pub key: SecretString,
}

/// Optional at-rest encryption of persisted audit records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,

    /// 32-byte hex key, required when enabled
    #[serde(default)]
    pub key: Option<SecretString>,
}

/// Retry behavior for transient audit write failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl From<&RetryConfig> for crate::audit::chain::RetryConfig {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

/// Diagnostic logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// "hourly", "daily" or "never"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["hourly", "daily", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: default_true(),
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

fn default_app_name() -> String {
    "scrub".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_uid_root() -> String {
    "2.25.".to_string()
}

fn default_policy_store_path() -> String {
    "policies.json".to_string()
}

fn default_audit_log_dir() -> String {
    "audit".to_string()
}

fn default_signing_algorithm() -> String {
    "hmac".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}
