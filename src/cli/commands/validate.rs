//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after parsing
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.name);
        println!("  Log Level: {}", config.application.log_level);
        println!("  UID Root: {}", config.engine.uid_root);
        println!("  Policy Store: {}", config.policy.store_path);
        println!("  Audit Log Dir: {}", config.audit.log_dir);
        println!("  Signing Algorithm: {}", config.audit.signing.algorithm);
        println!(
            "  At-Rest Encryption: {}",
            if config.audit.encryption.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!(
            "  Audit Retries: {} (initial {}ms, max {}ms)",
            config.audit.retry.max_retries,
            config.audit.retry.initial_delay_ms,
            config.audit.retry.max_delay_ms
        );
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                config.logging.local_path.as_str()
            } else {
                "disabled"
            }
        );
        println!();

        Ok(0)
    }
}
