//! Init command implementation
//!
//! This module implements the `init` command for generating a starter
//! configuration file with freshly generated key material.

use clap::Args;
use rand::RngCore;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "scrub.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = generate_config();

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("A fresh salt and signing key were generated for you.");
                println!();
                println!("Next steps:");
                println!("  1. Review {} and adjust paths", self.output);
                println!("  2. Keep the salt and signing key stable: rotating the salt");
                println!("     changes every derived pseudonym");
                println!("  3. Validate configuration: scrub validate-config");
                println!("  4. Create a policy: scrub policy create --file policy.json --actor you");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }
}

fn random_hex_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a starter configuration with fresh key material
fn generate_config() -> String {
    format!(
        r#"# scrub configuration file
# Policy-driven PHI de-identification with a tamper-evident audit trail

[application]
name = "scrub"
log_level = "info"

[engine]
# Keyed salt for deterministic pseudonym derivation.
# Rotating it changes every derived pseudonym.
salt = "{salt}"
uid_root = "2.25."

[policy]
store_path = "policies.json"

[audit]
log_dir = "audit"

[audit.signing]
# hmac (shared secret) or ed25519 (32-byte hex seed)
algorithm = "hmac"
key = "{signing_key}"

[audit.encryption]
enabled = false
# key = "<32-byte hex key>"

[audit.retry]
max_retries = 3
initial_delay_ms = 100
max_delay_ms = 2000
backoff_multiplier = 2.0

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "daily"
"#,
        salt = random_hex_key(),
        signing_key = random_hex_key(),
    )
}
