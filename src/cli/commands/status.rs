//! Status command implementation
//!
//! This module implements the `status` command for displaying service
//! health: policy store and audit chain state.

use crate::cli::commands::build_orchestrator;
use crate::config::load_config;
use crate::core::HealthStatus;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking service status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let orchestrator = build_orchestrator(&config)?;
        let report = orchestrator.health_check().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("📊 Service Status");
            println!();
            print!("{}", report.format_summary());
        }

        Ok(match report.status {
            HealthStatus::Up => 0,
            HealthStatus::Degraded => 4,
            HealthStatus::Down => 5,
        })
    }
}
