//! CLI interface and argument parsing
//!
//! This module provides the command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// scrub - Policy-driven PHI de-identification with a tamper-evident audit trail
#[derive(Parser, Debug)]
#[command(name = "scrub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "scrub.toml", env = "SCRUB_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SCRUB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify metadata records under a named policy
    Apply(commands::apply::ApplyArgs),

    /// Manage de-identification policies and their lifecycle
    Policy(commands::policy::PolicyArgs),

    /// Inspect and verify the audit chain
    Audit(commands::audit::AuditArgs),

    /// Show service health
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
