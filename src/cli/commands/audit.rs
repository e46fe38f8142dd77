//! Audit command implementation
//!
//! This module implements the `audit` subcommands: verifying chain
//! integrity and searching the log.

use crate::cli::commands::build_orchestrator;
use crate::config::load_config;
use crate::audit::{AuditEventType, AuditResult, SearchCriteria};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

/// Arguments for the audit command
#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Verify the hash chain and signatures
    Verify {
        /// First sequence number to check (defaults to 1)
        #[arg(long)]
        from: Option<u64>,

        /// Last sequence number to check (defaults to the chain head)
        #[arg(long)]
        to: Option<u64>,
    },

    /// Search audit entries
    Search {
        /// Event type: anonymization, policy-lifecycle or system
        #[arg(long)]
        event_type: Option<String>,

        /// Outcome: success or failure
        #[arg(long)]
        result: Option<String>,

        /// Actor recorded in the entry payload
        #[arg(long)]
        actor: Option<String>,

        /// Policy name recorded in the entry payload
        #[arg(long)]
        policy_name: Option<String>,

        /// Only entries at or after this RFC 3339 timestamp
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Only entries at or before this RFC 3339 timestamp
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Maximum number of entries to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

impl AuditArgs {
    /// Execute the audit command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };
        let orchestrator = build_orchestrator(&config)?;

        match &self.command {
            AuditCommand::Verify { from, to } => {
                let report = match (from, to) {
                    (None, None) => orchestrator.verify_audit_chain().await?,
                    _ => {
                        orchestrator
                            .verify_audit_range(from.unwrap_or(1), *to)
                            .await?
                    }
                };

                println!("{}", report.format_summary());
                Ok(if report.chain_intact { 0 } else { 4 })
            }

            AuditCommand::Search {
                event_type,
                result,
                actor,
                policy_name,
                start,
                end,
                limit,
            } => {
                let criteria = SearchCriteria {
                    event_type: match event_type.as_deref() {
                        None => None,
                        Some(s) => Some(parse_event_type(s)?),
                    },
                    result: match result.as_deref() {
                        None => None,
                        Some(s) => Some(parse_result(s)?),
                    },
                    actor: actor.clone(),
                    policy_name: policy_name.clone(),
                    start_time: *start,
                    end_time: *end,
                    limit: Some(*limit),
                };

                let entries = orchestrator.search_audit(&criteria)?;
                if entries.is_empty() {
                    println!("No matching audit entries");
                    return Ok(0);
                }

                println!(
                    "{:<8} {:<26} {:<18} {:<26} {:<8}",
                    "SEQ", "TIMESTAMP", "TYPE", "ACTION", "RESULT"
                );
                for entry in &entries {
                    println!(
                        "{:<8} {:<26} {:<18} {:<26} {:<8}",
                        entry.sequence_number,
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                        entry.event_type.as_str(),
                        entry.action,
                        entry.result.as_str(),
                    );
                }
                println!();
                println!("{} entry(ies)", entries.len());
                Ok(0)
            }
        }
    }

}

fn parse_event_type(s: &str) -> anyhow::Result<AuditEventType> {
    match s {
        "anonymization" => Ok(AuditEventType::Anonymization),
        "policy-lifecycle" => Ok(AuditEventType::PolicyLifecycle),
        "system" => Ok(AuditEventType::System),
        other => anyhow::bail!(
            "unknown event type '{other}'; expected anonymization, policy-lifecycle or system"
        ),
    }
}

fn parse_result(s: &str) -> anyhow::Result<AuditResult> {
    match s {
        "success" => Ok(AuditResult::Success),
        "failure" => Ok(AuditResult::Failure),
        other => anyhow::bail!("unknown result '{other}'; expected success or failure"),
    }
}
