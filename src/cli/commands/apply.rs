//! Apply command implementation
//!
//! This module implements the `apply` command: de-identify one or more
//! metadata records under a named policy.

use crate::anonymization::EngineOptions;
use crate::cli::commands::build_orchestrator;
use crate::config::load_config;
use crate::domain::{MetadataRecord, RequestContext, ScrubError};
use clap::Args;
use serde_json::Value;
use std::fs;

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Name of the policy to apply
    #[arg(short, long)]
    pub policy: String,

    /// Path to a JSON file holding one metadata record or an array of records
    #[arg(short, long)]
    pub input: String,

    /// Actor recorded in the audit trail
    #[arg(short, long)]
    pub actor: String,

    /// Source system recorded in the audit trail
    #[arg(long)]
    pub source_system: Option<String>,

    /// Permit applying a policy that is not yet approved (draft testing)
    #[arg(long)]
    pub allow_unapproved: bool,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

impl ApplyArgs {
    /// Execute the apply command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(policy = %self.policy, input = %self.input, "Starting apply command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let orchestrator = build_orchestrator(&config)?;

        let records = match read_records(&self.input) {
            Ok(records) => records,
            Err(e) => {
                println!("❌ Failed to read input records");
                println!("   Error: {e}");
                return Ok(3); // Input error exit code
            }
        };

        let mut ctx = RequestContext::new(&self.actor);
        if let Some(source) = &self.source_system {
            ctx = ctx.with_source_system(source);
        }
        let options = EngineOptions {
            allow_unapproved: self.allow_unapproved,
        };

        println!(
            "🔒 Applying policy '{}' to {} record(s)",
            self.policy,
            records.len()
        );

        let mut results = Vec::new();
        let mut warnings = 0usize;
        for record in &records {
            match orchestrator
                .anonymize(&self.policy, record, &ctx, options)
                .await
            {
                Ok(outcome) => {
                    warnings += outcome.result.validation.warnings.len();
                    results.push(outcome);
                }
                Err(e @ ScrubError::AuditWrite(_)) => {
                    // An unauditable operation must not be reported as done
                    println!("❌ Audit write failed, aborting");
                    println!("   Error: {e}");
                    return Ok(5); // Fatal error exit code
                }
                Err(e) => {
                    println!("❌ Anonymization failed");
                    println!("   Error: {e}");
                    return Ok(3);
                }
            }
        }

        let rendered: Vec<Value> = results
            .iter()
            .map(|outcome| {
                let mut value = serde_json::to_value(&outcome.result)?;
                value["audit_sequence"] = outcome.audit_sequence.into();
                Ok(value)
            })
            .collect::<anyhow::Result<_>>()?;
        let output = if rendered.len() == 1 {
            serde_json::to_string_pretty(&rendered[0])?
        } else {
            serde_json::to_string_pretty(&rendered)?
        };

        match &self.output {
            Some(path) => {
                fs::write(path, output)?;
                println!("✅ {} record(s) de-identified, written to {path}", results.len());
            }
            None => {
                println!("{output}");
                println!("✅ {} record(s) de-identified", results.len());
            }
        }
        if warnings > 0 {
            println!("⚠️  {warnings} residual keyword warning(s); review the validation output");
        }

        Ok(0)
    }
}

/// Reads the input file as either a single record or an array of records
fn read_records(path: &str) -> anyhow::Result<Vec<MetadataRecord>> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;

    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<MetadataRecord>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(records)
}
