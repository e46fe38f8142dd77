//! Policy command implementation
//!
//! This module implements the `policy` subcommands covering the full
//! lifecycle: create, submit, approve, reject, emergency-activate,
//! rollback and list.

use crate::cli::commands::build_orchestrator;
use crate::config::load_config;
use crate::domain::RequestContext;
use crate::policy::{ApprovalState, PolicyDefinition, PolicyFilter};
use clap::{Args, Subcommand};
use std::fs;
use uuid::Uuid;

/// Arguments for the policy command
#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Create a draft policy from a JSON definition file
    Create {
        /// Path to the policy definition JSON
        #[arg(short, long)]
        file: String,

        /// Actor recorded as the creator
        #[arg(short, long)]
        actor: String,
    },

    /// Submit a draft policy for approval
    Submit {
        /// Policy id
        #[arg(short, long)]
        policy_id: Uuid,

        #[arg(short, long)]
        actor: String,
    },

    /// Approve a pending request
    Approve {
        /// Approval request id
        #[arg(short, long)]
        request_id: Uuid,

        #[arg(short, long)]
        actor: String,

        #[arg(long)]
        comments: Option<String>,
    },

    /// Reject a pending request
    Reject {
        /// Approval request id
        #[arg(short, long)]
        request_id: Uuid,

        #[arg(short, long)]
        actor: String,

        #[arg(long)]
        comments: Option<String>,
    },

    /// Activate a policy immediately, bypassing approval
    EmergencyActivate {
        #[arg(short, long)]
        policy_id: Uuid,

        #[arg(short, long)]
        actor: String,

        /// Mandatory justification, recorded in the audit trail
        #[arg(short, long)]
        justification: String,
    },

    /// Roll back an approved or emergency-active policy (terminal)
    Rollback {
        #[arg(short, long)]
        policy_id: Uuid,

        #[arg(short, long)]
        actor: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// List policies
    List {
        /// Filter by approval state
        #[arg(long)]
        state: Option<ApprovalState>,

        /// Filter by policy name
        #[arg(long)]
        name: Option<String>,
    },

    /// List approval requests awaiting a decision
    Pending,
}

impl PolicyArgs {
    /// Execute the policy command
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
            PolicyCommand::Create { file, actor } => {
                let contents = fs::read_to_string(file)?;
                let definition: PolicyDefinition = serde_json::from_str(&contents)?;
                match orchestrator
                    .create_policy(definition, &RequestContext::new(actor))
                    .await
                {
                    Ok(policy) => {
                        println!("✅ Draft policy created");
                        println!("   Id:      {}", policy.id);
                        println!("   Name:    {} v{}", policy.name, policy.version);
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to create policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::Submit { policy_id, actor } => {
                match orchestrator
                    .submit_for_approval(*policy_id, &RequestContext::new(actor))
                    .await
                {
                    Ok(request) => {
                        println!("✅ Policy submitted for approval");
                        println!("   Request id: {}", request.id);
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to submit policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::Approve {
                request_id,
                actor,
                comments,
            } => {
                match orchestrator
                    .approve_policy(*request_id, &RequestContext::new(actor), comments.clone())
                    .await
                {
                    Ok(policy) => {
                        println!("✅ Policy approved: {} v{}", policy.name, policy.version);
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to approve policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::Reject {
                request_id,
                actor,
                comments,
            } => {
                match orchestrator
                    .reject_policy(*request_id, &RequestContext::new(actor), comments.clone())
                    .await
                {
                    Ok(policy) => {
                        println!("✅ Policy rejected: {} v{}", policy.name, policy.version);
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to reject policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::EmergencyActivate {
                policy_id,
                actor,
                justification,
            } => {
                match orchestrator
                    .emergency_activate(*policy_id, &RequestContext::new(actor), justification)
                    .await
                {
                    Ok(policy) => {
                        println!(
                            "⚠️  Policy emergency-activated: {} v{}",
                            policy.name, policy.version
                        );
                        println!("   Justification: {justification}");
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to emergency-activate policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::Rollback {
                policy_id,
                actor,
                reason,
            } => {
                match orchestrator
                    .rollback_policy(*policy_id, &RequestContext::new(actor), reason.clone())
                    .await
                {
                    Ok(policy) => {
                        println!("✅ Policy rolled back: {} v{}", policy.name, policy.version);
                        Ok(0)
                    }
                    Err(e) => {
                        println!("❌ Failed to roll back policy");
                        println!("   Error: {e}");
                        Ok(3)
                    }
                }
            }

            PolicyCommand::List { state, name } => {
                let policies = orchestrator.list_policies(&PolicyFilter {
                    state: *state,
                    name: name.clone(),
                    ..Default::default()
                })?;
                print_policy_table(&policies);
                Ok(0)
            }

            PolicyCommand::Pending => {
                let requests = orchestrator.pending_approvals()?;
                if requests.is_empty() {
                    println!("No pending approval requests");
                } else {
                    println!("{:<38} {:<38} {:<12}", "REQUEST", "POLICY", "REQUESTED BY");
                    for request in requests {
                        println!(
                            "{:<38} {:<38} {:<12}",
                            request.id, request.policy_id, request.requested_by
                        );
                    }
                }
                Ok(0)
            }
        }
    }
}

fn print_policy_table(policies: &[crate::policy::Policy]) {
    if policies.is_empty() {
        println!("No policies found");
        return;
    }

    println!(
        "{:<38} {:<20} {:<10} {:<18} {:<12}",
        "ID", "NAME", "VERSION", "STATE", "CREATED BY"
    );
    for policy in policies {
        println!(
            "{:<38} {:<20} {:<10} {:<18} {:<12}",
            policy.id, policy.name, policy.version, policy.approval.state, policy.created_by
        );
    }
}
