//! Service orchestrator
//!
//! Wires the policy store, the anonymization engine and the audit chain
//! together. Every operation that crosses this layer is audited, success
//! or failure alike; an operation whose audit record cannot be written is
//! reported as failed even if the work itself succeeded.
//!
//! Active policies are held as an immutable snapshot behind an atomic
//! pointer swap: in-flight requests keep the snapshot they started with,
//! and lifecycle changes become visible to new requests only.

use crate::anonymization::classify::CompiledPolicy;
use crate::anonymization::engine::{AnonymizationEngine, EngineOptions};
use crate::anonymization::models::AnonymizationResult;
use crate::audit::chain::{AuditChain, SearchCriteria};
use crate::audit::entry::{AuditEntry, AuditEvent, AuditEventType};
use crate::audit::verify::{verify_all, ChainVerificationReport};
use crate::core::health::{ComponentHealth, HealthReport, HealthStatus};
use crate::domain::{MetadataRecord, RequestContext, Result, ScrubError};
use crate::policy::{
    ApprovalRequest, Policy, PolicyDefinition, PolicyFilter, PolicyStore, StateTransition,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Result of an audited anonymization call
#[derive(Debug)]
pub struct AnonymizationOutcome {
    pub result: AnonymizationResult,
    /// Sequence number of the audit entry recording this operation
    pub audit_sequence: u64,
}

type PolicySnapshot = BTreeMap<String, Arc<CompiledPolicy>>;

/// Central coordinator for anonymization, policy lifecycle and audit
pub struct Orchestrator {
    store: Arc<PolicyStore>,
    engine: AnonymizationEngine,
    chain: Arc<AuditChain>,
    active: RwLock<Arc<PolicySnapshot>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<PolicyStore>,
        engine: AnonymizationEngine,
        chain: Arc<AuditChain>,
    ) -> Result<Self> {
        let orchestrator = Self {
            store,
            engine,
            chain,
            active: RwLock::new(Arc::new(BTreeMap::new())),
        };
        orchestrator.refresh_active_policies()?;
        Ok(orchestrator)
    }

    /// Rebuilds the active-policy snapshot from the store
    ///
    /// Policies are keyed by name; when several usable versions share a
    /// name, the most recently created one wins.
    pub fn refresh_active_policies(&self) -> Result<()> {
        let mut snapshot: PolicySnapshot = BTreeMap::new();
        // active_policies() is sorted by creation time, so later inserts
        // overwrite older versions of the same name
        for policy in self.store.active_policies()? {
            snapshot.insert(
                policy.name.clone(),
                Arc::new(CompiledPolicy::compile(policy)),
            );
        }

        let count = snapshot.len();
        *self
            .active
            .write()
            .map_err(|e| ScrubError::State(format!("active policy lock poisoned: {e}")))? =
            Arc::new(snapshot);

        tracing::debug!(active_policies = count, "Active policy snapshot rebuilt");
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<PolicySnapshot>> {
        Ok(self
            .active
            .read()
            .map_err(|e| ScrubError::State(format!("active policy lock poisoned: {e}")))?
            .clone())
    }

    /// De-identifies one metadata record under the named active policy
    ///
    /// The operation and its outcome are recorded in the audit chain. A
    /// failed audit write fails the whole call.
    pub async fn anonymize(
        &self,
        policy_name: &str,
        metadata: &MetadataRecord,
        ctx: &RequestContext,
        options: EngineOptions,
    ) -> Result<AnonymizationOutcome> {
        let compiled = match self.resolve_policy(policy_name, options) {
            Ok(compiled) => compiled,
            Err(error) => {
                self.chain
                    .append(AuditEvent::failure(
                        AuditEventType::Anonymization,
                        "anonymize",
                        json!({
                            "actor": ctx.actor,
                            "correlation_id": ctx.correlation_id,
                            "policy_name": policy_name,
                            "error": error.to_string(),
                        }),
                    ))
                    .await?;
                return Err(error);
            }
        };

        match self.engine.apply_compiled(metadata, &compiled, options) {
            Ok(result) => {
                let audit_sequence = self
                    .chain
                    .append(AuditEvent::success(
                        AuditEventType::Anonymization,
                        "anonymize",
                        json!({
                            "actor": ctx.actor,
                            "correlation_id": ctx.correlation_id,
                            "source_system": ctx.source_system,
                            "policy_name": result.policy_snapshot.name,
                            "policy_version": result.policy_snapshot.version,
                            "removed": result.validation.removed_tags.len(),
                            "pseudonymized": result.validation.pseudonymized_tags.len(),
                            "preserved": result.validation.preserved_tags.len(),
                            "phi_removed": result.validation.phi_removed,
                            "warnings": result.validation.warnings.len(),
                        }),
                    ))
                    .await?;

                Ok(AnonymizationOutcome {
                    result,
                    audit_sequence,
                })
            }
            Err(error) => {
                self.chain
                    .append(AuditEvent::failure(
                        AuditEventType::Anonymization,
                        "anonymize",
                        json!({
                            "actor": ctx.actor,
                            "correlation_id": ctx.correlation_id,
                            "policy_name": policy_name,
                            "error": error.to_string(),
                        }),
                    ))
                    .await?;
                Err(error)
            }
        }
    }

    /// Looks up the policy for an anonymization call
    ///
    /// Normally resolved against the active snapshot. A name absent from
    /// the snapshot is checked against the store so an unusable policy is
    /// reported as not-approved rather than not-found; with
    /// `allow_unapproved` that store copy is used directly so drafts can
    /// be exercised before submission.
    fn resolve_policy(
        &self,
        policy_name: &str,
        options: EngineOptions,
    ) -> Result<Arc<CompiledPolicy>> {
        if let Some(compiled) = self.snapshot()?.get(policy_name) {
            return Ok(compiled.clone());
        }

        let candidates = self.store.list_policies(&PolicyFilter {
            name: Some(policy_name.to_string()),
            ..Default::default()
        })?;
        // list is creation-ordered; take the newest
        match candidates.into_iter().last() {
            Some(policy) if options.allow_unapproved => {
                Ok(Arc::new(CompiledPolicy::compile(policy)))
            }
            Some(policy) => Err(ScrubError::PolicyNotApproved(format!(
                "policy '{}' v{} is in state '{}'",
                policy.name, policy.version, policy.approval.state
            ))),
            None => Err(ScrubError::PolicyNotFound(policy_name.to_string())),
        }
    }

    /// Creates a draft policy and audits the creation
    pub async fn create_policy(
        &self,
        definition: PolicyDefinition,
        ctx: &RequestContext,
    ) -> Result<Policy> {
        let name = definition.name.clone();
        let version = definition.version.clone();

        match self.store.create_policy(definition, &ctx.actor) {
            Ok(policy) => {
                self.chain
                    .append(AuditEvent::success(
                        AuditEventType::PolicyLifecycle,
                        "policy-create",
                        json!({
                            "actor": ctx.actor,
                            "policy_id": policy.id,
                            "policy_name": policy.name,
                            "policy_version": policy.version,
                        }),
                    ))
                    .await?;
                Ok(policy)
            }
            Err(error) => {
                self.chain
                    .append(AuditEvent::failure(
                        AuditEventType::PolicyLifecycle,
                        "policy-create",
                        json!({
                            "actor": ctx.actor,
                            "policy_name": name,
                            "policy_version": version,
                            "error": error.to_string(),
                        }),
                    ))
                    .await?;
                Err(error)
            }
        }
    }

    /// Submits a draft for approval
    pub async fn submit_for_approval(
        &self,
        policy_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<ApprovalRequest> {
        match self.store.submit_for_approval(policy_id, &ctx.actor) {
            Ok((request, transition)) => {
                self.audit_transition("policy-submit", &transition, None).await?;
                Ok(request)
            }
            Err(error) => {
                self.audit_lifecycle_failure("policy-submit", policy_id, ctx, &error)
                    .await?;
                Err(error)
            }
        }
    }

    /// Approves a pending request and refreshes the active snapshot
    pub async fn approve_policy(
        &self,
        request_id: Uuid,
        ctx: &RequestContext,
        comments: Option<String>,
    ) -> Result<Policy> {
        match self.store.approve_policy(request_id, &ctx.actor, comments) {
            Ok((policy, transition)) => {
                self.audit_transition("policy-approve", &transition, None).await?;
                self.refresh_active_policies()?;
                Ok(policy)
            }
            Err(error) => {
                self.audit_lifecycle_failure("policy-approve", request_id, ctx, &error)
                    .await?;
                Err(error)
            }
        }
    }

    /// Rejects a pending request
    pub async fn reject_policy(
        &self,
        request_id: Uuid,
        ctx: &RequestContext,
        comments: Option<String>,
    ) -> Result<Policy> {
        match self.store.reject_policy(request_id, &ctx.actor, comments) {
            Ok((policy, transition)) => {
                self.audit_transition("policy-reject", &transition, None).await?;
                Ok(policy)
            }
            Err(error) => {
                self.audit_lifecycle_failure("policy-reject", request_id, ctx, &error)
                    .await?;
                Err(error)
            }
        }
    }

    /// Activates a policy immediately with a mandatory justification
    pub async fn emergency_activate(
        &self,
        policy_id: Uuid,
        ctx: &RequestContext,
        justification: &str,
    ) -> Result<Policy> {
        match self
            .store
            .emergency_activate(policy_id, &ctx.actor, justification)
        {
            Ok((policy, transition)) => {
                self.audit_transition("policy-emergency-activate", &transition, None)
                    .await?;
                self.refresh_active_policies()?;
                Ok(policy)
            }
            Err(error) => {
                self.audit_lifecycle_failure("policy-emergency-activate", policy_id, ctx, &error)
                    .await?;
                Err(error)
            }
        }
    }

    /// Rolls back an active policy; terminal
    pub async fn rollback_policy(
        &self,
        policy_id: Uuid,
        ctx: &RequestContext,
        reason: Option<String>,
    ) -> Result<Policy> {
        match self.store.rollback_policy(policy_id, &ctx.actor, reason) {
            Ok((policy, transition)) => {
                self.audit_transition("policy-rollback", &transition, None).await?;
                self.refresh_active_policies()?;
                Ok(policy)
            }
            Err(error) => {
                self.audit_lifecycle_failure("policy-rollback", policy_id, ctx, &error)
                    .await?;
                Err(error)
            }
        }
    }

    async fn audit_transition(
        &self,
        action: &str,
        transition: &StateTransition,
        extra: Option<serde_json::Value>,
    ) -> Result<u64> {
        let mut payload = json!({
            "actor": transition.actor,
            "policy_id": transition.policy_id,
            "policy_name": transition.policy_name,
            "from": transition.from,
            "to": transition.to,
            "reason": transition.reason,
        });
        if let (Some(obj), Some(serde_json::Value::Object(extra))) =
            (payload.as_object_mut(), extra)
        {
            obj.extend(extra);
        }

        self.chain
            .append(AuditEvent::success(
                AuditEventType::PolicyLifecycle,
                action,
                payload,
            ))
            .await
    }

    async fn audit_lifecycle_failure(
        &self,
        action: &str,
        subject_id: Uuid,
        ctx: &RequestContext,
        error: &ScrubError,
    ) -> Result<u64> {
        self.chain
            .append(AuditEvent::failure(
                AuditEventType::PolicyLifecycle,
                action,
                json!({
                    "actor": ctx.actor,
                    "subject_id": subject_id,
                    "error": error.to_string(),
                }),
            ))
            .await
    }

    /// Policies matching a filter
    pub fn list_policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>> {
        self.store.list_policies(filter)
    }

    /// Approval requests awaiting a decision
    pub fn pending_approvals(&self) -> Result<Vec<ApprovalRequest>> {
        self.store.pending_approvals()
    }

    /// Verifies the entire audit chain
    pub async fn verify_audit_chain(&self) -> Result<ChainVerificationReport> {
        verify_all(&self.chain).await
    }

    /// Verifies a range of the chain; the end defaults to the chain head
    pub async fn verify_audit_range(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<ChainVerificationReport> {
        let to = match to {
            Some(to) => to,
            None => self.chain.head().await.0.max(1),
        };
        crate::audit::verify::verify_range(&self.chain, from, to)
    }

    /// Searches the audit chain
    pub fn search_audit(&self, criteria: &SearchCriteria) -> Result<Vec<AuditEntry>> {
        self.chain.search(criteria)
    }

    /// Checks the health of the policy store and the audit chain
    pub async fn health_check(&self) -> HealthReport {
        let mut components = Vec::new();

        match self.store.active_policies() {
            Ok(active) => components.push(ComponentHealth {
                name: "policy-store".to_string(),
                status: HealthStatus::Up,
                detail: format!(
                    "{} policies, {} active",
                    self.store.len(),
                    active.len()
                ),
            }),
            Err(e) => components.push(ComponentHealth {
                name: "policy-store".to_string(),
                status: HealthStatus::Down,
                detail: e.to_string(),
            }),
        }

        // The engine cannot be constructed without a salt, so presence of
        // the instance is the check
        components.push(ComponentHealth {
            name: "engine".to_string(),
            status: HealthStatus::Up,
            detail: format!("salt configured, uid root {}", self.engine.uid_root()),
        });

        let (sequence, _) = self.chain.head().await;
        let chain_health = if sequence == 0 {
            ComponentHealth {
                name: "audit-chain".to_string(),
                status: HealthStatus::Up,
                detail: "empty chain".to_string(),
            }
        } else {
            // Spot-check the chain tail rather than re-walking everything
            match crate::audit::verify::verify_range(&self.chain, sequence, sequence) {
                Ok(report) if report.chain_intact => ComponentHealth {
                    name: "audit-chain".to_string(),
                    status: HealthStatus::Up,
                    detail: format!("sequence {sequence}"),
                },
                Ok(_) => ComponentHealth {
                    name: "audit-chain".to_string(),
                    status: HealthStatus::Degraded,
                    detail: format!("tail entry {sequence} failed verification"),
                },
                Err(e) => ComponentHealth {
                    name: "audit-chain".to_string(),
                    status: HealthStatus::Down,
                    detail: e.to_string(),
                },
            }
        };
        components.push(chain_health);

        HealthReport::from_components(components)
    }
}
