//! Versioned policy store with JSON persistence
//!
//! The store is the leaf of the system: it owns the policy set and its
//! approval state and nothing else. Every mutation is durably saved before
//! it is reported as successful; the in-memory set is only swapped after the
//! write lands, so a failed save never leaves phantom state behind.
//!
//! Lifecycle transitions are returned to the caller as [`StateTransition`]
//! records; the orchestrator routes them to the audit chain. The leaf store
//! itself has no audit dependency.

use crate::domain::{Result, ScrubError};
use crate::policy::lifecycle::{check_transition, StateTransition};
use crate::policy::model::{
    ApprovalRequest, ApprovalState, Policy, PolicyDefinition, PolicyFilter,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Persisted form of the policy set: one JSON document at `store_path`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicySet {
    /// Policies keyed by policy id
    #[serde(default)]
    policies: BTreeMap<String, Policy>,

    /// Approval requests keyed by request id
    #[serde(default)]
    approval_requests: BTreeMap<String, ApprovalRequest>,
}

/// Policy store backed by a JSON document on disk
pub struct PolicyStore {
    path: PathBuf,
    inner: RwLock<PolicySet>,
}

impl PolicyStore {
    /// Opens the store, loading the policy set if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let set = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                ScrubError::State(format!(
                    "Failed to read policy store {}: {e}",
                    path.display()
                ))
            })?;
            serde_json::from_str(&contents).map_err(|e| {
                ScrubError::State(format!(
                    "Failed to parse policy store {}: {e}",
                    path.display()
                ))
            })?
        } else {
            PolicySet::default()
        };

        Ok(Self {
            path,
            inner: RwLock::new(set),
        })
    }

    /// Creates a new draft policy from a definition
    pub fn create_policy(
        &self,
        definition: PolicyDefinition,
        created_by: impl Into<String>,
    ) -> Result<Policy> {
        definition.validate()?;

        let created_by = created_by.into();
        let policy = self.mutate(|set| {
            let duplicate = set
                .policies
                .values()
                .any(|p| p.name == definition.name && p.version == definition.version);
            if duplicate {
                return Err(ScrubError::Validation(format!(
                    "policy '{}' version '{}' already exists; content edits create a new version",
                    definition.name, definition.version
                )));
            }

            let policy = Policy::from_definition(definition, created_by);
            set.policies.insert(policy.id.to_string(), policy.clone());
            Ok(policy)
        })?;

        tracing::info!(
            policy_id = %policy.id,
            name = %policy.name,
            version = %policy.version,
            "Policy created"
        );
        Ok(policy)
    }

    /// Submits a draft for approval, creating the request that
    /// `approve_policy`/`reject_policy` reference by request id
    pub fn submit_for_approval(
        &self,
        policy_id: Uuid,
        requested_by: impl Into<String>,
    ) -> Result<(ApprovalRequest, StateTransition)> {
        let requested_by = requested_by.into();
        self.mutate(|set| {
            let policy = Self::policy_mut(set, policy_id)?;
            let transition = Self::apply_transition(
                policy,
                ApprovalState::PendingApproval,
                &requested_by,
                None,
            )?;

            let request = ApprovalRequest::new(policy_id, requested_by.clone());
            set.approval_requests
                .insert(request.id.to_string(), request.clone());
            Ok((request, transition))
        })
    }

    /// Approves a pending request
    pub fn approve_policy(
        &self,
        request_id: Uuid,
        approved_by: impl Into<String>,
        comments: Option<String>,
    ) -> Result<(Policy, StateTransition)> {
        self.decide(request_id, approved_by.into(), comments, ApprovalState::Approved)
    }

    /// Rejects a pending request
    pub fn reject_policy(
        &self,
        request_id: Uuid,
        rejected_by: impl Into<String>,
        comments: Option<String>,
    ) -> Result<(Policy, StateTransition)> {
        self.decide(request_id, rejected_by.into(), comments, ApprovalState::Rejected)
    }

    fn decide(
        &self,
        request_id: Uuid,
        decided_by: String,
        comments: Option<String>,
        outcome: ApprovalState,
    ) -> Result<(Policy, StateTransition)> {
        let (policy, transition) = self.mutate(|set| {
            let request = set
                .approval_requests
                .get_mut(&request_id.to_string())
                .ok_or_else(|| {
                    ScrubError::PolicyNotFound(format!("approval request {request_id}"))
                })?;
            if !request.is_pending() {
                return Err(ScrubError::Validation(format!(
                    "approval request {request_id} is already decided"
                )));
            }

            request.decided_by = Some(decided_by.clone());
            request.decided_at = Some(Utc::now());
            request.comments = comments.clone();
            let policy_id = request.policy_id;

            let policy = Self::policy_mut(set, policy_id)?;
            let transition = Self::apply_transition(policy, outcome, &decided_by, comments)?;

            if outcome == ApprovalState::Approved {
                policy.approval.approved_by = Some(decided_by);
                policy.approval.approved_at = Some(Utc::now());
            }
            Ok((policy.clone(), transition))
        })?;

        tracing::info!(
            policy_id = %policy.id,
            name = %policy.name,
            state = %policy.approval.state,
            "Approval request decided"
        );
        Ok((policy, transition))
    }

    /// Activates a policy immediately, bypassing the approval step
    ///
    /// The justification is mandatory and is carried in the returned
    /// transition record for the audit trail.
    pub fn emergency_activate(
        &self,
        policy_id: Uuid,
        activated_by: impl Into<String>,
        justification: &str,
    ) -> Result<(Policy, StateTransition)> {
        if justification.trim().is_empty() {
            return Err(ScrubError::Validation(
                "emergency activation requires a justification".to_string(),
            ));
        }

        let activated_by = activated_by.into();
        let (policy, transition) = self.mutate(|set| {
            let policy = Self::policy_mut(set, policy_id)?;
            let transition = Self::apply_transition(
                policy,
                ApprovalState::EmergencyActive,
                &activated_by,
                Some(justification.to_string()),
            )?;
            Ok((policy.clone(), transition))
        })?;

        tracing::warn!(
            policy_id = %policy.id,
            name = %policy.name,
            activated_by = %transition.actor,
            "Policy emergency-activated, bypassing approval"
        );
        Ok((policy, transition))
    }

    /// Rolls back an approved or emergency-active policy; terminal
    pub fn rollback_policy(
        &self,
        policy_id: Uuid,
        rolled_back_by: impl Into<String>,
        reason: Option<String>,
    ) -> Result<(Policy, StateTransition)> {
        let rolled_back_by = rolled_back_by.into();
        let (policy, transition) = self.mutate(|set| {
            let policy = Self::policy_mut(set, policy_id)?;
            let transition = Self::apply_transition(
                policy,
                ApprovalState::RolledBack,
                &rolled_back_by,
                reason,
            )?;
            Ok((policy.clone(), transition))
        })?;

        tracing::info!(
            policy_id = %policy.id,
            name = %policy.name,
            "Policy rolled back"
        );
        Ok((policy, transition))
    }

    /// Returns a policy by id
    pub fn get(&self, policy_id: Uuid) -> Result<Policy> {
        self.read_lock()?
            .policies
            .get(&policy_id.to_string())
            .cloned()
            .ok_or_else(|| ScrubError::PolicyNotFound(policy_id.to_string()))
    }

    /// Lists policies matching a filter, in creation order
    pub fn list_policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>> {
        let set = self.read_lock()?;
        let mut policies: Vec<Policy> = set
            .policies
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        policies.sort_by_key(|p| p.created_at);
        Ok(policies)
    }

    /// Policies currently usable in production
    pub fn active_policies(&self) -> Result<Vec<Policy>> {
        let set = self.read_lock()?;
        let mut policies: Vec<Policy> = set
            .policies
            .values()
            .filter(|p| p.approval.state.is_usable())
            .cloned()
            .collect();
        policies.sort_by_key(|p| p.created_at);
        Ok(policies)
    }

    /// Approval requests still awaiting a decision
    pub fn pending_approvals(&self) -> Result<Vec<ApprovalRequest>> {
        let set = self.read_lock()?;
        let mut requests: Vec<ApprovalRequest> = set
            .approval_requests
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.requested_at);
        Ok(requests)
    }

    /// Number of stored policies
    pub fn len(&self) -> usize {
        self.read_lock().map(|s| s.policies.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_transition(
        policy: &mut Policy,
        to: ApprovalState,
        actor: &str,
        reason: Option<String>,
    ) -> Result<StateTransition> {
        let from = policy.approval.state;
        check_transition(from, to)?;
        policy.approval.state = to;

        Ok(StateTransition {
            policy_id: policy.id,
            policy_name: policy.name.clone(),
            from,
            to,
            actor: actor.to_string(),
            at: Utc::now(),
            reason,
        })
    }

    fn policy_mut(set: &mut PolicySet, policy_id: Uuid) -> Result<&mut Policy> {
        set.policies
            .get_mut(&policy_id.to_string())
            .ok_or_else(|| ScrubError::PolicyNotFound(policy_id.to_string()))
    }

    /// Runs one mutation under the write lock: clone the set, apply the
    /// operation to the clone, persist, then swap it in. The lock is held
    /// across the whole read-modify-write so concurrent mutations cannot
    /// erase each other, and a failed save never leaves phantom state.
    fn mutate<T>(&self, op: impl FnOnce(&mut PolicySet) -> Result<T>) -> Result<T> {
        let mut guard = self.write_lock()?;
        let mut staged = guard.clone();
        let value = op(&mut staged)?;

        self.persist(&staged)?;
        *guard = staged;
        Ok(value)
    }

    /// Writes the set to disk. Durable-before-visible.
    fn persist(&self, set: &PolicySet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ScrubError::State(format!(
                        "Failed to create policy store directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(set)
            .map_err(|e| ScrubError::State(format!("Failed to serialize policy set: {e}")))?;
        std::fs::write(&self.path, contents).map_err(|e| {
            ScrubError::State(format!(
                "Failed to write policy store {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, PolicySet>> {
        self.inner
            .read()
            .map_err(|e| ScrubError::State(format!("policy store lock poisoned: {e}")))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, PolicySet>> {
        self.inner
            .write()
            .map_err(|e| ScrubError::State(format!("policy store lock poisoned: {e}")))
    }
}
