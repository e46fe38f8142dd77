//! Policy domain models
//!
//! A policy is a versioned, approvable set of tag rules describing how a
//! metadata record is de-identified. Policies are immutable once approved
//! except for lifecycle-state transitions; content edits create a new
//! version.

use crate::domain::{Result, ScrubError, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Policy approval lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalState {
    /// Newly created, editable only by creating a new version
    Draft,
    /// Submitted and waiting for an approval decision
    PendingApproval,
    /// Approved for production use
    Approved,
    /// Approval was declined
    Rejected,
    /// Activated by emergency override, bypassing the approval step
    EmergencyActive,
    /// Withdrawn from use; terminal
    RolledBack,
}

impl ApprovalState {
    /// States in which a policy may be selected for production use
    pub fn is_usable(&self) -> bool {
        matches!(self, ApprovalState::Approved | ApprovalState::EmergencyActive)
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalState::RolledBack)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Draft => "draft",
            ApprovalState::PendingApproval => "pending-approval",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
            ApprovalState::EmergencyActive => "emergency-active",
            ApprovalState::RolledBack => "rolled-back",
        }
    }
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApprovalState {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(ApprovalState::Draft),
            "pending-approval" => Ok(ApprovalState::PendingApproval),
            "approved" => Ok(ApprovalState::Approved),
            "rejected" => Ok(ApprovalState::Rejected),
            "emergency-active" => Ok(ApprovalState::EmergencyActive),
            "rolled-back" => Ok(ApprovalState::RolledBack),
            other => Err(ScrubError::Validation(format!(
                "unknown approval state '{other}'"
            ))),
        }
    }
}

/// Approval record attached to a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    /// Current lifecycle state
    pub state: ApprovalState,

    /// Who approved the policy (set on approval)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    /// When the policy was approved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn draft() -> Self {
        Self {
            state: ApprovalState::Draft,
            approved_by: None,
            approved_at: None,
        }
    }
}

/// The three disjoint tag sets a policy acts on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagRules {
    /// Tags deleted from the output entirely
    #[serde(default)]
    pub remove: BTreeSet<Tag>,

    /// Tags replaced by a deterministic, salt-keyed pseudonym
    #[serde(default)]
    pub pseudonymize: BTreeSet<Tag>,

    /// Tags that must survive unchanged
    #[serde(default)]
    pub preserve: BTreeSet<Tag>,
}

impl TagRules {
    /// Validates the pairwise-disjointness invariant
    pub fn validate(&self) -> Result<()> {
        if self.remove.is_empty() && self.pseudonymize.is_empty() && self.preserve.is_empty() {
            return Err(ScrubError::Validation(
                "tag_rules must contain at least one tag".to_string(),
            ));
        }

        for tag in self.remove.intersection(&self.pseudonymize) {
            return Err(ScrubError::Validation(format!(
                "tag {tag} appears in both remove and pseudonymize"
            )));
        }
        for tag in self.remove.intersection(&self.preserve) {
            return Err(ScrubError::Validation(format!(
                "tag {tag} appears in both remove and preserve"
            )));
        }
        for tag in self.pseudonymize.intersection(&self.preserve) {
            return Err(ScrubError::Validation(format!(
                "tag {tag} appears in both pseudonymize and preserve"
            )));
        }

        Ok(())
    }
}

/// Policy content as supplied by the caller when creating a version
///
/// Tags are parsed (and therefore format-validated) during deserialization;
/// `validate` checks the remaining invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Human-readable policy name; production lookups resolve by name
    pub name: String,

    /// Semver-like version string
    pub version: String,

    /// What this policy is for
    pub description: String,

    /// The tag rule sets
    pub tag_rules: TagRules,

    /// Free-form classification labels
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl PolicyDefinition {
    /// Validates required fields and the tag-rule invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScrubError::Validation("policy name is required".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(ScrubError::Validation(
                "policy version is required".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ScrubError::Validation(
                "policy description is required".to_string(),
            ));
        }
        self.tag_rules.validate()
    }
}

/// A versioned anonymization policy with its approval state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy id (one per version)
    pub id: Uuid,

    pub name: String,
    pub version: String,
    pub description: String,
    pub tag_rules: TagRules,

    /// Approval lifecycle record
    pub approval: Approval,

    pub created_by: String,
    pub created_at: DateTime<Utc>,

    /// Free-form classification labels
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Policy {
    /// Builds a new draft policy from a validated definition
    pub fn from_definition(definition: PolicyDefinition, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: definition.name,
            version: definition.version,
            description: definition.description,
            tag_rules: definition.tag_rules,
            approval: Approval::draft(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            tags: definition.tags,
        }
    }

    /// True if the policy may run in production, or the caller opted into
    /// unapproved use
    pub fn is_usable(&self, allow_unapproved: bool) -> bool {
        allow_unapproved || self.approval.state.is_usable()
    }
}

/// Pending approval request created when a draft is submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Request id referenced by approve/reject calls
    pub id: Uuid,

    /// Policy this request concerns
    pub policy_id: Uuid,

    pub requested_by: String,
    pub requested_at: DateTime<Utc>,

    /// Decision details, set when the request is resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl ApprovalRequest {
    pub fn new(policy_id: Uuid, requested_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id,
            requested_by: requested_by.into(),
            requested_at: Utc::now(),
            decided_by: None,
            decided_at: None,
            comments: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.decided_at.is_none()
    }
}

/// Filter for policy listings
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Only policies in this lifecycle state
    pub state: Option<ApprovalState>,

    /// Only policies with this exact name
    pub name: Option<String>,

    /// Only policies carrying this classification label
    pub tag: Option<String>,
}

impl PolicyFilter {
    pub fn matches(&self, policy: &Policy) -> bool {
        if let Some(state) = self.state {
            if policy.approval.state != state {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if &policy.name != name {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !policy.tags.contains(tag) {
                return false;
            }
        }
        true
    }
}
