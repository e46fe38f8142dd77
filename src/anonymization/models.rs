//! Result models produced by the anonymization engine

use crate::domain::{MetadataRecord, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two actions a policy rule can take on a present tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Remove,
    Pseudonymize,
}

/// One transformation actually applied to a present tag
///
/// `original_value` is captured for the audit trail, never for the output
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationOperation {
    pub operation: OperationKind,
    pub tag: Tag,
    pub original_value: String,

    /// The replacement value; `None` for removals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

/// Snapshot of the policy a result was produced under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPolicy {
    pub name: String,
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

/// Post-transformation validation outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// False if any remove-listed tag survived in the output
    pub phi_removed: bool,

    /// Hard violations: surviving removals, altered or lost preserves
    pub errors: Vec<String>,

    /// Best-effort residual-PHI smells; never fail the operation
    pub warnings: Vec<String>,

    pub removed_tags: Vec<Tag>,
    pub pseudonymized_tags: Vec<Tag>,
    pub preserved_tags: Vec<Tag>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.phi_removed && self.errors.is_empty()
    }
}

/// Complete result of one engine invocation
///
/// Created per call, handed to the audit chain writer, then returned to the
/// caller. The engine itself never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationResult {
    pub original_metadata: MetadataRecord,
    pub anonymized_metadata: MetadataRecord,
    pub policy_snapshot: AppliedPolicy,
    pub operations: Vec<AnonymizationOperation>,
    pub validation: ValidationOutcome,
}
