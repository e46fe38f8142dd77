//! Anonymization engine
//!
//! A pure transformation over a policy and a metadata record. The engine
//! performs no I/O and holds no mutable cross-call state, so one instance
//! can serve concurrent callers against the same policy snapshot.

use crate::anonymization::classify::CompiledPolicy;
use crate::anonymization::models::{
    AnonymizationOperation, AnonymizationResult, AppliedPolicy, OperationKind, ValidationOutcome,
};
use crate::anonymization::pseudonym::Pseudonymizer;
use crate::anonymization::validation::Validator;
use crate::config::SecretString;
use crate::domain::{MetadataRecord, Result, ScrubError};
use crate::policy::Policy;
use chrono::Utc;

/// Per-call options
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Permit applying a policy that is not approved or emergency-active.
    /// The result is still fully validated.
    pub allow_unapproved: bool,
}

/// The de-identification engine
pub struct AnonymizationEngine {
    pseudonymizer: Pseudonymizer,
    validator: Validator,
}

impl AnonymizationEngine {
    pub fn new(salt: SecretString, uid_root: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pseudonymizer: Pseudonymizer::new(salt, uid_root),
            validator: Validator::new()?,
        })
    }

    /// Root prefix used for replacement identifiers
    pub fn uid_root(&self) -> &str {
        self.pseudonymizer.uid_root()
    }

    /// Applies a policy, compiling its classification table first
    ///
    /// Production callers go through [`Self::apply_compiled`] with a table
    /// compiled once at snapshot-rebuild time.
    pub fn apply(
        &self,
        metadata: &MetadataRecord,
        policy: &Policy,
        options: EngineOptions,
    ) -> Result<AnonymizationResult> {
        let compiled = CompiledPolicy::compile(policy.clone());
        self.apply_compiled(metadata, &compiled, options)
    }

    /// Applies a pre-compiled policy to a metadata record
    pub fn apply_compiled(
        &self,
        metadata: &MetadataRecord,
        compiled: &CompiledPolicy,
        options: EngineOptions,
    ) -> Result<AnonymizationResult> {
        let policy = &compiled.policy;

        if !policy.is_usable(options.allow_unapproved) {
            return Err(ScrubError::PolicyNotApproved(format!(
                "policy '{}' v{} is in state '{}'",
                policy.name, policy.version, policy.approval.state
            )));
        }

        let mut anonymized = metadata.clone();
        let mut operations = Vec::new();
        let mut removed_tags = Vec::new();
        let mut pseudonymized_tags = Vec::new();

        for tag in &policy.tag_rules.remove {
            if let Some(original_value) = anonymized.remove(tag) {
                removed_tags.push(*tag);
                operations.push(AnonymizationOperation {
                    operation: OperationKind::Remove,
                    tag: *tag,
                    original_value,
                    new_value: None,
                });
            }
        }

        for tag in &policy.tag_rules.pseudonymize {
            let Some(original_value) = anonymized.get(tag).map(str::to_string) else {
                continue;
            };
            let new_value =
                self.pseudonymizer
                    .pseudonymize(tag, &original_value, compiled.class_of(tag));
            anonymized.insert(*tag, new_value.clone());
            pseudonymized_tags.push(*tag);
            operations.push(AnonymizationOperation {
                operation: OperationKind::Pseudonymize,
                tag: *tag,
                original_value,
                new_value: Some(new_value),
            });
        }

        let preserved_tags: Vec<_> = policy
            .tag_rules
            .preserve
            .iter()
            .filter(|tag| metadata.contains(tag))
            .copied()
            .collect();

        let findings = self
            .validator
            .validate(metadata, &anonymized, &policy.tag_rules);

        if !findings.errors.is_empty() {
            tracing::warn!(
                policy = %policy.name,
                errors = findings.errors.len(),
                "Anonymization validation reported hard errors"
            );
        }

        Ok(AnonymizationResult {
            original_metadata: metadata.clone(),
            anonymized_metadata: anonymized,
            policy_snapshot: AppliedPolicy {
                name: policy.name.clone(),
                version: policy.version.clone(),
                applied_at: Utc::now(),
            },
            operations,
            validation: ValidationOutcome {
                phi_removed: findings.phi_removed,
                errors: findings.errors,
                warnings: findings.warnings,
                removed_tags,
                pseudonymized_tags,
                preserved_tags,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::domain::{tags, Tag};
    use crate::policy::{ApprovalState, PolicyDefinition, TagRules};
    use std::collections::BTreeSet;

    fn engine(salt: &str) -> AnonymizationEngine {
        AnonymizationEngine::new(secret_string(salt.to_string()), "2.25.").unwrap()
    }

    fn policy(state: ApprovalState) -> Policy {
        let mut remove = BTreeSet::new();
        remove.insert(tags::PATIENT_NAME);
        let mut pseudonymize = BTreeSet::new();
        pseudonymize.insert(tags::STUDY_INSTANCE_UID);
        pseudonymize.insert(tags::STUDY_DATE);
        pseudonymize.insert(tags::STUDY_TIME);
        pseudonymize.insert(tags::PATIENT_ID);
        let mut preserve = BTreeSet::new();
        preserve.insert(Tag::new(0x0008, 0x0060));

        let mut policy = Policy::from_definition(
            PolicyDefinition {
                name: "standard".to_string(),
                version: "1.0.0".to_string(),
                description: "test".to_string(),
                tag_rules: TagRules {
                    remove,
                    pseudonymize,
                    preserve,
                },
                tags: BTreeSet::new(),
            },
            "alice",
        );
        policy.approval.state = state;
        policy
    }

    fn metadata() -> MetadataRecord {
        let mut record = MetadataRecord::new();
        record.insert(tags::PATIENT_NAME, "John Smith");
        record.insert(tags::PATIENT_ID, "MRN-0042");
        record.insert(tags::STUDY_INSTANCE_UID, "1.2.3.999");
        record.insert(tags::STUDY_DATE, "20240115");
        record.insert(tags::STUDY_TIME, "101530");
        record.insert(Tag::new(0x0008, 0x0060), "CT");
        record
    }

    #[test]
    fn test_unapproved_policy_rejected_by_default() {
        let result = engine("s").apply(
            &metadata(),
            &policy(ApprovalState::Draft),
            EngineOptions::default(),
        );
        assert!(matches!(result, Err(ScrubError::PolicyNotApproved(_))));
    }

    #[test]
    fn test_allow_unapproved_opt_in() {
        let result = engine("s").apply(
            &metadata(),
            &policy(ApprovalState::Draft),
            EngineOptions {
                allow_unapproved: true,
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_emergency_active_is_usable() {
        let result = engine("s").apply(
            &metadata(),
            &policy(ApprovalState::EmergencyActive),
            EngineOptions::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_remove_deletes_and_records_original() {
        let result = engine("s")
            .apply(
                &metadata(),
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();

        assert!(!result.anonymized_metadata.contains(&tags::PATIENT_NAME));
        let op = result
            .operations
            .iter()
            .find(|op| op.operation == OperationKind::Remove)
            .unwrap();
        assert_eq!(op.tag, tags::PATIENT_NAME);
        assert_eq!(op.original_value, "John Smith");
        assert!(op.new_value.is_none());
    }

    #[test]
    fn test_input_record_is_not_mutated() {
        let input = metadata();
        let result = engine("s")
            .apply(
                &input,
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();

        assert_eq!(input.get(&tags::PATIENT_NAME), Some("John Smith"));
        assert_eq!(result.original_metadata, input);
    }

    #[test]
    fn test_pseudonymize_dispatches_by_class() {
        let result = engine("s")
            .apply(
                &metadata(),
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();
        let output = &result.anonymized_metadata;

        let uid = output.get(&tags::STUDY_INSTANCE_UID).unwrap();
        assert!(uid.starts_with("2.25."));
        assert_eq!(uid.len(), "2.25.".len() + 16);

        let date = output.get(&tags::STUDY_DATE).unwrap();
        assert_eq!(date.len(), 8);
        assert!(date.bytes().all(|b| b.is_ascii_digit()));

        let time = output.get(&tags::STUDY_TIME).unwrap();
        assert_eq!(time.len(), 6);

        let id = output.get(&tags::PATIENT_ID).unwrap();
        assert!(id.starts_with("ANON_"));
    }

    #[test]
    fn test_absent_tags_produce_no_operations() {
        let mut record = MetadataRecord::new();
        record.insert(Tag::new(0x0008, 0x0060), "CT");

        let result = engine("s")
            .apply(
                &record,
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();
        assert!(result.operations.is_empty());
        assert!(result.validation.removed_tags.is_empty());
        assert!(result.validation.pseudonymized_tags.is_empty());
    }

    #[test]
    fn test_preserved_tag_survives_and_is_listed() {
        let result = engine("s")
            .apply(
                &metadata(),
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();

        assert_eq!(
            result.anonymized_metadata.get(&Tag::new(0x0008, 0x0060)),
            Some("CT")
        );
        assert_eq!(
            result.validation.preserved_tags,
            vec![Tag::new(0x0008, 0x0060)]
        );
        assert!(result.validation.is_clean());
    }

    #[test]
    fn test_same_input_same_salt_identical_output() {
        let e = engine("fixed-salt");
        let p = policy(ApprovalState::Approved);
        let a = e.apply(&metadata(), &p, EngineOptions::default()).unwrap();
        let b = e.apply(&metadata(), &p, EngineOptions::default()).unwrap();
        assert_eq!(a.anonymized_metadata, b.anonymized_metadata);
    }

    #[test]
    fn test_keyword_warning_on_residual_value() {
        let mut record = metadata();
        record.insert(Tag::new(0x0008, 0x0080), "St. Mary Hospital");

        let result = engine("s")
            .apply(
                &record,
                &policy(ApprovalState::Approved),
                EngineOptions::default(),
            )
            .unwrap();
        assert!(result.validation.is_clean());
        assert_eq!(result.validation.warnings.len(), 1);
    }
}
