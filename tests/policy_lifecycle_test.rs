//! Policy lifecycle tests: approval gating, emergency activation and the
//! audit trail of every transition

use scrub::anonymization::{AnonymizationEngine, EngineOptions};
use scrub::audit::{
    AuditChain, AuditEventType, AuditResult, HmacSigner, RetryConfig, SearchCriteria,
    SegmentStore,
};
use scrub::config::secret_string;
use scrub::core::Orchestrator;
use scrub::domain::{tags, MetadataRecord, RequestContext, ScrubError};
use scrub::policy::{ApprovalState, PolicyDefinition, PolicyFilter, PolicyStore, TagRules};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::tempdir;

fn orchestrator(dir: &std::path::Path) -> Orchestrator {
    let store = Arc::new(PolicyStore::open(dir.join("policies.json")).unwrap());
    let engine =
        AnonymizationEngine::new(secret_string("test-salt".to_string()), "2.25.").unwrap();
    let segments = SegmentStore::new(dir.join("audit"), None).unwrap();
    let signer = Box::new(HmacSigner::new(secret_string("test-key".to_string())));
    let chain = Arc::new(AuditChain::open(segments, signer, RetryConfig::default()).unwrap());
    Orchestrator::new(store, engine, chain).unwrap()
}

fn definition(name: &str) -> PolicyDefinition {
    let mut remove = BTreeSet::new();
    remove.insert(tags::PATIENT_NAME);

    PolicyDefinition {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        description: "lifecycle test policy".to_string(),
        tag_rules: TagRules {
            remove,
            pseudonymize: BTreeSet::new(),
            preserve: BTreeSet::new(),
        },
        tags: BTreeSet::new(),
    }
}

fn record() -> MetadataRecord {
    let mut record = MetadataRecord::new();
    record.insert(tags::PATIENT_NAME, "John Smith");
    record
}

#[tokio::test]
async fn test_pending_policy_rejected_and_failure_audited() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
    orch.submit_for_approval(policy.id, &ctx).await.unwrap();

    // Pending policy is not usable with default options; the error names
    // the approval problem, not a missing policy
    let result = orch
        .anonymize("standard", &record(), &ctx, EngineOptions::default())
        .await;
    assert!(matches!(result, Err(ScrubError::PolicyNotApproved(_))));

    // Exactly one failure entry in the audit log
    let failures = orch
        .search_audit(&SearchCriteria {
            result: Some(AuditResult::Failure),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event_type, AuditEventType::Anonymization);
}

#[tokio::test]
async fn test_pending_policy_usable_with_allow_unapproved() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
    orch.submit_for_approval(policy.id, &ctx).await.unwrap();

    let outcome = orch
        .anonymize(
            "standard",
            &record(),
            &ctx,
            EngineOptions {
                allow_unapproved: true,
            },
        )
        .await
        .unwrap();
    // Still fully validated
    assert!(outcome.result.validation.phi_removed);
}

#[tokio::test]
async fn test_emergency_activation_justification() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");
    let oncall = RequestContext::new("oncall");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();

    // Missing justification is a validation error
    let denied = orch.emergency_activate(policy.id, &oncall, "").await;
    assert!(matches!(denied, Err(ScrubError::Validation(_))));

    let activated = orch
        .emergency_activate(policy.id, &oncall, "approver unreachable during incident")
        .await
        .unwrap();
    assert_eq!(activated.approval.state, ApprovalState::EmergencyActive);

    // One successful audit entry carries the justification
    let entries = orch
        .search_audit(&SearchCriteria {
            event_type: Some(AuditEventType::PolicyLifecycle),
            result: Some(AuditResult::Success),
            ..Default::default()
        })
        .unwrap();
    let activation: Vec<_> = entries
        .iter()
        .filter(|e| e.action == "policy-emergency-activate")
        .collect();
    assert_eq!(activation.len(), 1);
    assert_eq!(
        activation[0].payload["reason"],
        "approver unreachable during incident"
    );
}

#[tokio::test]
async fn test_full_lifecycle_transitions_audited_in_order() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");
    let reviewer = RequestContext::new("bob");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
    let request = orch.submit_for_approval(policy.id, &ctx).await.unwrap();
    orch.approve_policy(request.id, &reviewer, Some("ok".to_string()))
        .await
        .unwrap();
    orch.rollback_policy(policy.id, &reviewer, Some("superseded".to_string()))
        .await
        .unwrap();

    let entries = orch
        .search_audit(&SearchCriteria {
            event_type: Some(AuditEventType::PolicyLifecycle),
            ..Default::default()
        })
        .unwrap();
    let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "policy-create",
            "policy-submit",
            "policy-approve",
            "policy-rollback"
        ]
    );

    // Sequence numbers are dense and ordered
    for window in entries.windows(2) {
        assert_eq!(window[1].sequence_number, window[0].sequence_number + 1);
    }
}

#[tokio::test]
async fn test_rolled_back_policy_is_terminal() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
    orch.emergency_activate(policy.id, &ctx, "incident").await.unwrap();
    orch.rollback_policy(policy.id, &ctx, None).await.unwrap();

    // No transition leaves rolled-back, not even another emergency
    let result = orch.emergency_activate(policy.id, &ctx, "again").await;
    assert!(matches!(
        result,
        Err(ScrubError::InvalidStateTransition { .. })
    ));

    let rolled_back = orch
        .list_policies(&PolicyFilter {
            state: Some(ApprovalState::RolledBack),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rolled_back.len(), 1);
}

#[tokio::test]
async fn test_rejected_policy_not_usable() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let ctx = RequestContext::new("alice");

    let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
    let request = orch.submit_for_approval(policy.id, &ctx).await.unwrap();
    orch.reject_policy(request.id, &RequestContext::new("bob"), None)
        .await
        .unwrap();

    let result = orch
        .anonymize("standard", &record(), &ctx, EngineOptions::default())
        .await;
    assert!(matches!(result, Err(ScrubError::PolicyNotApproved(_))));
}

#[tokio::test]
async fn test_lifecycle_survives_restart() {
    let dir = tempdir().unwrap();
    let policy_id;
    {
        let orch = orchestrator(dir.path());
        let ctx = RequestContext::new("alice");
        let policy = orch.create_policy(definition("standard"), &ctx).await.unwrap();
        policy_id = policy.id;
        orch.emergency_activate(policy.id, &ctx, "incident").await.unwrap();
    }

    // Reopen everything from disk
    let orch = orchestrator(dir.path());
    let policies = orch.list_policies(&PolicyFilter::default()).unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].id, policy_id);
    assert_eq!(policies[0].approval.state, ApprovalState::EmergencyActive);

    // Snapshot was rebuilt, the policy is immediately usable
    let outcome = orch
        .anonymize(
            "standard",
            &record(),
            &RequestContext::new("svc"),
            EngineOptions::default(),
        )
        .await
        .unwrap();
    assert!(outcome.result.validation.phi_removed);
}
