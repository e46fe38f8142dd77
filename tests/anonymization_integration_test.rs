//! End-to-end anonymization tests through the orchestrator

use chrono::NaiveDate;
use scrub::anonymization::{AnonymizationEngine, EngineOptions};
use scrub::audit::{AuditChain, HmacSigner, RetryConfig, SegmentStore};
use scrub::config::secret_string;
use scrub::core::Orchestrator;
use scrub::domain::{tags, MetadataRecord, RequestContext, Tag};
use scrub::policy::{PolicyDefinition, PolicyStore, TagRules};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::tempdir;

fn orchestrator(dir: &std::path::Path, salt: &str) -> Orchestrator {
    let store = Arc::new(PolicyStore::open(dir.join("policies.json")).unwrap());
    let engine = AnonymizationEngine::new(secret_string(salt.to_string()), "2.25.").unwrap();
    let segments = SegmentStore::new(dir.join("audit"), None).unwrap();
    let signer = Box::new(HmacSigner::new(secret_string("test-key".to_string())));
    let chain = Arc::new(AuditChain::open(segments, signer, RetryConfig::default()).unwrap());
    Orchestrator::new(store, engine, chain).unwrap()
}

fn standard_definition() -> PolicyDefinition {
    let mut remove = BTreeSet::new();
    remove.insert(tags::PATIENT_NAME);
    let mut pseudonymize = BTreeSet::new();
    pseudonymize.insert(tags::STUDY_INSTANCE_UID);
    pseudonymize.insert(tags::STUDY_DATE);
    pseudonymize.insert(tags::STUDY_TIME);
    pseudonymize.insert(tags::PATIENT_ID);
    let mut preserve = BTreeSet::new();
    preserve.insert(Tag::from_str("(0008,0060)").unwrap());

    PolicyDefinition {
        name: "standard".to_string(),
        version: "1.0.0".to_string(),
        description: "integration test policy".to_string(),
        tag_rules: TagRules {
            remove,
            pseudonymize,
            preserve,
        },
        tags: BTreeSet::new(),
    }
}

async fn activate_standard(orch: &Orchestrator) {
    let ctx = RequestContext::new("alice");
    let policy = orch.create_policy(standard_definition(), &ctx).await.unwrap();
    orch.emergency_activate(policy.id, &RequestContext::new("oncall"), "test setup")
        .await
        .unwrap();
}

fn input_record() -> MetadataRecord {
    let mut record = MetadataRecord::new();
    record.insert(tags::PATIENT_NAME, "John Smith");
    record.insert(tags::PATIENT_ID, "MRN-0042");
    record.insert(tags::STUDY_INSTANCE_UID, "1.2.3.999");
    record.insert(tags::STUDY_DATE, "20240115");
    record.insert(tags::STUDY_TIME, "235000");
    record.insert(Tag::from_str("(0008,0060)").unwrap(), "CT");
    record
}

#[tokio::test]
async fn test_remove_and_pseudonymize_end_to_end() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;
    let ctx = RequestContext::new("svc");

    let outcome = orch
        .anonymize("standard", &input_record(), &ctx, EngineOptions::default())
        .await
        .unwrap();
    let output = outcome.result.anonymized_metadata.clone();

    // Removed tag is gone
    assert!(!output.contains(&tags::PATIENT_NAME));

    // Identifier becomes root + 16 hex chars
    let uid = output.get(&tags::STUDY_INSTANCE_UID).unwrap();
    assert!(uid.starts_with("2.25."));
    let suffix = &uid["2.25.".len()..];
    assert_eq!(suffix.len(), 16);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

    // Preserved tag is unchanged
    assert_eq!(output.get(&Tag::from_str("(0008,0060)").unwrap()), Some("CT"));

    // Repeating the call with the same salt yields the identical output
    let again = orch
        .anonymize("standard", &input_record(), &ctx, EngineOptions::default())
        .await
        .unwrap();
    assert_eq!(output, again.result.anonymized_metadata);
}

#[tokio::test]
async fn test_date_shift_stays_within_one_year() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;

    let outcome = orch
        .anonymize(
            "standard",
            &input_record(),
            &RequestContext::new("svc"),
            EngineOptions::default(),
        )
        .await
        .unwrap();

    let shifted = outcome
        .result
        .anonymized_metadata
        .get(&tags::STUDY_DATE)
        .unwrap();
    assert_ne!(shifted, "20240115");

    let original = NaiveDate::parse_from_str("20240115", "%Y%m%d").unwrap();
    let shifted = NaiveDate::parse_from_str(shifted, "%Y%m%d").unwrap();
    let delta = (shifted - original).num_days().abs();
    assert!(delta <= 365, "date shifted by {delta} days");
}

#[tokio::test]
async fn test_time_shift_stays_within_twelve_hours() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;

    let outcome = orch
        .anonymize(
            "standard",
            &input_record(),
            &RequestContext::new("svc"),
            EngineOptions::default(),
        )
        .await
        .unwrap();

    let shifted = outcome
        .result
        .anonymized_metadata
        .get(&tags::STUDY_TIME)
        .unwrap()
        .to_string();
    assert_eq!(shifted.len(), 6);

    let seconds_of = |s: &str| -> i64 {
        let h: i64 = s[0..2].parse().unwrap();
        let m: i64 = s[2..4].parse().unwrap();
        let sec: i64 = s[4..6].parse().unwrap();
        h * 3600 + m * 60 + sec
    };
    let original = seconds_of("235000");
    let new = seconds_of(&shifted);

    // Circular distance on the 24h clock
    let raw = (new - original).rem_euclid(86_400);
    let distance = raw.min(86_400 - raw);
    assert!(distance <= 43_200, "time shifted by {distance} seconds");
}

#[tokio::test]
async fn test_unparseable_values_degrade_to_markers() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;

    let mut record = input_record();
    record.insert(tags::STUDY_DATE, "not-a-date");
    record.insert(tags::STUDY_TIME, "25:99");

    let outcome = orch
        .anonymize(
            "standard",
            &record,
            &RequestContext::new("svc"),
            EngineOptions::default(),
        )
        .await
        .unwrap();
    let output = &outcome.result.anonymized_metadata;

    // Bad inputs never abort the record; they become opaque markers
    assert!(output.get(&tags::STUDY_DATE).unwrap().starts_with("ANON_DATE_"));
    assert!(output.get(&tags::STUDY_TIME).unwrap().starts_with("ANON_TIME_"));
    assert!(!output.contains(&tags::PATIENT_NAME));
}

#[tokio::test]
async fn test_different_salts_diverge() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let orch_a = orchestrator(dir_a.path(), "salt-a");
    let orch_b = orchestrator(dir_b.path(), "salt-b");
    activate_standard(&orch_a).await;
    activate_standard(&orch_b).await;
    let ctx = RequestContext::new("svc");

    let a = orch_a
        .anonymize("standard", &input_record(), &ctx, EngineOptions::default())
        .await
        .unwrap();
    let b = orch_b
        .anonymize("standard", &input_record(), &ctx, EngineOptions::default())
        .await
        .unwrap();

    assert_ne!(
        a.result.anonymized_metadata.get(&tags::STUDY_INSTANCE_UID),
        b.result.anonymized_metadata.get(&tags::STUDY_INSTANCE_UID)
    );
}

#[tokio::test]
async fn test_referential_consistency_across_records() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;
    let ctx = RequestContext::new("svc");

    // Two studies of the same patient share the patient id
    let mut first = input_record();
    first.insert(tags::STUDY_INSTANCE_UID, "1.2.3.111");
    let mut second = input_record();
    second.insert(tags::STUDY_INSTANCE_UID, "1.2.3.222");

    let a = orch
        .anonymize("standard", &first, &ctx, EngineOptions::default())
        .await
        .unwrap();
    let b = orch
        .anonymize("standard", &second, &ctx, EngineOptions::default())
        .await
        .unwrap();

    // Same patient id maps to the same pseudonym in both records
    assert_eq!(
        a.result.anonymized_metadata.get(&tags::PATIENT_ID),
        b.result.anonymized_metadata.get(&tags::PATIENT_ID)
    );
    // Different study identifiers stay distinct
    assert_ne!(
        a.result.anonymized_metadata.get(&tags::STUDY_INSTANCE_UID),
        b.result.anonymized_metadata.get(&tags::STUDY_INSTANCE_UID)
    );
}

#[tokio::test]
async fn test_validation_outcome_reports_all_buckets() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path(), "site-salt");
    activate_standard(&orch).await;

    let outcome = orch
        .anonymize(
            "standard",
            &input_record(),
            &RequestContext::new("svc"),
            EngineOptions::default(),
        )
        .await
        .unwrap();
    let validation = &outcome.result.validation;

    assert!(validation.phi_removed);
    assert!(validation.errors.is_empty());
    assert_eq!(validation.removed_tags, vec![tags::PATIENT_NAME]);
    assert_eq!(validation.pseudonymized_tags.len(), 4);
    assert_eq!(
        validation.preserved_tags,
        vec![Tag::from_str("(0008,0060)").unwrap()]
    );
}
