//! Chain integrity verification
//!
//! Re-derives every entry's integrity hash, checks the `previous_hash`
//! linkage, and verifies each signature. Any single mismatch marks the
//! chain as tampered; gaps in sequence numbers inside the requested range
//! are reported as warnings.

use crate::audit::canonical::entry_integrity_hash;
use crate::audit::chain::AuditChain;
use crate::audit::entry::AuditEntry;
use crate::audit::signer::Signer;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry that failed verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainFailure {
    pub sequence_number: u64,
    pub reason: String,
}

/// Outcome of a verification pass over a range of the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerificationReport {
    pub verified_at: DateTime<Utc>,
    pub from_sequence: u64,
    pub to_sequence: u64,
    pub total_checked: usize,
    pub valid: usize,
    pub invalid: usize,
    pub chain_intact: bool,
    pub failures: Vec<ChainFailure>,
    pub warnings: Vec<String>,
}

impl ChainVerificationReport {
    /// Human-readable summary for CLI output
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("Audit Chain Verification\n");
        summary.push_str("========================\n");
        summary.push_str(&format!(
            "Verified at:   {}\n",
            self.verified_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        summary.push_str(&format!(
            "Range:         {} - {}\n",
            self.from_sequence, self.to_sequence
        ));
        summary.push_str(&format!("Total checked: {}\n", self.total_checked));
        summary.push_str(&format!("Valid:         {}\n", self.valid));
        summary.push_str(&format!("Invalid:       {}\n", self.invalid));
        summary.push_str(&format!(
            "Chain intact:  {}\n",
            if self.chain_intact { "YES" } else { "NO" }
        ));

        if !self.failures.is_empty() {
            summary.push_str("\nFailures:\n");
            for failure in &self.failures {
                summary.push_str(&format!(
                    "  #{}: {}\n",
                    failure.sequence_number, failure.reason
                ));
            }
        }
        if !self.warnings.is_empty() {
            summary.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                summary.push_str(&format!("  {warning}\n"));
            }
        }

        summary
    }
}

fn check_entry(
    entry: &AuditEntry,
    expected_previous: Option<&str>,
    signer: &dyn Signer,
) -> Vec<String> {
    let mut reasons = Vec::new();

    match entry_integrity_hash(entry) {
        Ok(recomputed) if recomputed == entry.integrity_hash => {}
        Ok(_) => reasons.push("integrity hash mismatch (content altered)".to_string()),
        Err(e) => reasons.push(format!("integrity hash could not be recomputed: {e}")),
    }

    if entry.previous_hash.as_deref() != expected_previous {
        reasons.push("previous hash does not match preceding entry".to_string());
    }

    match hex::decode(&entry.signature) {
        Ok(sig) if signer.verify(entry.integrity_hash.as_bytes(), &sig) => {}
        Ok(_) => reasons.push("signature verification failed".to_string()),
        Err(_) => reasons.push("signature is not valid hex".to_string()),
    }

    reasons
}

/// Verifies the entries of `chain` with sequence numbers in `[from, to]`
pub fn verify_range(chain: &AuditChain, from: u64, to: u64) -> Result<ChainVerificationReport> {
    let entries = chain.read_range(from, to)?;

    let mut report = ChainVerificationReport {
        verified_at: Utc::now(),
        from_sequence: from,
        to_sequence: to,
        total_checked: entries.len(),
        valid: 0,
        invalid: 0,
        chain_intact: true,
        failures: Vec::new(),
        warnings: Vec::new(),
    };

    if entries.is_empty() {
        report
            .warnings
            .push("no entries found in the requested range".to_string());
        return Ok(report);
    }

    // The first entry in range links to an entry outside the range (or to
    // nothing), so its previous_hash is taken at face value.
    let mut expected_previous = entries[0].previous_hash.clone();
    let mut previous_sequence: Option<u64> = None;

    for entry in &entries {
        if let Some(prev_seq) = previous_sequence {
            if entry.sequence_number != prev_seq + 1 {
                report.warnings.push(format!(
                    "sequence gap between #{prev_seq} and #{}",
                    entry.sequence_number
                ));
            }
        }

        let reasons = check_entry(entry, expected_previous.as_deref(), chain.signer());
        if reasons.is_empty() {
            report.valid += 1;
        } else {
            report.invalid += 1;
            report.chain_intact = false;
            for reason in reasons {
                report.failures.push(ChainFailure {
                    sequence_number: entry.sequence_number,
                    reason,
                });
            }
        }

        expected_previous = Some(entry.integrity_hash.clone());
        previous_sequence = Some(entry.sequence_number);
    }

    Ok(report)
}

/// Verifies the entire chain from its first entry to its head
pub async fn verify_all(chain: &AuditChain) -> Result<ChainVerificationReport> {
    let (head, _) = chain.head().await;
    verify_range(chain, 1, head.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::chain::RetryConfig;
    use crate::audit::entry::{AuditEvent, AuditEventType};
    use crate::audit::segment::SegmentStore;
    use crate::audit::signer::HmacSigner;
    use crate::config::secret_string;
    use serde_json::json;
    use tempfile::tempdir;

    fn chain(dir: &std::path::Path) -> AuditChain {
        let store = SegmentStore::new(dir, None).unwrap();
        let signer = Box::new(HmacSigner::new(secret_string("test-key".to_string())));
        AuditChain::open(store, signer, RetryConfig::default()).unwrap()
    }

    async fn populated_chain(dir: &std::path::Path, count: u64) -> AuditChain {
        let chain = chain(dir);
        for i in 1..=count {
            chain
                .append(AuditEvent::success(
                    AuditEventType::Anonymization,
                    format!("op-{i}"),
                    json!({"actor": "svc"}),
                ))
                .await
                .unwrap();
        }
        chain
    }

    #[tokio::test]
    async fn test_untampered_chain_verifies() {
        let dir = tempdir().unwrap();
        let chain = populated_chain(dir.path(), 10).await;

        let report = verify_all(&chain).await.unwrap();
        assert!(report.chain_intact);
        assert_eq!(report.total_checked, 10);
        assert_eq!(report.valid, 10);
        assert_eq!(report.invalid, 0);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_tampered_payload_detected() {
        let dir = tempdir().unwrap();
        let chain = populated_chain(dir.path(), 5).await;

        // Rewrite entry #3 with an altered payload
        let segment = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().starts_with("audit-"))
            .unwrap()
            .path();
        let tampered: String = std::fs::read_to_string(&segment)
            .unwrap()
            .lines()
            .map(|line| {
                let mut value: serde_json::Value = serde_json::from_str(line).unwrap();
                if value["sequence_number"] == 3 {
                    value["payload"]["actor"] = json!("intruder");
                }
                serde_json::to_string(&value).unwrap() + "\n"
            })
            .collect();
        std::fs::write(&segment, tampered).unwrap();

        let report = verify_all(&chain).await.unwrap();
        assert!(!report.chain_intact);
        assert_eq!(report.invalid, 1);
        assert!(report
            .failures
            .iter()
            .any(|f| f.sequence_number == 3 && f.reason.contains("integrity hash")));
    }

    #[tokio::test]
    async fn test_broken_linkage_detected() {
        let dir = tempdir().unwrap();
        let chain = populated_chain(dir.path(), 3).await;

        let segment = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().starts_with("audit-"))
            .unwrap()
            .path();
        // Drop entry #2 entirely
        let pruned: String = std::fs::read_to_string(&segment)
            .unwrap()
            .lines()
            .filter(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["sequence_number"] != 2
            })
            .map(|line| line.to_string() + "\n")
            .collect();
        std::fs::write(&segment, pruned).unwrap();

        let report = verify_all(&chain).await.unwrap();
        assert!(!report.chain_intact);
        assert!(report
            .failures
            .iter()
            .any(|f| f.sequence_number == 3 && f.reason.contains("previous hash")));
        assert!(report.warnings.iter().any(|w| w.contains("sequence gap")));
    }

    #[tokio::test]
    async fn test_range_verification() {
        let dir = tempdir().unwrap();
        let chain = populated_chain(dir.path(), 10).await;

        let report = verify_range(&chain, 4, 7).unwrap();
        assert!(report.chain_intact);
        assert_eq!(report.total_checked, 4);
    }

    #[tokio::test]
    async fn test_empty_range_warns() {
        let dir = tempdir().unwrap();
        let chain = chain(dir.path());

        let report = verify_range(&chain, 1, 10).unwrap();
        assert!(report.chain_intact);
        assert_eq!(report.total_checked, 0);
        assert!(!report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_summary_format() {
        let dir = tempdir().unwrap();
        let chain = populated_chain(dir.path(), 2).await;

        let report = verify_all(&chain).await.unwrap();
        let summary = report.format_summary();
        assert!(summary.contains("Chain intact:  YES"));
        assert!(summary.contains("Total checked: 2"));
    }
}
