//! Hash-chained, signed audit log writer
//!
//! All writes funnel through a single mutex-guarded writer state, so
//! sequence numbers are dense and the chain never forks under concurrent
//! appends. The in-memory pointers advance only after the entry and the
//! sidecar are durably on disk.

use crate::audit::canonical::entry_integrity_hash;
use crate::audit::entry::{AuditEntry, AuditEvent, AuditEventType, AuditResult};
use crate::audit::segment::{ChainState, SegmentStore};
use crate::audit::signer::Signer;
use crate::domain::{Result, ScrubError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Mutex;

/// Retry behavior for transient append failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// Search criteria for reading the chain back
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub event_type: Option<AuditEventType>,
    pub result: Option<AuditResult>,
    pub actor: Option<String>,
    pub policy_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl SearchCriteria {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(event_type) = self.event_type {
            if entry.event_type != event_type {
                return false;
            }
        }
        if let Some(result) = self.result {
            if entry.result != result {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if entry.payload.get("actor").and_then(|v| v.as_str()) != Some(actor.as_str()) {
                return false;
            }
        }
        if let Some(policy_name) = &self.policy_name {
            if entry.payload.get("policy_name").and_then(|v| v.as_str())
                != Some(policy_name.as_str())
            {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }
}

struct WriterState {
    sequence: u64,
    last_hash: Option<String>,
}

/// Tamper-evident audit log
pub struct AuditChain {
    store: SegmentStore,
    signer: Box<dyn Signer>,
    retry: RetryConfig,
    state: Mutex<WriterState>,
}

impl AuditChain {
    /// Opens the chain, hydrating the writer pointers from disk
    pub fn open(store: SegmentStore, signer: Box<dyn Signer>, retry: RetryConfig) -> Result<Self> {
        let state = store.load_state()?;
        tracing::info!(
            sequence = state.sequence,
            algorithm = signer.algorithm(),
            "Audit chain opened"
        );

        Ok(Self {
            store,
            signer,
            retry,
            state: Mutex::new(WriterState {
                sequence: state.sequence,
                last_hash: state.last_hash,
            }),
        })
    }

    /// Appends one event as a hash-linked, signed entry
    ///
    /// Returns the sequence number assigned to the entry. Failures after
    /// retries are fatal to the caller: an unauditable operation must not
    /// look like it succeeded.
    pub async fn append(&self, event: AuditEvent) -> Result<u64> {
        let mut state = self.state.lock().await;

        let mut entry = AuditEntry {
            sequence_number: state.sequence + 1,
            timestamp: Utc::now(),
            event_type: event.event_type,
            action: event.action,
            result: event.result,
            payload: event.payload,
            previous_hash: state.last_hash.clone(),
            integrity_hash: String::new(),
            signature: String::new(),
        };

        entry.integrity_hash = entry_integrity_hash(&entry)?;
        entry.signature = hex::encode(self.signer.sign(entry.integrity_hash.as_bytes()));

        self.write_with_retry(&entry).await?;

        self.store.save_state(&ChainState {
            sequence: entry.sequence_number,
            last_hash: Some(entry.integrity_hash.clone()),
        })?;

        // Pointers advance only after the entry is durable
        state.sequence = entry.sequence_number;
        state.last_hash = Some(entry.integrity_hash);

        Ok(state.sequence)
    }

    async fn write_with_retry(&self, entry: &AuditEntry) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.store.append_entry(entry) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        sequence = entry.sequence_number,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Audit append failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ScrubError::AuditWrite(format!(
                        "Failed to append audit entry {} after {} retries: {e}",
                        entry.sequence_number, self.retry.max_retries
                    )));
                }
            }
        }
    }

    /// Current chain head: (sequence, last integrity hash)
    pub async fn head(&self) -> (u64, Option<String>) {
        let state = self.state.lock().await;
        (state.sequence, state.last_hash.clone())
    }

    /// Reads entries matching the criteria, in chain order
    pub fn search(&self, criteria: &SearchCriteria) -> Result<Vec<AuditEntry>> {
        let mut matched: Vec<AuditEntry> = self
            .store
            .read_all()?
            .into_iter()
            .filter(|e| criteria.matches(e))
            .collect();

        if let Some(limit) = criteria.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    /// Reads entries with sequence numbers in `[from, to]`
    pub fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>> {
        self.store.read_range(from, to)
    }

    /// Reads the full chain in order
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        self.store.read_all()
    }

    pub(crate) fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
}
