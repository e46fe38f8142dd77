//! Append-only log segments and sidecar chain state
//!
//! Entries are stored one JSON object per line in day-partitioned segments
//! (`audit-YYYY-MM-DD.jsonl`). Chain order is carried by the sequence
//! numbers, so it is preserved across segment boundaries. A sidecar file
//! (`chain-state.json`) holds the writer's `sequence`/`last_hash` pointers
//! so they survive process restarts; if the sidecar is lost, the pointers
//! are recovered by scanning the segments so the chain never forks.

use crate::audit::cipher::{EncryptedEnvelope, EntryCipher};
use crate::audit::entry::AuditEntry;
use crate::domain::{Result, ScrubError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const SIDECAR_FILE: &str = "chain-state.json";

/// Persisted writer pointers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainState {
    /// Sequence number of the last entry written (0 = empty chain)
    pub sequence: u64,

    /// Integrity hash of the last entry written
    pub last_hash: Option<String>,
}

/// Day-partitioned JSONL storage for audit entries
pub struct SegmentStore {
    log_dir: PathBuf,
    cipher: Option<EntryCipher>,
}

impl SegmentStore {
    pub fn new(log_dir: impl AsRef<Path>, cipher: Option<EntryCipher>) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&log_dir).map_err(|e| {
            ScrubError::Io(format!(
                "Failed to create audit log directory {}: {e}",
                log_dir.display()
            ))
        })?;

        Ok(Self { log_dir, cipher })
    }

    fn segment_path(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.log_dir
            .join(format!("audit-{}.jsonl", timestamp.format("%Y-%m-%d")))
    }

    fn sidecar_path(&self) -> PathBuf {
        self.log_dir.join(SIDECAR_FILE)
    }

    /// Appends one entry to its day segment. All-or-nothing: the line is
    /// flushed and synced before this returns Ok.
    pub fn append_entry(&self, entry: &AuditEntry) -> Result<()> {
        let serialized = serde_json::to_string(entry)?;
        let line = match &self.cipher {
            Some(cipher) => {
                let envelope = cipher.encrypt(serialized.as_bytes())?;
                serde_json::to_string(&envelope)?
            }
            None => serialized,
        };

        let path = self.segment_path(&entry.timestamp);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ScrubError::Io(format!("Failed to open audit segment {}: {e}", path.display()))
            })?;

        writeln!(file, "{line}")
            .map_err(|e| ScrubError::Io(format!("Failed to write audit entry: {e}")))?;
        file.sync_all()
            .map_err(|e| ScrubError::Io(format!("Failed to sync audit segment: {e}")))?;

        Ok(())
    }

    /// Reads every entry across all segments, ordered by sequence number
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        let mut segment_paths: Vec<PathBuf> = std::fs::read_dir(&self.log_dir)
            .map_err(|e| {
                ScrubError::Io(format!(
                    "Failed to read audit log directory {}: {e}",
                    self.log_dir.display()
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("audit-") && n.ends_with(".jsonl"))
                    .unwrap_or(false)
            })
            .collect();
        segment_paths.sort();

        let mut entries = Vec::new();
        for path in segment_paths {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                ScrubError::Io(format!("Failed to read audit segment {}: {e}", path.display()))
            })?;
            for line in contents.lines().filter(|l| !l.trim().is_empty()) {
                entries.push(self.parse_line(line)?);
            }
        }

        entries.sort_by_key(|e| e.sequence_number);
        Ok(entries)
    }

    /// Reads entries with `from <= sequence_number <= to`
    pub fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.sequence_number >= from && e.sequence_number <= to)
            .collect())
    }

    fn parse_line(&self, line: &str) -> Result<AuditEntry> {
        let value: serde_json::Value = serde_json::from_str(line)?;

        let is_envelope = value
            .get("encrypted")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !is_envelope {
            return Ok(serde_json::from_value(value)?);
        }

        let cipher = self.cipher.as_ref().ok_or_else(|| {
            ScrubError::Crypto(
                "audit segment contains encrypted records but no encryption key is configured"
                    .to_string(),
            )
        })?;
        let envelope: EncryptedEnvelope = serde_json::from_value(value)?;
        let plaintext = cipher.decrypt(&envelope)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Loads the sidecar state, recovering from the segments if the
    /// sidecar is missing
    pub fn load_state(&self) -> Result<ChainState> {
        let path = self.sidecar_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                ScrubError::Io(format!("Failed to read chain state {}: {e}", path.display()))
            })?;
            return Ok(serde_json::from_str(&contents)?);
        }

        // Sidecar lost or first start: recover pointers from the log itself
        let entries = self.read_all()?;
        match entries.last() {
            Some(last) => {
                tracing::warn!(
                    sequence = last.sequence_number,
                    "Chain state sidecar missing, recovered pointers from segments"
                );
                Ok(ChainState {
                    sequence: last.sequence_number,
                    last_hash: Some(last.integrity_hash.clone()),
                })
            }
            None => Ok(ChainState::default()),
        }
    }

    /// Persists the sidecar state
    pub fn save_state(&self, state: &ChainState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(self.sidecar_path(), contents)
            .map_err(|e| ScrubError::Io(format!("Failed to write chain state: {e}")))
    }
}
