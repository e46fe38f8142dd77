//! Audit entry and event models
//!
//! An [`AuditEvent`] is what a subsystem hands to the chain; an
//! [`AuditEntry`] is the immutable, hash-linked, signed record the chain
//! produces from it. Ordering by `sequence_number` is total and is the
//! entry's primary identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of the audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditEventType {
    /// A metadata record was (or failed to be) de-identified
    Anonymization,
    /// A policy lifecycle transition
    PolicyLifecycle,
    /// Chain or service level events (startup, verification runs)
    System,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::Anonymization => "anonymization",
            AuditEventType::PolicyLifecycle => "policy-lifecycle",
            AuditEventType::System => "system",
        }
    }
}

/// Outcome of the audited operation
///
/// The chain records failures as faithfully as successes, so misuse and
/// misconfiguration attempts are themselves discoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Failure,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Failure => "failure",
        }
    }
}

/// Event handed to the chain by an auditable subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub action: String,
    pub result: AuditResult,

    /// Event-specific details; flat fields (`actor`, `policy_name`, ...)
    /// keep the log searchable
    pub payload: serde_json::Value,
}

impl AuditEvent {
    pub fn success(
        event_type: AuditEventType,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            action: action.into(),
            result: AuditResult::Success,
            payload,
        }
    }

    pub fn failure(
        event_type: AuditEventType,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            action: action.into(),
            result: AuditResult::Failure,
            payload,
        }
    }
}

/// One immutable, signed record in the hash chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Strictly increasing, no gaps within one chain
    pub sequence_number: u64,

    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub action: String,
    pub result: AuditResult,
    pub payload: serde_json::Value,

    /// Integrity hash of the preceding entry; `None` only for the first
    /// entry ever written
    pub previous_hash: Option<String>,

    /// SHA-256 over the canonical serialization of all fields above
    pub integrity_hash: String,

    /// Hex-encoded signature over the integrity hash
    pub signature: String,
}
