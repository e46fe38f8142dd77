//! Tamper-evident audit logging
//!
//! Every significant operation is recorded as an entry in a hash chain:
//! each entry carries a SHA-256 integrity hash over its own canonical
//! content (including the previous entry's hash) and a signature over
//! that hash. Altering, reordering, or removing any historical entry is
//! detectable by re-walking the chain.

pub mod canonical;
pub mod chain;
pub mod cipher;
pub mod entry;
pub mod segment;
pub mod signer;
pub mod verify;

pub use canonical::{canonical_hash, entry_integrity_hash};
pub use chain::{AuditChain, RetryConfig, SearchCriteria};
pub use cipher::{EncryptedEnvelope, EntryCipher};
pub use entry::{AuditEntry, AuditEvent, AuditEventType, AuditResult};
pub use segment::{ChainState, SegmentStore};
pub use signer::{build_signer, Ed25519Signer, HmacSigner, Signer};
pub use verify::{verify_all, verify_range, ChainFailure, ChainVerificationReport};
