//! Policy-driven de-identification of metadata records
//!
//! The engine is a pure function over a policy and a metadata record:
//! remove-listed tags are deleted, pseudonymize-listed tags are replaced by
//! deterministic salt-keyed pseudonyms dispatched on a closed [`TagClass`],
//! and the output is validated against the policy before it is returned.
//!
//! All state the engine carries (salt, UID root, compiled classification
//! tables) is immutable, so it is safe to share across concurrent callers.

pub mod classify;
pub mod engine;
pub mod models;
pub mod pseudonym;
pub mod validation;

pub use classify::{classify, CompiledPolicy, TagClass};
pub use engine::{AnonymizationEngine, EngineOptions};
pub use models::{
    AnonymizationOperation, AnonymizationResult, AppliedPolicy, OperationKind, ValidationOutcome,
};
pub use pseudonym::Pseudonymizer;
pub use validation::Validator;
