//! Versioned anonymization policies and their approval lifecycle
//!
//! The policy store is the leaf component of the system: it holds the
//! policy set, enforces the lifecycle state machine, and persists every
//! mutation before reporting success. It has no dependency on the engine
//! or the audit chain; lifecycle transitions are handed back to the
//! orchestrator for auditing.

pub mod lifecycle;
pub mod model;
pub mod store;

pub use lifecycle::{can_transition, check_transition, StateTransition};
pub use model::{
    Approval, ApprovalRequest, ApprovalState, Policy, PolicyDefinition, PolicyFilter, TagRules,
};
pub use store::PolicyStore;
