//! Core service logic.
//!
//! This module contains the orchestration layer that ties the policy
//! store, the anonymization engine and the audit chain together.
//!
//! # Modules
//!
//! - [`orchestrator`] - Audited anonymization and policy lifecycle coordination
//! - [`health`] - Service health reporting
//!
//! # Request Workflow
//!
//! The typical anonymization workflow:
//!
//! 1. **Resolve Policy**: Look up the named policy in the active snapshot
//! 2. **Apply**: Run the engine over the metadata record
//! 3. **Validate**: Check that every targeted tag was handled
//! 4. **Audit**: Append the outcome (success or failure) to the chain
//!
//! # Example
//!
//! ```rust,no_run
//! use scrub::anonymization::{AnonymizationEngine, EngineOptions};
//! use scrub::audit::{AuditChain, RetryConfig, SegmentStore, HmacSigner};
//! use scrub::config::secret_string;
//! use scrub::core::orchestrator::Orchestrator;
//! use scrub::domain::{MetadataRecord, RequestContext};
//! use scrub::policy::PolicyStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(PolicyStore::open("policies.json")?);
//! let engine = AnonymizationEngine::new(secret_string("salt".into()), "2.25.")?;
//! let segments = SegmentStore::new("audit", None)?;
//! let signer = Box::new(HmacSigner::new(secret_string("key".into())));
//! let chain = Arc::new(AuditChain::open(segments, signer, RetryConfig::default())?);
//!
//! let orchestrator = Orchestrator::new(store, engine, chain)?;
//! let outcome = orchestrator
//!     .anonymize(
//!         "standard",
//!         &MetadataRecord::new(),
//!         &RequestContext::new("svc"),
//!         EngineOptions::default(),
//!     )
//!     .await?;
//! println!("Audit sequence: {}", outcome.audit_sequence);
//! # Ok(())
//! # }
//! ```

pub mod health;
pub mod orchestrator;

pub use health::{ComponentHealth, HealthReport, HealthStatus};
pub use orchestrator::{AnonymizationOutcome, Orchestrator};
