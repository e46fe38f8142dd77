//! # scrub - Policy-driven PHI de-identification
//!
//! scrub removes or pseudonymizes protected health information in
//! DICOM-style metadata records under versioned, approval-gated policies,
//! and records every operation in a tamper-evident, hash-chained, signed
//! audit log.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **De-identifying** metadata records: remove, pseudonymize or preserve
//!   each tag according to the applied policy
//! - **Deriving** deterministic pseudonyms: the same input under the same
//!   salt always maps to the same replacement, so linked records stay linked
//! - **Governing** policies through a draft / approval / emergency-override
//!   lifecycle
//! - **Auditing** every operation in an append-only hash chain whose
//!   entries are individually signed
//!
//! ## Architecture
//!
//! scrub follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Orchestration (audited anonymization, health)
//! - [`anonymization`] - The de-identification engine and validators
//! - [`policy`] - Policy models, lifecycle and persistence
//! - [`audit`] - Hash-chained, signed audit log
//! - [`domain`] - Core domain types (tags, records, errors)
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrub::anonymization::{AnonymizationEngine, EngineOptions};
//! use scrub::config::secret_string;
//! use scrub::domain::{tags, MetadataRecord};
//!
//! # fn example(policy: scrub::policy::Policy) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AnonymizationEngine::new(secret_string("site-salt".into()), "2.25.")?;
//!
//! let mut record = MetadataRecord::new();
//! record.insert(tags::PATIENT_NAME, "John Smith");
//! record.insert(tags::STUDY_DATE, "20240115");
//!
//! let result = engine.apply(&record, &policy, EngineOptions::default())?;
//! assert!(result.validation.phi_removed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Determinism
//!
//! Pseudonyms are derived with a keyed hash over `(tag, value, salt)`.
//! Dates are shifted by a value-derived offset within ±365 days and times
//! within ±12 hours, so longitudinal ordering is approximately preserved
//! without revealing the original instant. Unparseable values degrade to
//! opaque markers instead of failing the record.
//!
//! ## Error Handling
//!
//! scrub uses the [`domain::ScrubError`] type for all errors:
//!
//! ```rust,no_run
//! use scrub::domain::ScrubError;
//!
//! fn example() -> Result<(), ScrubError> {
//!     let config = scrub::config::load_config("scrub.toml")?;
//!     let _ = config;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! scrub uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(policy = "standard", "Applying policy");
//! warn!(sequence = 42, "Audit append retried");
//! ```

pub mod anonymization;
pub mod audit;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod policy;
