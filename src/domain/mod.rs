//! Domain models and types for Scrub.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed metadata tags** ([`Tag`]) in the `(GGGG,EEEE)` form
//! - **Metadata records** ([`MetadataRecord`]) as flat `Tag -> value` maps
//! - **Caller context** ([`RequestContext`]) attached to auditable operations
//! - **Error types** ([`ScrubError`]) and the [`Result`] alias
//!
//! # Type Safety
//!
//! Tags are parsed once into a validated newtype, so a malformed identifier
//! cannot travel past the boundary:
//!
//! ```rust
//! use scrub::domain::Tag;
//! use std::str::FromStr;
//!
//! let tag = Tag::from_str("(0010,0010)").unwrap();
//! assert!(Tag::from_str("PatientName").is_err());
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]:
//!
//! ```rust
//! use scrub::domain::{Result, ScrubError};
//!
//! fn example(justification: &str) -> Result<()> {
//!     if justification.trim().is_empty() {
//!         return Err(ScrubError::Validation(
//!             "justification is required".to_string(),
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod errors;
pub mod metadata;
pub mod result;
pub mod tag;

// Re-export commonly used types for convenience
pub use context::RequestContext;
pub use errors::ScrubError;
pub use metadata::MetadataRecord;
pub use result::Result;
pub use tag::{tags, Tag};
