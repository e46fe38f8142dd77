//! Caller context attached to auditable operations
//!
//! Every orchestrated operation carries the identity of the actor who
//! requested it plus correlation details, so audit entries can answer
//! "who did what, from where" without consulting any other system.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context describing the caller of an auditable operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Identity of the actor performing the operation
    pub actor: String,

    /// Correlation id linking related operations across systems
    pub correlation_id: String,

    /// Source system the request originated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
}

impl RequestContext {
    /// Creates a context with a freshly generated correlation id
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            correlation_id: Uuid::new_v4().to_string(),
            source_system: None,
        }
    }

    /// Sets the correlation id
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Sets the source system
    pub fn with_source_system(mut self, source_system: impl Into<String>) -> Self {
        self.source_system = Some(source_system.into());
        self
    }
}
