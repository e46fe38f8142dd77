//! Policy lifecycle state machine
//!
//! Allowed transitions:
//!
//! ```text
//! draft -> pending-approval -> approved | rejected
//! approved | emergency-active -> rolled-back
//! any non-terminal state -> emergency-active
//! ```
//!
//! `rolled-back` is terminal. A rolled-back policy can never be reactivated;
//! a new version must be created instead.

use crate::domain::{Result, ScrubError};
use crate::policy::model::ApprovalState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one lifecycle transition, used as the audit payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub policy_id: Uuid,
    pub policy_name: String,
    pub from: ApprovalState,
    pub to: ApprovalState,
    pub actor: String,
    pub at: DateTime<Utc>,

    /// Approval comments, rollback reason, or emergency justification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Returns true if `from -> to` is an allowed lifecycle transition
pub fn can_transition(from: ApprovalState, to: ApprovalState) -> bool {
    use ApprovalState::*;

    match (from, to) {
        (Draft, PendingApproval) => true,
        (PendingApproval, Approved) => true,
        (PendingApproval, Rejected) => true,
        (Approved, RolledBack) => true,
        (EmergencyActive, RolledBack) => true,
        // Emergency activation bypasses pending-approval from any
        // non-terminal state
        (from, EmergencyActive) => !from.is_terminal() && from != EmergencyActive,
        _ => false,
    }
}

/// Checks a transition, producing the domain error on violation
pub fn check_transition(from: ApprovalState, to: ApprovalState) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(ScrubError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use ApprovalState::*;

    #[test_case(Draft, PendingApproval, true)]
    #[test_case(PendingApproval, Approved, true)]
    #[test_case(PendingApproval, Rejected, true)]
    #[test_case(Approved, RolledBack, true)]
    #[test_case(EmergencyActive, RolledBack, true)]
    #[test_case(Draft, EmergencyActive, true)]
    #[test_case(PendingApproval, EmergencyActive, true)]
    #[test_case(Rejected, EmergencyActive, true)]
    #[test_case(Approved, EmergencyActive, true)]
    #[test_case(Draft, Approved, false ; "approval requires submission first")]
    #[test_case(Rejected, Approved, false)]
    #[test_case(Draft, RolledBack, false)]
    #[test_case(RolledBack, EmergencyActive, false ; "rolled back is terminal")]
    #[test_case(RolledBack, Approved, false)]
    #[test_case(EmergencyActive, EmergencyActive, false)]
    #[test_case(Approved, Approved, false)]
    fn test_transition_matrix(from: ApprovalState, to: ApprovalState, allowed: bool) {
        assert_eq!(can_transition(from, to), allowed);
    }

    #[test]
    fn test_check_transition_error_names_states() {
        let err = check_transition(RolledBack, Approved).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid policy state transition: rolled-back -> approved"
        );
    }
}
