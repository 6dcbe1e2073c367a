use crate::types::{AccountId, PolicyId, PolicyState, RiskTier};
use thiserror::Error;

/// Reserve pool engine errors.
///
/// Every variant except `LedgerInconsistency` is a recoverable caller-facing
/// failure; `LedgerInconsistency` signals accounting drift and must surface
/// loudly instead of being clamped away.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool is paused, new policies cannot be issued")]
    PoolPaused,

    #[error("caller '{caller}' is not authorized for this operation")]
    Unauthorized { caller: AccountId },

    #[error("base rate must be a positive amount")]
    InvalidRate,

    #[error("duration {duration_secs}s outside admissible range (0, {max_secs}s]")]
    InvalidDuration { duration_secs: i64, max_secs: i64 },

    #[error("unrecognized {field} variant '{value}'")]
    InvalidEnum { field: &'static str, value: String },

    #[error("insufficient capacity in {tier} tier: requested {requested_minor}, available {available_minor}")]
    InsufficientCapacity {
        tier: RiskTier,
        requested_minor: u64,
        available_minor: u64,
    },

    #[error("amount arithmetic overflowed")]
    Overflow,

    #[error("policy {policy_id} already settled as {state}")]
    AlreadySettled {
        policy_id: PolicyId,
        state: PolicyState,
    },

    #[error("policy {policy_id} expired, claims are no longer accepted")]
    Expired { policy_id: PolicyId },

    #[error("trigger attestation rejected: {reason}")]
    TriggerRejected { reason: String },

    #[error("policy {policy_id} is not eligible for expiry yet")]
    NotEligible { policy_id: PolicyId },

    #[error("policy {policy_id} is not renewable")]
    NotRenewable { policy_id: PolicyId },

    #[error("no policy found for id {policy_id}")]
    PolicyNotFound { policy_id: PolicyId },

    #[error("ledger inconsistency in {tier} tier: {detail}")]
    LedgerInconsistency { tier: RiskTier, detail: String },
}

impl PoolError {
    pub(crate) fn ledger_underflow(
        tier: RiskTier,
        operation: &str,
        requested_minor: u64,
        reserved_minor: u64,
    ) -> Self {
        Self::LedgerInconsistency {
            tier,
            detail: format!(
                "{operation} of {requested_minor} exceeds reserved balance {reserved_minor}"
            ),
        }
    }
}
