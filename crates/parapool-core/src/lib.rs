//! Parametric-insurance reserve pool engine.
//!
//! This crate keeps risk-tier capital solvent under concurrent underwriting
//! and settlement: per-tier ledger accounting with exact conservation, a
//! deterministic underwriting quote, an exactly-once policy settlement state
//! machine, and a governance-gated pool controller composing them.

#![deny(unsafe_code)]

pub mod clock;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod oracle;
pub mod pool;
pub mod types;
pub mod underwriting;

pub use clock::{Clock, SystemClock};
pub use error::PoolError;
pub use events::{EventLog, EventRecord, PoolEvent};
pub use ledger::RiskLedger;
pub use lifecycle::{PolicyBook, PolicyRecord, Settlement};
pub use oracle::{Attestation, ClaimProof, TriggerOracle, FULL_SEVERITY_BPS};
pub use pool::{PoolConfig, ReservePool, SettlementOutcome};
pub use types::{
    AccountId, CoverageLevel, Policy, PolicyId, PolicyState, PolicyType, PoolStats,
    PurchaseRequest, RiskTier, TierBalances,
};
pub use underwriting::{Quote, Underwriter, UnderwritingConfig};
