use crate::types::PolicyType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full severity in basis points. Attested severities are clamped here, which
/// is what caps every claim payout at the policy's reserved amount.
pub const FULL_SEVERITY_BPS: u16 = 10_000;

/// Claim proof handed to the trigger oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimProof {
    /// External reference for the claimed event, e.g. a flight number and date.
    pub reference: String,
    /// Opaque evidence payload the oracle understands.
    pub evidence: Value,
}

impl ClaimProof {
    pub fn new(reference: impl Into<String>, evidence: Value) -> Self {
        Self {
            reference: reference.into(),
            evidence,
        }
    }
}

/// Oracle answer for a claim trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Attestation {
    /// The parametric condition occurred with the given severity, expressed
    /// in basis points of the policy's reserved amount.
    Attested { severity_bps: u16 },
    NotAttested { reason: String },
}

/// External trigger-attestation collaborator.
///
/// The engine treats this as a single synchronous answer; retry and backoff
/// toward the real oracle belong to the integration layer.
pub trait TriggerOracle: Send + Sync {
    fn attest(&self, policy_type: PolicyType, proof: &ClaimProof) -> Attestation;
}
