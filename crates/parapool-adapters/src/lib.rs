//! Deterministic collaborator adapters for the reserve pool.
//!
//! These stand in for the real clock and trigger-oracle integrations during
//! tests and local simulation.

#![deny(unsafe_code)]

use chrono::{DateTime, Duration, Utc};
use parapool_core::clock::Clock;
use parapool_core::oracle::{Attestation, ClaimProof, TriggerOracle};
use parapool_core::types::PolicyType;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Manually driven clock for expiry and claim-window tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Oracle fixture that attests every proof at a fixed severity.
#[derive(Debug, Clone, Copy)]
pub struct AttestingOracle {
    pub severity_bps: u16,
}

impl AttestingOracle {
    pub fn full_severity() -> Self {
        Self {
            severity_bps: parapool_core::FULL_SEVERITY_BPS,
        }
    }
}

impl TriggerOracle for AttestingOracle {
    fn attest(&self, _policy_type: PolicyType, _proof: &ClaimProof) -> Attestation {
        Attestation::Attested {
            severity_bps: self.severity_bps,
        }
    }
}

/// Oracle fixture that rejects every proof, useful for negative paths.
#[derive(Debug, Clone)]
pub struct DecliningOracle {
    reason: String,
}

impl DecliningOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TriggerOracle for DecliningOracle {
    fn attest(&self, _policy_type: PolicyType, _proof: &ClaimProof) -> Attestation {
        Attestation::NotAttested {
            reason: self.reason.clone(),
        }
    }
}

/// Oracle fixture answering from a fixed table keyed by proof reference.
///
/// References without an entry are rejected, mirroring how a real feed
/// answers only for events it actually observed.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    attestations: BTreeMap<String, u16>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attestation(mut self, reference: impl Into<String>, severity_bps: u16) -> Self {
        self.attestations.insert(reference.into(), severity_bps);
        self
    }
}

impl TriggerOracle for TableOracle {
    fn attest(&self, _policy_type: PolicyType, proof: &ClaimProof) -> Attestation {
        match self.attestations.get(&proof.reference) {
            Some(severity_bps) => Attestation::Attested {
                severity_bps: *severity_bps,
            },
            None => Attestation::NotAttested {
                reason: format!("no observation for '{}'", proof.reference),
            },
        }
    }
}
