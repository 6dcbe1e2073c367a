use crate::types::{AccountId, PolicyId, PolicyType, RiskTier};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pool lifecycle events recorded for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolEvent {
    PolicyPurchased {
        policy_id: PolicyId,
        user: AccountId,
        policy_type: PolicyType,
        risk_tier: RiskTier,
        reserved_minor: u64,
        referrer: Option<AccountId>,
    },
    PolicyRenewed {
        policy_id: PolicyId,
        expires_at: DateTime<Utc>,
    },
    PolicyExpired {
        policy_id: PolicyId,
        released_minor: u64,
    },
    PolicyClaimed {
        policy_id: PolicyId,
        beneficiary: AccountId,
        paid_out_minor: u64,
        released_minor: u64,
    },
    PolicyCancelled {
        policy_id: PolicyId,
        requester: AccountId,
        released_minor: u64,
        fee_minor: u64,
    },
    CapitalDeposited {
        tier: RiskTier,
        amount_minor: u64,
    },
    ReservesRebalanced {
        from: RiskTier,
        to: RiskTier,
        amount_minor: u64,
    },
    PoolPaused,
    PoolUnpaused,
}

/// Hash-chained audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub entry_id: String,
    pub index: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: PoolEvent,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Append-only audit log with hash-chain tamper evidence.
///
/// No in-place mutation APIs are exposed; every successful pool mutation
/// becomes one more record, preserving the full operational history.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, recorded_at: DateTime<Utc>, event: PoolEvent) -> EventRecord {
        let mut entries = self.entries.lock();
        let index = entries.len() as u64;
        let previous_hash = entries.last().map(|entry| entry.entry_hash.clone());
        let entry_hash =
            compute_entry_hash(index, recorded_at, &event, previous_hash.as_deref());
        let record = EventRecord {
            entry_id: Uuid::new_v4().to_string(),
            index,
            recorded_at,
            event,
            previous_hash,
            entry_hash,
        };
        entries.push(record.clone());
        record
    }

    pub fn entries(&self) -> Vec<EventRecord> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn verify_chain(&self) -> bool {
        let entries = self.entries.lock();
        let mut previous_hash: Option<String> = None;
        for entry in entries.iter() {
            let expected_hash = compute_entry_hash(
                entry.index,
                entry.recorded_at,
                &entry.event,
                previous_hash.as_deref(),
            );
            if entry.entry_hash != expected_hash {
                return false;
            }
            if entry.previous_hash != previous_hash {
                return false;
            }
            previous_hash = Some(entry.entry_hash.clone());
        }
        true
    }
}

fn compute_entry_hash(
    index: u64,
    recorded_at: DateTime<Utc>,
    event: &PoolEvent,
    previous_hash: Option<&str>,
) -> String {
    let material = serde_json::json!({
        "index": index,
        "recorded_at": recorded_at,
        "event": event,
        "previous_hash": previous_hash,
    });

    let bytes = serde_json::to_vec(&material).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
