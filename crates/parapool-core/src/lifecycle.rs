use crate::error::PoolError;
use crate::ledger::RiskLedger;
use crate::oracle::{Attestation, ClaimProof, TriggerOracle, FULL_SEVERITY_BPS};
use crate::types::{
    AccountId, CoverageLevel, Policy, PolicyId, PolicyState, PolicyType, RiskTier,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
struct PolicyStatus {
    state: PolicyState,
    expires_at: DateTime<Utc>,
}

/// A single underwritten policy.
///
/// Issuance data is immutable; the settlement status and expiry sit behind
/// one mutex so the `Active -> terminal` transition, the renewal window
/// check, and the matching ledger effect serialize per policy.
#[derive(Debug)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub user: AccountId,
    pub policy_type: PolicyType,
    pub coverage: CoverageLevel,
    pub risk_tier: RiskTier,
    pub base_rate_minor: u64,
    pub reserved_minor: u64,
    pub issued_at: DateTime<Utc>,
    pub referrer: Option<AccountId>,
    status: Mutex<PolicyStatus>,
}

impl PolicyRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn issue(
        id: PolicyId,
        user: AccountId,
        policy_type: PolicyType,
        coverage: CoverageLevel,
        risk_tier: RiskTier,
        base_rate_minor: u64,
        reserved_minor: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        referrer: Option<AccountId>,
    ) -> Self {
        Self {
            id,
            user,
            policy_type,
            coverage,
            risk_tier,
            base_rate_minor,
            reserved_minor,
            issued_at,
            referrer,
            status: Mutex::new(PolicyStatus {
                state: PolicyState::Active,
                expires_at,
            }),
        }
    }

    pub fn state(&self) -> PolicyState {
        self.status.lock().state
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.status.lock().expires_at
    }

    /// Consistent snapshot of the full record.
    pub fn snapshot(&self) -> Policy {
        let status = self.status.lock();
        Policy {
            id: self.id,
            user: self.user.clone(),
            policy_type: self.policy_type,
            coverage: self.coverage,
            risk_tier: self.risk_tier,
            base_rate_minor: self.base_rate_minor,
            reserved_minor: self.reserved_minor,
            issued_at: self.issued_at,
            expires_at: status.expires_at,
            referrer: self.referrer.clone(),
            state: status.state,
        }
    }
}

/// Book of every policy ever issued.
///
/// Records are never removed; terminal policies stay behind as immutable
/// audit entries.
#[derive(Debug, Default)]
pub struct PolicyBook {
    policies: RwLock<HashMap<PolicyId, Arc<PolicyRecord>>>,
}

impl PolicyBook {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, record: Arc<PolicyRecord>) {
        self.policies.write().insert(record.id, record);
    }

    pub fn get(&self, policy_id: PolicyId) -> Result<Arc<PolicyRecord>, PoolError> {
        self.policies
            .read()
            .get(&policy_id)
            .cloned()
            .ok_or(PoolError::PolicyNotFound { policy_id })
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

/// Capital effect of a settlement, reported for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Capital returned to the tier's available balance.
    pub released_minor: u64,
    /// Capital transferred out of the pool.
    pub paid_out_minor: u64,
}

/// Expire an unclaimed policy at or after its expiry instant.
///
/// The full reservation returns to the tier's available balance. The status
/// lock is held across the ledger release, which is what makes the release
/// happen exactly once even under racing settlement attempts.
pub fn expire(
    record: &PolicyRecord,
    ledger: &RiskLedger,
    now: DateTime<Utc>,
) -> Result<Settlement, PoolError> {
    let mut status = record.status.lock();
    if status.state != PolicyState::Active {
        return Err(PoolError::AlreadySettled {
            policy_id: record.id,
            state: status.state,
        });
    }
    if now < status.expires_at {
        return Err(PoolError::NotEligible {
            policy_id: record.id,
        });
    }

    ledger.release(record.risk_tier, record.reserved_minor)?;
    status.state = PolicyState::Expired;
    Ok(Settlement {
        released_minor: record.reserved_minor,
        paid_out_minor: 0,
    })
}

/// Settle a claim against an active, unexpired policy.
///
/// Validation order: settlement status, claim window, then the oracle. The
/// payout is the attested severity share of the reservation and can never
/// exceed it; the unpaid remainder is released so tier reserves keep matching
/// the sum over active policies exactly.
pub fn claim(
    record: &PolicyRecord,
    ledger: &RiskLedger,
    oracle: &dyn TriggerOracle,
    now: DateTime<Utc>,
    proof: &ClaimProof,
) -> Result<Settlement, PoolError> {
    let mut status = record.status.lock();
    if status.state != PolicyState::Active {
        return Err(PoolError::AlreadySettled {
            policy_id: record.id,
            state: status.state,
        });
    }
    if now >= status.expires_at {
        return Err(PoolError::Expired {
            policy_id: record.id,
        });
    }

    let severity_bps = match oracle.attest(record.policy_type, proof) {
        Attestation::Attested { severity_bps } => severity_bps.min(FULL_SEVERITY_BPS),
        Attestation::NotAttested { reason } => {
            return Err(PoolError::TriggerRejected { reason });
        }
    };

    let paid_out_minor = bps_share(record.reserved_minor, severity_bps);
    let released_minor = record.reserved_minor - paid_out_minor;

    ledger.payout(record.risk_tier, paid_out_minor, &record.user)?;
    if released_minor > 0 {
        ledger.release(record.risk_tier, released_minor)?;
    }
    status.state = PolicyState::Claimed;
    Ok(Settlement {
        released_minor,
        paid_out_minor,
    })
}

/// Cancel an active policy on behalf of its owner or governance.
///
/// An optional cancellation fee is deducted from the released amount and
/// leaves the pool toward governance; capital is never invented.
pub fn cancel(
    record: &PolicyRecord,
    ledger: &RiskLedger,
    requester: &AccountId,
    governance: &AccountId,
    cancellation_fee_bps: u16,
) -> Result<Settlement, PoolError> {
    if requester != &record.user && requester != governance {
        return Err(PoolError::Unauthorized {
            caller: requester.clone(),
        });
    }

    let mut status = record.status.lock();
    if status.state != PolicyState::Active {
        return Err(PoolError::AlreadySettled {
            policy_id: record.id,
            state: status.state,
        });
    }

    let fee_minor = bps_share(
        record.reserved_minor,
        cancellation_fee_bps.min(FULL_SEVERITY_BPS),
    );
    let released_minor = record.reserved_minor - fee_minor;

    ledger.release(record.risk_tier, released_minor)?;
    if fee_minor > 0 {
        ledger.payout(record.risk_tier, fee_minor, governance)?;
    }
    status.state = PolicyState::Cancelled;
    Ok(Settlement {
        released_minor,
        paid_out_minor: fee_minor,
    })
}

/// Extend an active policy's coverage window. Owner only, no capital effect.
///
/// Renewal stays open through a grace window after expiry as long as the
/// policy has not been settled yet.
pub fn renew(
    record: &PolicyRecord,
    requester: &AccountId,
    now: DateTime<Utc>,
    duration_secs: i64,
    renewal_grace_secs: i64,
) -> Result<DateTime<Utc>, PoolError> {
    if requester != &record.user {
        return Err(PoolError::Unauthorized {
            caller: requester.clone(),
        });
    }

    let mut status = record.status.lock();
    if status.state != PolicyState::Active {
        return Err(PoolError::NotRenewable {
            policy_id: record.id,
        });
    }
    let renewable_until = status
        .expires_at
        .checked_add_signed(Duration::seconds(renewal_grace_secs))
        .ok_or(PoolError::Overflow)?;
    if now > renewable_until {
        return Err(PoolError::NotRenewable {
            policy_id: record.id,
        });
    }

    let expires_at = status
        .expires_at
        .checked_add_signed(Duration::seconds(duration_secs))
        .ok_or(PoolError::Overflow)?;
    status.expires_at = expires_at;
    Ok(expires_at)
}

/// Integer share of `amount_minor` expressed in basis points.
fn bps_share(amount_minor: u64, bps: u16) -> u64 {
    ((u128::from(amount_minor) * u128::from(bps)) / u128::from(BPS_DENOMINATOR)) as u64
}
