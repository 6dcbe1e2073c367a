use crate::clock::Clock;
use crate::error::PoolError;
use crate::events::{EventLog, PoolEvent};
use crate::ledger::RiskLedger;
use crate::lifecycle::{self, PolicyBook, PolicyRecord, Settlement};
use crate::oracle::{ClaimProof, TriggerOracle};
use crate::types::{
    AccountId, Policy, PolicyId, PoolStats, PurchaseRequest, RiskTier, TierBalances,
};
use crate::underwriting::{Underwriter, UnderwritingConfig};
use chrono::Duration;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Pool-wide configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub underwriting: UnderwritingConfig,
    /// Renewal grace window after expiry, in seconds.
    pub renewal_grace_secs: i64,
    /// Cancellation fee retained by the pool, in basis points of the
    /// reservation. Zero disables fees.
    pub cancellation_fee_bps: u16,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            underwriting: UnderwritingConfig::default(),
            // Seven days, matching the renewal window offered at launch.
            renewal_grace_secs: 7 * 24 * 60 * 60,
            cancellation_fee_bps: 0,
        }
    }
}

/// Result of a terminal settlement, with its capital effect.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub policy: Policy,
    pub settlement: Settlement,
}

/// The reserve pool: capital ledger, policy book, and the governance surface
/// over both.
///
/// One instance is one pool; creating it is the single initialization the
/// pool ever gets. All operations take the authenticated caller identity
/// where authorization matters and only ever compare it for equality.
pub struct ReservePool {
    governance: AccountId,
    paused: AtomicBool,
    ledger: RiskLedger,
    policies: PolicyBook,
    underwriter: Underwriter,
    events: EventLog,
    total_policies: AtomicU64,
    policy_counts: [AtomicU64; 3],
    config: PoolConfig,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn TriggerOracle>,
}

impl ReservePool {
    /// Create a pool with zeroed tier balances, unpaused, governed by
    /// `governance`.
    pub fn initialize(
        governance: AccountId,
        config: PoolConfig,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn TriggerOracle>,
    ) -> Self {
        Self {
            governance,
            paused: AtomicBool::new(false),
            ledger: RiskLedger::new(),
            policies: PolicyBook::new(),
            underwriter: Underwriter::new(config.underwriting.clone()),
            events: EventLog::new(),
            total_policies: AtomicU64::new(0),
            policy_counts: std::array::from_fn(|_| AtomicU64::new(0)),
            config,
            clock,
            oracle,
        }
    }

    pub fn governance(&self) -> &AccountId {
        &self.governance
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn tier_balances(&self, tier: RiskTier) -> TierBalances {
        self.ledger.balances(tier)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_policies: self.total_policies.load(Ordering::SeqCst),
            policy_counts: std::array::from_fn(|index| {
                self.policy_counts[index].load(Ordering::SeqCst)
            }),
            is_paused: self.is_paused(),
        }
    }

    /// Snapshot of a policy by id.
    pub fn policy(&self, policy_id: PolicyId) -> Result<Policy, PoolError> {
        Ok(self.policies.get(policy_id)?.snapshot())
    }

    /// Append-only audit trail of every successful mutation.
    pub fn audit_log(&self) -> &EventLog {
        &self.events
    }

    fn require_governance(&self, caller: &AccountId) -> Result<(), PoolError> {
        if caller != &self.governance {
            return Err(PoolError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Stop new policy issuance. Settlement of existing policies stays open;
    /// in-flight obligations must always remain settleable.
    pub fn pause(&self, caller: &AccountId) -> Result<(), PoolError> {
        self.require_governance(caller)?;
        self.paused.store(true, Ordering::SeqCst);
        tracing::info!("pool paused");
        self.events.append(self.clock.now(), PoolEvent::PoolPaused);
        Ok(())
    }

    pub fn unpause(&self, caller: &AccountId) -> Result<(), PoolError> {
        self.require_governance(caller)?;
        self.paused.store(false, Ordering::SeqCst);
        tracing::info!("pool unpaused");
        self.events.append(self.clock.now(), PoolEvent::PoolUnpaused);
        Ok(())
    }

    /// Fund a tier's available capital.
    pub fn deposit(
        &self,
        caller: &AccountId,
        tier: RiskTier,
        amount_minor: u64,
    ) -> Result<(), PoolError> {
        self.require_governance(caller)?;
        self.ledger.deposit(tier, amount_minor)?;
        tracing::info!(tier = tier.name(), amount_minor, "capital deposited");
        self.events.append(
            self.clock.now(),
            PoolEvent::CapitalDeposited { tier, amount_minor },
        );
        Ok(())
    }

    /// Move available capital between tiers.
    pub fn rebalance(
        &self,
        caller: &AccountId,
        from: RiskTier,
        to: RiskTier,
        amount_minor: u64,
    ) -> Result<(), PoolError> {
        self.require_governance(caller)?;
        self.ledger.rebalance(from, to, amount_minor)?;
        tracing::info!(
            from = from.name(),
            to = to.name(),
            amount_minor,
            "reserves rebalanced"
        );
        self.events.append(
            self.clock.now(),
            PoolEvent::ReservesRebalanced {
                from,
                to,
                amount_minor,
            },
        );
        Ok(())
    }

    /// Underwrite a new policy.
    ///
    /// All-or-nothing: a failure at any validation step or at the capacity
    /// check leaves no trace in the ledger or the policy book.
    pub fn purchase(&self, request: PurchaseRequest) -> Result<Policy, PoolError> {
        if self.is_paused() {
            return Err(PoolError::PoolPaused);
        }
        let quote = self.underwriter.quote(&request)?;

        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(Duration::seconds(quote.duration_secs))
            .ok_or(PoolError::Overflow)?;

        self.ledger.reserve(request.risk_tier, quote.reserved_minor)?;

        let record = Arc::new(PolicyRecord::issue(
            PolicyId::generate(),
            request.user,
            request.policy_type,
            request.coverage,
            request.risk_tier,
            request.base_rate_minor,
            quote.reserved_minor,
            issued_at,
            expires_at,
            request.referrer,
        ));
        self.policies.insert(record.clone());
        self.total_policies.fetch_add(1, Ordering::SeqCst);
        self.policy_counts[request.policy_type.index()].fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            policy_id = %record.id,
            user = record.user.as_str(),
            policy_type = record.policy_type.name(),
            risk_tier = record.risk_tier.name(),
            reserved_minor = record.reserved_minor,
            "policy underwritten"
        );
        self.events.append(
            issued_at,
            PoolEvent::PolicyPurchased {
                policy_id: record.id,
                user: record.user.clone(),
                policy_type: record.policy_type,
                risk_tier: record.risk_tier,
                reserved_minor: record.reserved_minor,
                referrer: record.referrer.clone(),
            },
        );
        Ok(record.snapshot())
    }

    /// Extend an active policy's coverage window.
    pub fn renew(
        &self,
        policy_id: PolicyId,
        requester: &AccountId,
        duration_secs: i64,
    ) -> Result<Policy, PoolError> {
        let record = self.policies.get(policy_id)?;
        self.underwriter.validate_duration(duration_secs)?;

        let now = self.clock.now();
        let expires_at = lifecycle::renew(
            &record,
            requester,
            now,
            duration_secs,
            self.config.renewal_grace_secs,
        )?;

        tracing::info!(policy_id = %policy_id, expires_at = %expires_at, "policy renewed");
        self.events.append(
            now,
            PoolEvent::PolicyRenewed {
                policy_id,
                expires_at,
            },
        );
        Ok(record.snapshot())
    }

    /// Settle an unclaimed policy at expiry, releasing its reservation.
    pub fn expire(&self, policy_id: PolicyId) -> Result<SettlementOutcome, PoolError> {
        let record = self.policies.get(policy_id)?;
        let now = self.clock.now();
        let settlement = lifecycle::expire(&record, &self.ledger, now)?;

        tracing::info!(
            policy_id = %policy_id,
            released_minor = settlement.released_minor,
            "policy expired unclaimed"
        );
        self.events.append(
            now,
            PoolEvent::PolicyExpired {
                policy_id,
                released_minor: settlement.released_minor,
            },
        );
        Ok(SettlementOutcome {
            policy: record.snapshot(),
            settlement,
        })
    }

    /// Settle a claim against an active policy, paying out the attested
    /// severity share of the reservation.
    pub fn claim(
        &self,
        policy_id: PolicyId,
        proof: &ClaimProof,
    ) -> Result<SettlementOutcome, PoolError> {
        let record = self.policies.get(policy_id)?;
        let now = self.clock.now();
        let settlement =
            lifecycle::claim(&record, &self.ledger, self.oracle.as_ref(), now, proof)?;

        tracing::info!(
            policy_id = %policy_id,
            beneficiary = record.user.as_str(),
            paid_out_minor = settlement.paid_out_minor,
            "claim settled"
        );
        self.events.append(
            now,
            PoolEvent::PolicyClaimed {
                policy_id,
                beneficiary: record.user.clone(),
                paid_out_minor: settlement.paid_out_minor,
                released_minor: settlement.released_minor,
            },
        );
        Ok(SettlementOutcome {
            policy: record.snapshot(),
            settlement,
        })
    }

    /// Cancel an active policy on behalf of its owner or governance.
    pub fn cancel(
        &self,
        policy_id: PolicyId,
        requester: &AccountId,
    ) -> Result<SettlementOutcome, PoolError> {
        let record = self.policies.get(policy_id)?;
        let settlement = lifecycle::cancel(
            &record,
            &self.ledger,
            requester,
            &self.governance,
            self.config.cancellation_fee_bps,
        )?;

        tracing::info!(
            policy_id = %policy_id,
            released_minor = settlement.released_minor,
            fee_minor = settlement.paid_out_minor,
            "policy cancelled"
        );
        self.events.append(
            self.clock.now(),
            PoolEvent::PolicyCancelled {
                policy_id,
                requester: requester.clone(),
                released_minor: settlement.released_minor,
                fee_minor: settlement.paid_out_minor,
            },
        );
        Ok(SettlementOutcome {
            policy: record.snapshot(),
            settlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Attestation, FULL_SEVERITY_BPS};
    use crate::types::{CoverageLevel, PolicyType};
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;

    const DAY_SECS: i64 = 24 * 60 * 60;

    struct TestClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl TestClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance_secs(&self, secs: i64) {
            let mut now = self.now.lock();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    struct AlwaysAttests;

    impl TriggerOracle for AlwaysAttests {
        fn attest(&self, _policy_type: PolicyType, _proof: &ClaimProof) -> Attestation {
            Attestation::Attested {
                severity_bps: FULL_SEVERITY_BPS,
            }
        }
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn governance() -> AccountId {
        AccountId::new("governance")
    }

    fn pool_with_clock() -> (ReservePool, Arc<TestClock>) {
        let clock = TestClock::starting_at(start_time());
        let pool = ReservePool::initialize(
            governance(),
            PoolConfig::default(),
            clock.clone(),
            Arc::new(AlwaysAttests),
        );
        (pool, clock)
    }

    fn basic_request(base_rate_minor: u64) -> PurchaseRequest {
        PurchaseRequest::new(
            AccountId::new("traveler-1"),
            base_rate_minor,
            PolicyType::FlightDelay,
            CoverageLevel::Basic,
            RiskTier::Low,
            30 * DAY_SECS,
        )
    }

    fn proof() -> ClaimProof {
        ClaimProof::new("PP-88/2026-06-02", serde_json::json!({"delay_minutes": 145}))
    }

    #[test]
    fn freshly_initialized_pool_is_empty_and_unpaused() {
        let (pool, _clock) = pool_with_clock();

        assert_eq!(pool.governance(), &governance());
        assert!(!pool.is_paused());
        let stats = pool.stats();
        assert_eq!(stats.total_policies, 0);
        assert_eq!(stats.policy_counts, [0, 0, 0]);
        for tier in RiskTier::ALL {
            let balances = pool.tier_balances(tier);
            assert_eq!(balances.available_minor, 0);
            assert_eq!(balances.reserved_minor, 0);
        }
    }

    #[test]
    fn purchase_reserves_capital_and_mints_an_active_policy() {
        let (pool, _clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();

        let policy = pool.purchase(basic_request(100)).unwrap();
        assert_eq!(policy.state, crate::types::PolicyState::Active);
        assert_eq!(policy.reserved_minor, 100);
        assert_eq!(
            policy.expires_at,
            policy.issued_at + Duration::seconds(30 * DAY_SECS)
        );

        let balances = pool.tier_balances(RiskTier::Low);
        assert_eq!(balances.available_minor, 900);
        assert_eq!(balances.reserved_minor, 100);

        let stats = pool.stats();
        assert_eq!(stats.total_policies, 1);
        assert_eq!(stats.count_for(PolicyType::FlightDelay), 1);
        assert_eq!(stats.count_for(PolicyType::CropFailure), 0);
    }

    #[test]
    fn purchase_beyond_capacity_changes_nothing() {
        let (pool, _clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();
        pool.purchase(basic_request(100)).unwrap();

        let err = pool.purchase(basic_request(950)).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientCapacity { .. }));

        let balances = pool.tier_balances(RiskTier::Low);
        assert_eq!(balances.available_minor, 900);
        assert_eq!(balances.reserved_minor, 100);
        assert_eq!(pool.stats().total_policies, 1);
    }

    #[test]
    fn pause_blocks_purchases_but_not_settlement() {
        let (pool, clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();
        let policy = pool.purchase(basic_request(100)).unwrap();

        pool.pause(&governance()).unwrap();
        assert!(matches!(
            pool.purchase(basic_request(100)).unwrap_err(),
            PoolError::PoolPaused
        ));

        // Existing obligations stay settleable while paused.
        clock.advance_secs(31 * DAY_SECS);
        let outcome = pool.expire(policy.id).unwrap();
        assert_eq!(outcome.settlement.released_minor, 100);

        pool.unpause(&governance()).unwrap();
        assert!(pool.purchase(basic_request(100)).is_ok());
    }

    #[test]
    fn governance_gates_reject_other_callers_before_any_mutation() {
        let (pool, _clock) = pool_with_clock();
        let outsider = AccountId::new("outsider");

        assert!(matches!(
            pool.deposit(&outsider, RiskTier::Low, 1_000).unwrap_err(),
            PoolError::Unauthorized { .. }
        ));
        assert!(matches!(
            pool.pause(&outsider).unwrap_err(),
            PoolError::Unauthorized { .. }
        ));
        assert!(matches!(
            pool.rebalance(&outsider, RiskTier::Low, RiskTier::High, 1)
                .unwrap_err(),
            PoolError::Unauthorized { .. }
        ));

        assert_eq!(pool.tier_balances(RiskTier::Low).available_minor, 0);
        assert!(!pool.is_paused());
    }

    #[test]
    fn claim_pays_out_and_terminates_the_policy() {
        let (pool, _clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();
        let policy = pool.purchase(basic_request(100)).unwrap();

        let outcome = pool.claim(policy.id, &proof()).unwrap();
        assert_eq!(outcome.settlement.paid_out_minor, 100);
        assert_eq!(outcome.policy.state, crate::types::PolicyState::Claimed);

        let err = pool.claim(policy.id, &proof()).unwrap_err();
        assert!(matches!(err, PoolError::AlreadySettled { .. }));

        let balances = pool.tier_balances(RiskTier::Low);
        assert_eq!(balances.paid_out_total_minor, 100);
        assert!(balances.is_conserved());
    }

    #[test]
    fn renewal_pushes_expiry_and_keeps_the_reservation() {
        let (pool, _clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();
        let policy = pool.purchase(basic_request(100)).unwrap();
        let owner = policy.user.clone();

        let renewed = pool.renew(policy.id, &owner, 60 * DAY_SECS).unwrap();
        assert_eq!(
            renewed.expires_at,
            policy.expires_at + Duration::seconds(60 * DAY_SECS)
        );
        assert_eq!(pool.tier_balances(RiskTier::Low).reserved_minor, 100);
    }

    #[test]
    fn unknown_policy_id_is_reported() {
        let (pool, _clock) = pool_with_clock();
        let missing = PolicyId::generate();

        assert!(matches!(
            pool.policy(missing).unwrap_err(),
            PoolError::PolicyNotFound { .. }
        ));
        assert!(matches!(
            pool.expire(missing).unwrap_err(),
            PoolError::PolicyNotFound { .. }
        ));
    }

    #[test]
    fn every_successful_mutation_lands_in_the_audit_chain() {
        let (pool, clock) = pool_with_clock();
        pool.deposit(&governance(), RiskTier::Low, 1_000).unwrap();
        pool.deposit(&governance(), RiskTier::High, 500).unwrap();
        pool.rebalance(&governance(), RiskTier::High, RiskTier::Low, 200)
            .unwrap();

        let policy = pool.purchase(basic_request(100)).unwrap();
        clock.advance_secs(31 * DAY_SECS);
        pool.expire(policy.id).unwrap();

        let log = pool.audit_log();
        assert_eq!(log.len(), 5);
        assert!(log.verify_chain());

        let entries = log.entries();
        assert!(matches!(
            entries[3].event,
            PoolEvent::PolicyPurchased { reserved_minor: 100, .. }
        ));
        assert!(matches!(
            entries[4].event,
            PoolEvent::PolicyExpired { released_minor: 100, .. }
        ));
    }
}
