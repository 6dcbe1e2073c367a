use crate::error::PoolError;
use crate::types::{AccountId, RiskTier, TierBalances};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct TierAccount {
    available_minor: u64,
    reserved_minor: u64,
    deposited_total_minor: u64,
    paid_out_total_minor: u64,
}

impl TierAccount {
    fn balances(&self) -> TierBalances {
        TierBalances {
            available_minor: self.available_minor,
            reserved_minor: self.reserved_minor,
            deposited_total_minor: self.deposited_total_minor,
            paid_out_total_minor: self.paid_out_total_minor,
        }
    }
}

/// Sole mutator of tier capital balances.
///
/// Each tier account sits behind its own mutex, so operations on the same
/// tier serialize while disjoint tiers proceed in parallel. Every operation
/// here has a real capital effect and is not idempotent; exactly-once calling
/// is enforced by the policy state transition guard, not re-derived here.
///
/// Conservation invariant, per tier, at every point in time:
/// `available + reserved + paid_out_total == deposited_total`.
#[derive(Debug)]
pub struct RiskLedger {
    tiers: [Mutex<TierAccount>; 3],
}

impl RiskLedger {
    pub fn new() -> Self {
        Self {
            tiers: std::array::from_fn(|_| Mutex::new(TierAccount::default())),
        }
    }

    fn account(&self, tier: RiskTier) -> &Mutex<TierAccount> {
        &self.tiers[tier.index()]
    }

    /// Set aside `amount_minor` of available capital against a new policy.
    ///
    /// The capacity check and the balance move happen under the tier lock, so
    /// concurrent reservations can never observe a window that overdraws the
    /// tier together.
    pub fn reserve(&self, tier: RiskTier, amount_minor: u64) -> Result<(), PoolError> {
        let mut account = self.account(tier).lock();
        if account.available_minor < amount_minor {
            return Err(PoolError::InsufficientCapacity {
                tier,
                requested_minor: amount_minor,
                available_minor: account.available_minor,
            });
        }
        account.available_minor -= amount_minor;
        account.reserved_minor += amount_minor;
        Ok(())
    }

    /// Return `amount_minor` of reserved capital to the available balance.
    ///
    /// Reserved underflow means an accounting invariant broke elsewhere and
    /// surfaces as the fatal `LedgerInconsistency`.
    pub fn release(&self, tier: RiskTier, amount_minor: u64) -> Result<(), PoolError> {
        let mut account = self.account(tier).lock();
        if account.reserved_minor < amount_minor {
            return Err(PoolError::ledger_underflow(
                tier,
                "release",
                amount_minor,
                account.reserved_minor,
            ));
        }
        account.reserved_minor -= amount_minor;
        account.available_minor += amount_minor;
        Ok(())
    }

    /// Transfer `amount_minor` of reserved capital out of the pool.
    ///
    /// The amount never returns to the available balance; it is tracked in
    /// the cumulative paid-out counter for reconciliation.
    pub fn payout(
        &self,
        tier: RiskTier,
        amount_minor: u64,
        beneficiary: &AccountId,
    ) -> Result<(), PoolError> {
        let mut account = self.account(tier).lock();
        if account.reserved_minor < amount_minor {
            return Err(PoolError::ledger_underflow(
                tier,
                "payout",
                amount_minor,
                account.reserved_minor,
            ));
        }
        account.reserved_minor -= amount_minor;
        account.paid_out_total_minor += amount_minor;
        tracing::debug!(
            tier = tier.name(),
            amount_minor,
            beneficiary = beneficiary.as_str(),
            "capital paid out of pool"
        );
        Ok(())
    }

    /// Fund a tier's available capital. Governance-gated by the pool controller.
    pub fn deposit(&self, tier: RiskTier, amount_minor: u64) -> Result<(), PoolError> {
        let mut account = self.account(tier).lock();
        let available = account
            .available_minor
            .checked_add(amount_minor)
            .ok_or(PoolError::Overflow)?;
        let deposited = account
            .deposited_total_minor
            .checked_add(amount_minor)
            .ok_or(PoolError::Overflow)?;
        account.available_minor = available;
        account.deposited_total_minor = deposited;
        Ok(())
    }

    /// Move available (never reserved) capital from one tier to another.
    ///
    /// Locks are acquired in tier index order so concurrent cross-tier moves
    /// cannot deadlock. The cumulative deposit counters move with the capital
    /// to keep per-tier conservation intact.
    pub fn rebalance(
        &self,
        from: RiskTier,
        to: RiskTier,
        amount_minor: u64,
    ) -> Result<(), PoolError> {
        if from == to || amount_minor == 0 {
            return Ok(());
        }

        let (first, second) = if from.index() < to.index() {
            (from, to)
        } else {
            (to, from)
        };
        let mut first_account = self.account(first).lock();
        let mut second_account = self.account(second).lock();
        let (source, target) = if first == from {
            (&mut *first_account, &mut *second_account)
        } else {
            (&mut *second_account, &mut *first_account)
        };

        if source.available_minor < amount_minor {
            return Err(PoolError::InsufficientCapacity {
                tier: from,
                requested_minor: amount_minor,
                available_minor: source.available_minor,
            });
        }
        let target_available = target
            .available_minor
            .checked_add(amount_minor)
            .ok_or(PoolError::Overflow)?;
        let target_deposited = target
            .deposited_total_minor
            .checked_add(amount_minor)
            .ok_or(PoolError::Overflow)?;

        source.available_minor -= amount_minor;
        source.deposited_total_minor -= amount_minor;
        target.available_minor = target_available;
        target.deposited_total_minor = target_deposited;
        Ok(())
    }

    /// Consistent point-in-time snapshot of one tier's balances.
    pub fn balances(&self, tier: RiskTier) -> TierBalances {
        self.account(tier).lock().balances()
    }
}

impl Default for RiskLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_ledger(tier: RiskTier, amount_minor: u64) -> RiskLedger {
        let ledger = RiskLedger::new();
        ledger.deposit(tier, amount_minor).unwrap();
        ledger
    }

    #[test]
    fn reserve_moves_available_into_reserved() {
        let ledger = funded_ledger(RiskTier::Low, 1_000);
        ledger.reserve(RiskTier::Low, 400).unwrap();

        let balances = ledger.balances(RiskTier::Low);
        assert_eq!(balances.available_minor, 600);
        assert_eq!(balances.reserved_minor, 400);
        assert!(balances.is_conserved());
    }

    #[test]
    fn reserve_rejects_shortfall_without_balance_change() {
        let ledger = funded_ledger(RiskTier::Medium, 300);
        let err = ledger.reserve(RiskTier::Medium, 301).unwrap_err();
        assert!(matches!(
            err,
            PoolError::InsufficientCapacity {
                tier: RiskTier::Medium,
                requested_minor: 301,
                available_minor: 300,
            }
        ));

        let balances = ledger.balances(RiskTier::Medium);
        assert_eq!(balances.available_minor, 300);
        assert_eq!(balances.reserved_minor, 0);
    }

    #[test]
    fn release_returns_capital_to_available() {
        let ledger = funded_ledger(RiskTier::High, 500);
        ledger.reserve(RiskTier::High, 500).unwrap();
        ledger.release(RiskTier::High, 500).unwrap();

        let balances = ledger.balances(RiskTier::High);
        assert_eq!(balances.available_minor, 500);
        assert_eq!(balances.reserved_minor, 0);
        assert!(balances.is_conserved());
    }

    #[test]
    fn release_underflow_is_ledger_inconsistency() {
        let ledger = funded_ledger(RiskTier::Low, 100);
        ledger.reserve(RiskTier::Low, 50).unwrap();

        let err = ledger.release(RiskTier::Low, 51).unwrap_err();
        assert!(matches!(err, PoolError::LedgerInconsistency { .. }));

        // The failed release must not clamp or mutate anything.
        let balances = ledger.balances(RiskTier::Low);
        assert_eq!(balances.reserved_minor, 50);
        assert_eq!(balances.available_minor, 50);
    }

    #[test]
    fn payout_leaves_the_pool_permanently() {
        let ledger = funded_ledger(RiskTier::Low, 1_000);
        ledger.reserve(RiskTier::Low, 700).unwrap();
        ledger
            .payout(RiskTier::Low, 700, &AccountId::new("beneficiary-1"))
            .unwrap();

        let balances = ledger.balances(RiskTier::Low);
        assert_eq!(balances.available_minor, 300);
        assert_eq!(balances.reserved_minor, 0);
        assert_eq!(balances.paid_out_total_minor, 700);
        assert!(balances.is_conserved());
    }

    #[test]
    fn deposit_overflow_is_rejected() {
        let ledger = RiskLedger::new();
        ledger.deposit(RiskTier::Low, u64::MAX).unwrap();
        let err = ledger.deposit(RiskTier::Low, 1).unwrap_err();
        assert!(matches!(err, PoolError::Overflow));
    }

    #[test]
    fn rebalance_moves_available_and_keeps_both_tiers_conserved() {
        let ledger = funded_ledger(RiskTier::Low, 150_000);
        ledger.reserve(RiskTier::Low, 20_000).unwrap();
        ledger
            .rebalance(RiskTier::Low, RiskTier::High, 50_000)
            .unwrap();

        let low = ledger.balances(RiskTier::Low);
        let high = ledger.balances(RiskTier::High);
        assert_eq!(low.available_minor, 80_000);
        assert_eq!(low.reserved_minor, 20_000);
        assert_eq!(high.available_minor, 50_000);
        assert!(low.is_conserved());
        assert!(high.is_conserved());
    }

    #[test]
    fn rebalance_never_touches_reserved_capital() {
        let ledger = funded_ledger(RiskTier::Low, 100);
        ledger.reserve(RiskTier::Low, 60).unwrap();

        let err = ledger
            .rebalance(RiskTier::Low, RiskTier::Medium, 41)
            .unwrap_err();
        assert!(matches!(err, PoolError::InsufficientCapacity { .. }));
        assert_eq!(ledger.balances(RiskTier::Low).reserved_minor, 60);
    }

    #[test]
    fn concurrent_reservations_cannot_overdraw_a_tier() {
        let ledger = std::sync::Arc::new(funded_ledger(RiskTier::Low, 1_000));

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            (0..4)
                .map(|_| {
                    let ledger = ledger.clone();
                    scope.spawn(move || ledger.reserve(RiskTier::Low, 600))
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        let granted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(granted, 1, "only one 600 reservation fits into 1000");

        let balances = ledger.balances(RiskTier::Low);
        assert_eq!(balances.reserved_minor, 600);
        assert_eq!(balances.available_minor, 400);
        assert!(balances.is_conserved());
    }
}
