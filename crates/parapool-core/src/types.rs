use crate::error::PoolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Authenticated caller identity injected by the integration layer.
///
/// The engine never verifies signatures; it only compares identities for
/// equality (`caller == governance`, `caller == policy.user`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique policy identifier assigned at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(Uuid);

impl PolicyId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Risk bucket with isolated capital accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RiskTier {
    type Err = PoolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(PoolError::InvalidEnum {
                field: "risk tier",
                value: value.to_string(),
            }),
        }
    }
}

/// Coverage level determining the payout multiplier applied to the base rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    Basic,
    Premium,
    Platinum,
}

impl CoverageLevel {
    /// Fixed multiplier table; adding a coverage level is a single-point change.
    pub fn multiplier(self) -> u64 {
        match self {
            Self::Basic => 1,
            Self::Premium => 2,
            Self::Platinum => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Platinum => "platinum",
        }
    }
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoverageLevel {
    type Err = PoolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "platinum" => Ok(Self::Platinum),
            _ => Err(PoolError::InvalidEnum {
                field: "coverage level",
                value: value.to_string(),
            }),
        }
    }
}

/// Parametric product class covered by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    FlightDelay,
    CropFailure,
    PropertyDamage,
}

impl PolicyType {
    pub const ALL: [PolicyType; 3] = [
        PolicyType::FlightDelay,
        PolicyType::CropFailure,
        PolicyType::PropertyDamage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FlightDelay => "flight_delay",
            Self::CropFailure => "crop_failure",
            Self::PropertyDamage => "property_damage",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyType {
    type Err = PoolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "flight_delay" => Ok(Self::FlightDelay),
            "crop_failure" => Ok(Self::CropFailure),
            "property_damage" => Ok(Self::PropertyDamage),
            _ => Err(PoolError::InvalidEnum {
                field: "policy type",
                value: value.to_string(),
            }),
        }
    }
}

/// Policy settlement status.
///
/// `Expired`, `Claimed`, and `Cancelled` are terminal; no transition ever
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Active,
    Expired,
    Claimed,
    Cancelled,
}

impl PolicyState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Claimed => "claimed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Purchase request entering the underwriting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub user: AccountId,
    /// Premium input in smallest currency units; must be positive.
    pub base_rate_minor: u64,
    pub policy_type: PolicyType,
    pub coverage: CoverageLevel,
    pub risk_tier: RiskTier,
    pub duration_secs: i64,
    /// Optional identity credited for referral; absence is a first-class case.
    pub referrer: Option<AccountId>,
}

impl PurchaseRequest {
    pub fn new(
        user: AccountId,
        base_rate_minor: u64,
        policy_type: PolicyType,
        coverage: CoverageLevel,
        risk_tier: RiskTier,
        duration_secs: i64,
    ) -> Self {
        Self {
            user,
            base_rate_minor,
            policy_type,
            coverage,
            risk_tier,
            duration_secs,
            referrer: None,
        }
    }

    pub fn with_referrer(mut self, referrer: AccountId) -> Self {
        self.referrer = Some(referrer);
        self
    }
}

/// Immutable point-in-time snapshot of a policy record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub user: AccountId,
    pub policy_type: PolicyType,
    pub coverage: CoverageLevel,
    pub risk_tier: RiskTier,
    pub base_rate_minor: u64,
    /// Capital reserved in `risk_tier` for this policy at issuance.
    pub reserved_minor: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub referrer: Option<AccountId>,
    pub state: PolicyState,
}

/// Point-in-time balances for one risk tier.
///
/// The cumulative counters make the conservation identity directly checkable:
/// `available + reserved + paid_out_total == deposited_total` at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBalances {
    pub available_minor: u64,
    pub reserved_minor: u64,
    pub deposited_total_minor: u64,
    pub paid_out_total_minor: u64,
}

impl TierBalances {
    pub fn is_conserved(&self) -> bool {
        self.available_minor + self.reserved_minor + self.paid_out_total_minor
            == self.deposited_total_minor
    }
}

/// Aggregate pool counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolStats {
    /// Policies ever issued; monotonic audit counter.
    pub total_policies: u64,
    /// Issuance counters indexed by `PolicyType` declaration order.
    pub policy_counts: [u64; 3],
    pub is_paused: bool,
}

impl PoolStats {
    pub fn count_for(&self, policy_type: PolicyType) -> u64 {
        self.policy_counts[policy_type.index()]
    }
}
