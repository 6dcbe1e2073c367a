use crate::error::PoolError;
use crate::types::PurchaseRequest;

/// Underwriting validation configuration.
#[derive(Debug, Clone)]
pub struct UnderwritingConfig {
    /// Longest admissible policy duration in seconds.
    pub max_duration_secs: i64,
}

impl Default for UnderwritingConfig {
    fn default() -> Self {
        Self {
            // One year.
            max_duration_secs: 365 * 24 * 60 * 60,
        }
    }
}

/// Priced purchase, ready to reserve capital.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    /// Capital to set aside in the request's risk tier.
    pub reserved_minor: u64,
    pub duration_secs: i64,
}

/// Deterministic reservation pricing.
///
/// Integer arithmetic only; the same request always yields the same quote,
/// and overflow surfaces as an error instead of wrapping.
#[derive(Debug, Clone)]
pub struct Underwriter {
    config: UnderwritingConfig,
}

impl Underwriter {
    pub fn new(config: UnderwritingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UnderwritingConfig {
        &self.config
    }

    /// Validate a purchase request and price its reservation.
    ///
    /// Failure modes in order: `InvalidRate` for a zero base rate,
    /// `InvalidDuration` for a duration outside `(0, max]`, `Overflow` when
    /// the reservation does not fit into minor units. The pause gate runs in
    /// the pool controller before any request reaches this point.
    pub fn quote(&self, request: &PurchaseRequest) -> Result<Quote, PoolError> {
        if request.base_rate_minor == 0 {
            return Err(PoolError::InvalidRate);
        }
        self.validate_duration(request.duration_secs)?;

        let reserved_minor = request
            .base_rate_minor
            .checked_mul(request.coverage.multiplier())
            .ok_or(PoolError::Overflow)?;

        Ok(Quote {
            reserved_minor,
            duration_secs: request.duration_secs,
        })
    }

    pub fn validate_duration(&self, duration_secs: i64) -> Result<(), PoolError> {
        if duration_secs <= 0 || duration_secs > self.config.max_duration_secs {
            return Err(PoolError::InvalidDuration {
                duration_secs,
                max_secs: self.config.max_duration_secs,
            });
        }
        Ok(())
    }
}

impl Default for Underwriter {
    fn default() -> Self {
        Self::new(UnderwritingConfig::default())
    }
}
