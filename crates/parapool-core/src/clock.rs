use chrono::{DateTime, Utc};

/// Time source for expiry and claim-window comparisons.
///
/// Precision only needs to be finer than typical policy durations; the
/// engine never schedules anything, it only compares `now` against
/// per-policy expiry instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
