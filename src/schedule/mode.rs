use std::time::Duration;

use time::OffsetDateTime;

use crate::schedule::boost::BoostMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WarmUp,
    Boost,
}

/// Cadence and payment policy derived from the boost window.
///
/// Holds only immutable configuration; every `*_at` query is a pure
/// function of the configuration and the supplied instant, and the
/// argument-free variants evaluate against the system clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    boost_mode: BoostMode,
    cart_interval: Duration,
    reserve_interval: Duration,
    home_interval: Duration,
    use_balance: bool,
}

impl Mode {
    pub fn new(
        boost_mode: BoostMode,
        cart_interval: Duration,
        reserve_interval: Duration,
        use_balance: bool,
    ) -> Self {
        Self {
            boost_mode,
            cart_interval,
            reserve_interval,
            home_interval: cart_interval,
            use_balance,
        }
    }

    pub fn with_home_interval(mut self, home_interval: Duration) -> Self {
        self.home_interval = home_interval;
        self
    }

    pub fn phase_at(&self, now: OffsetDateTime) -> Phase {
        if !self.boost_mode.enable() {
            return Phase::Idle;
        }
        if self.boost_mode.boost_time_at(now) {
            Phase::Boost
        } else if self.boost_mode.warm_up_boost_time_at(now) {
            Phase::WarmUp
        } else {
            Phase::Idle
        }
    }

    pub fn cart_interval(&self) -> Duration {
        self.cart_interval_at(OffsetDateTime::now_utc())
    }

    pub fn cart_interval_at(&self, now: OffsetDateTime) -> Duration {
        if self.boost_mode.enable() && self.boost_mode.warm_up_boost_time_at(now) {
            return self.boost_mode.cart_interval();
        }
        self.cart_interval
    }

    pub fn reserve_interval(&self) -> Duration {
        self.reserve_interval_at(OffsetDateTime::now_utc())
    }

    pub fn reserve_interval_at(&self, now: OffsetDateTime) -> Duration {
        if self.boost_mode.enable() && self.boost_mode.boost_time_at(now) {
            return self.boost_mode.reserve_interval();
        }
        self.reserve_interval
    }

    // No baseline: only meaningful once an attempt is underway.
    pub fn recheck_interval(&self) -> Duration {
        self.boost_mode.recheck_interval()
    }

    pub fn reorder_interval(&self) -> Duration {
        self.boost_mode.reorder_interval()
    }

    pub fn home_interval(&self) -> Duration {
        self.home_interval
    }

    pub fn use_balance(&self) -> bool {
        self.use_balance_at(OffsetDateTime::now_utc())
    }

    pub fn use_balance_at(&self, now: OffsetDateTime) -> bool {
        if self.boost_mode.enable() && self.boost_mode.boost_time_at(now) {
            return self.boost_mode.use_balance();
        }
        self.use_balance
    }

    /// How long to wait before the boost phase opens, when boosting is
    /// enabled and the window has not opened yet today.
    pub fn time_until_boost_at(&self, now: OffsetDateTime) -> Option<Duration> {
        if !self.boost_mode.enable() {
            return None;
        }
        self.boost_mode.time_until_boost_at(now)
    }
}
