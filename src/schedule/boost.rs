use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Time, UtcOffset, macros::format_description};

use crate::schedule::{duration::parse_duration, error::ScheduleError};

fn default_utc_offset() -> String {
    "+08:00".to_string()
}

fn default_warm_up_start() -> String {
    "05:50:00".to_string()
}

fn default_boost_start() -> String {
    "05:59:00".to_string()
}

fn default_boost_end() -> String {
    "06:05:00".to_string()
}

fn default_boost_cart_interval() -> String {
    "10s".to_string()
}

fn default_boost_reserve_interval() -> String {
    "300ms".to_string()
}

fn default_recheck_interval() -> String {
    "1s".to_string()
}

fn default_reorder_interval() -> String {
    "500ms".to_string()
}

/// Boost window as written in the configuration document.
///
/// Boundaries are daily wall-clock times evaluated in `utc_offset`. The
/// warm-up phase covers `[warm_up_start, warm_up_end)` and the boost phase
/// covers `[boost_start, boost_end)`; `warm_up_end` defaults to
/// `boost_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostModeConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    /// Added to the local clock before phase evaluation.
    #[serde(default)]
    pub clock_skew_ms: i64,
    #[serde(default = "default_warm_up_start")]
    pub warm_up_start: String,
    #[serde(default)]
    pub warm_up_end: Option<String>,
    #[serde(default = "default_boost_start")]
    pub boost_start: String,
    #[serde(default = "default_boost_end")]
    pub boost_end: String,
    #[serde(default = "default_boost_cart_interval")]
    pub cart_interval: String,
    #[serde(default = "default_boost_reserve_interval")]
    pub reserve_interval: String,
    #[serde(default = "default_recheck_interval")]
    pub recheck_interval: String,
    #[serde(default = "default_reorder_interval")]
    pub reorder_interval: String,
    #[serde(default)]
    pub use_balance: bool,
}

impl Default for BoostModeConfig {
    fn default() -> Self {
        Self {
            enable: false,
            utc_offset: default_utc_offset(),
            clock_skew_ms: 0,
            warm_up_start: default_warm_up_start(),
            warm_up_end: None,
            boost_start: default_boost_start(),
            boost_end: default_boost_end(),
            cart_interval: default_boost_cart_interval(),
            reserve_interval: default_boost_reserve_interval(),
            recheck_interval: default_recheck_interval(),
            reorder_interval: default_reorder_interval(),
            use_balance: false,
        }
    }
}

/// Validated boost window with parsed boundaries and cadences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostMode {
    enable: bool,
    utc_offset: UtcOffset,
    clock_skew: time::Duration,
    warm_up_start: Time,
    warm_up_end: Time,
    boost_start: Time,
    boost_end: Time,
    cart_interval: Duration,
    reserve_interval: Duration,
    recheck_interval: Duration,
    reorder_interval: Duration,
    use_balance: bool,
}

impl BoostMode {
    pub fn new(config: &BoostModeConfig) -> Result<Self, ScheduleError> {
        let warm_up_start = parse_time_of_day(&config.warm_up_start)?;
        let boost_start = parse_time_of_day(&config.boost_start)?;
        let boost_end = parse_time_of_day(&config.boost_end)?;
        let warm_up_end = match &config.warm_up_end {
            Some(raw) => parse_time_of_day(raw)?,
            None => boost_start,
        };

        let ordered = [
            ("warm_up_start", warm_up_start),
            ("warm_up_end", warm_up_end),
            ("boost_start", boost_start),
            ("boost_end", boost_end),
        ];
        for pair in ordered.windows(2) {
            let (earlier_name, earlier) = pair[0];
            let (later_name, later) = pair[1];
            if earlier > later {
                return Err(ScheduleError::WindowOrder {
                    detail: format!(
                        "{} ({}) must not be after {} ({})",
                        earlier_name, earlier, later_name, later
                    ),
                });
            }
        }

        Ok(Self {
            enable: config.enable,
            utc_offset: parse_utc_offset(&config.utc_offset)?,
            clock_skew: time::Duration::milliseconds(config.clock_skew_ms),
            warm_up_start,
            warm_up_end,
            boost_start,
            boost_end,
            cart_interval: parse_duration(&config.cart_interval)?,
            reserve_interval: parse_duration(&config.reserve_interval)?,
            recheck_interval: parse_duration(&config.recheck_interval)?,
            reorder_interval: parse_duration(&config.reorder_interval)?,
            use_balance: config.use_balance,
        })
    }

    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn warm_up_boost_time(&self) -> bool {
        self.warm_up_boost_time_at(OffsetDateTime::now_utc())
    }

    pub fn warm_up_boost_time_at(&self, now: OffsetDateTime) -> bool {
        let local = self.local_time(now);
        self.warm_up_start <= local && local < self.warm_up_end
    }

    pub fn boost_time(&self) -> bool {
        self.boost_time_at(OffsetDateTime::now_utc())
    }

    pub fn boost_time_at(&self, now: OffsetDateTime) -> bool {
        let local = self.local_time(now);
        self.boost_start <= local && local < self.boost_end
    }

    /// Time left until the boost phase opens today, `None` once it has
    /// opened or the window is over.
    pub fn time_until_boost_at(&self, now: OffsetDateTime) -> Option<Duration> {
        let local = self.local_time(now);
        (local < self.boost_start).then(|| (self.boost_start - local).unsigned_abs())
    }

    pub fn cart_interval(&self) -> Duration {
        self.cart_interval
    }

    pub fn reserve_interval(&self) -> Duration {
        self.reserve_interval
    }

    pub fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    pub fn reorder_interval(&self) -> Duration {
        self.reorder_interval
    }

    pub fn use_balance(&self) -> bool {
        self.use_balance
    }

    fn local_time(&self, now: OffsetDateTime) -> Time {
        now.checked_add(self.clock_skew)
            .unwrap_or(now)
            .to_offset(self.utc_offset)
            .time()
    }
}

fn parse_time_of_day(input: &str) -> Result<Time, ScheduleError> {
    let trimmed = input.trim();
    Time::parse(trimmed, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(trimmed, format_description!("[hour]:[minute]")))
        .map_err(|_| ScheduleError::InvalidTimeOfDay {
            input: input.to_string(),
        })
}

fn parse_utc_offset(input: &str) -> Result<UtcOffset, ScheduleError> {
    UtcOffset::parse(
        input.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ScheduleError::InvalidUtcOffset {
        input: input.to_string(),
    })
}
