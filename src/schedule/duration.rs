use std::time::Duration;

use crate::schedule::error::ScheduleError;

/// Parses cadence strings such as `"2m"`, `"1m30s"` or `"250ms"`.
pub fn parse_duration(input: &str) -> Result<Duration, ScheduleError> {
    humantime::parse_duration(input.trim()).map_err(|err| ScheduleError::InvalidDuration {
        input: input.to_string(),
        reason: err.to_string(),
    })
}
