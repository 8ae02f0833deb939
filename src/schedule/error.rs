use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },
    #[error("invalid time of day '{input}': expected HH:MM or HH:MM:SS")]
    InvalidTimeOfDay { input: String },
    #[error("invalid utc offset '{input}': expected +HH:MM or -HH:MM")]
    InvalidUtcOffset { input: String },
    #[error("boost window boundaries out of order: {detail}")]
    WindowOrder { detail: String },
}
