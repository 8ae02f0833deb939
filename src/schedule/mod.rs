pub mod boost;
pub mod duration;
pub mod error;
pub mod mode;

pub use boost::{BoostMode, BoostModeConfig};
pub use duration::parse_duration;
pub use error::ScheduleError;
pub use mode::{Mode, Phase};
