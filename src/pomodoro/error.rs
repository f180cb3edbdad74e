use thiserror::Error;

use super::pomodoro::Phase;

/// Reasons an engine cannot be created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("long break cadence must be at least 1")]
    InvalidCadence,

    #[error("{0} duration must be greater than zero")]
    ZeroDuration(Phase),

    #[error("{0} duration must not exceed one week")]
    DurationTooLong(Phase),

    #[error("phase engine must be created inside a Tokio runtime")]
    NoRuntime,
}
