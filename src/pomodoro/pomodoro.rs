use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::error::ConfigError;

pub const POMODORO_WORK_MINUTES: u64 = 25; // Default Pomodoro work time
pub const POMODORO_SHORT_BREAK_MINUTES: u64 = 5; // Default short break time
pub const POMODORO_LONG_BREAK_MINUTES: u64 = 15; // Default long break time
pub const POMODORO_LONG_EVERY: u32 = 4; // Long break after this many work phases
pub const MAX_PHASE_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60); // One week

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "WORK",
            Phase::ShortBreak => "SHORT_BREAK",
            Phase::LongBreak => "LONG_BREAK",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Phase::Work => "💼",
            Phase::ShortBreak => "☕",
            Phase::LongBreak => "🌴",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase lengths and the long-break cadence. Immutable once handed to an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub work: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
    /// Take a long break after every Nth completed work phase.
    pub long_every: u32,
}

impl Config {
    pub fn new(
        work: Duration,
        short_break: Duration,
        long_break: Duration,
        long_every: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            work,
            short_break,
            long_break,
            long_every,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.long_every == 0 {
            return Err(ConfigError::InvalidCadence);
        }
        for phase in [Phase::Work, Phase::ShortBreak, Phase::LongBreak] {
            let duration = self.duration(phase);
            if duration.is_zero() {
                return Err(ConfigError::ZeroDuration(phase));
            }
            if duration > MAX_PHASE_DURATION {
                return Err(ConfigError::DurationTooLong(phase));
            }
        }
        Ok(())
    }

    pub fn duration(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Work => self.work,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }

    /// Which break follows the `completed`th finished work phase.
    pub fn break_after(&self, completed: u32) -> Phase {
        if completed % self.long_every == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work: Duration::from_secs(POMODORO_WORK_MINUTES * 60),
            short_break: Duration::from_secs(POMODORO_SHORT_BREAK_MINUTES * 60),
            long_break: Duration::from_secs(POMODORO_LONG_BREAK_MINUTES * 60),
            long_every: POMODORO_LONG_EVERY,
        }
    }
}

/// Point-in-time copy of the engine state.
///
/// `started_at` and `ends_at` are `None` while the engine is idle. While `paused`
/// they are frozen and carry no meaning for the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub phase: Phase,
    pub started_at: Option<Instant>,
    pub ends_at: Option<Instant>,
    /// Work phases that ran to completion over the engine's lifetime.
    pub completed_work: u32,
    pub paused: bool,
}

impl State {
    pub(crate) fn idle(completed_work: u32) -> Self {
        Self {
            phase: Phase::Work,
            started_at: None,
            ends_at: None,
            completed_work,
            paused: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.started_at.is_none()
    }

    pub fn is_running(&self) -> bool {
        !self.is_idle() && !self.paused
    }
}
