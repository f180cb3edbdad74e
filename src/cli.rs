use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::pomodoro::pomodoro::POMODORO_LONG_EVERY;
use crate::pomodoro::{Config, ConfigError};
use crate::ui::OutputFormat;

/// Pomodoro timer - cycles work, short break and long break phases
#[derive(Debug, Parser)]
#[command(name = "pomodoro_timer")]
#[command(version)]
#[command(after_help = r#"KEYS (type a key, then Enter):
    s    start, or resume when paused
    p    pause
    r    reset to idle
    q    quit

EXAMPLES:
    pomodoro_timer                          # 25m work / 5m break / 15m long break every 4
    pomodoro_timer --work 50m --short 10m   # longer sessions
    pomodoro_timer --output json --autostart | my-status-bar
"#)]
pub struct Cli {
    /// Work phase duration (e.g. 25m, 1h, 90s)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "25m")]
    pub work: Duration,

    /// Short break duration
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5m")]
    pub short: Duration,

    /// Long break duration
    #[arg(long, value_parser = humantime::parse_duration, default_value = "15m")]
    pub long: Duration,

    /// Take a long break after every N work sessions
    #[arg(long, value_name = "N", default_value_t = POMODORO_LONG_EVERY)]
    pub long_every: u32,

    /// Status output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Don't send desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Start the first work session immediately
    #[arg(long)]
    pub autostart: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file (default: <data dir>/pomodoro_timer/timer.log)
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,
}

impl Cli {
    pub fn engine_config(&self) -> Result<Config, ConfigError> {
        Config::new(self.work, self.short, self.long, self.long_every)
    }
}
