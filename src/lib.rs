//! Pomodoro timer
//!
//! A deadline-driven engine that cycles WORK, SHORT_BREAK and LONG_BREAK phases, plus the
//! adapters the binary wires around it:
//! - `pomodoro`: phase engine, clock abstraction and configuration
//! - `notify`: desktop notifications on phase changes
//! - `ui`: line-driven terminal display
//! - `cli`, `logging`: startup plumbing

pub mod cli;
pub mod logging;
pub mod notify;
pub mod pomodoro;
pub mod ui;

pub use pomodoro::{Config, ConfigError, Phase, PhaseEngine, State};
