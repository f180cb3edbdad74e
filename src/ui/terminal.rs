//! Line-driven terminal front end.
//!
//! Reads one command per line from stdin and redraws a status line every second.
//! All timing lives in the engine; this loop only polls `state()` and `remaining()`.

use chrono::{Local, TimeDelta};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::pomodoro::{Phase, PhaseEngine, State};

const REFRESH_INTERVAL_MS: u64 = 1000;
const BAR_WIDTH: usize = 20;

pub const HELP: &str = "[s] start/resume  [p] pause  [r] reset  [q] quit  (press Enter after each key)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable status line
    Text,
    /// One JSON object per refresh, for status bars
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartOrResume,
    Pause,
    Reset,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "s" | "start" | "resume" => Some(Command::StartOrResume),
        "p" | "pause" => Some(Command::Pause),
        "r" | "reset" | "stop" => Some(Command::Reset),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Applies a command to the engine. Returns `false` once the loop should exit.
pub fn apply(engine: &PhaseEngine, command: Command) -> bool {
    match command {
        Command::StartOrResume => {
            let state = engine.state();
            if state.is_idle() {
                engine.start();
            } else if state.paused {
                engine.resume();
            }
        }
        Command::Pause => engine.pause(),
        Command::Reset => engine.stop(),
        Command::Quit => {
            if !engine.state().is_idle() {
                engine.stop();
            }
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusLine {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub completed_work: u32,
    pub paused: bool,
    pub idle: bool,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
}

impl StatusLine {
    pub fn from_engine(engine: &PhaseEngine) -> Self {
        let state = engine.state();
        let remaining = engine.remaining();
        let total = engine.phase_duration(state.phase);
        Self::new(&state, remaining, total)
    }

    fn new(state: &State, remaining: Duration, total: Duration) -> Self {
        let ends_at = if state.is_running() {
            TimeDelta::from_std(remaining)
                .ok()
                .map(|left| (Local::now() + left).format("%H:%M:%S").to_string())
        } else {
            None
        };
        Self {
            phase: state.phase,
            remaining_secs: remaining.as_secs(),
            completed_work: state.completed_work,
            paused: state.paused,
            idle: state.is_idle(),
            progress: progress(state, remaining, total),
            ends_at,
        }
    }

    pub fn render_text(&self) -> String {
        if self.idle {
            return format!(
                "{} idle  completed: {}  press s to start",
                self.phase.emoji(),
                self.completed_work
            );
        }
        let mut line = format!(
            "{} {:<11} {} {} {:>3}%  completed: {}",
            self.phase.emoji(),
            self.phase.as_str(),
            format_clock(Duration::from_secs(self.remaining_secs)),
            bar(self.progress, BAR_WIDTH),
            (self.progress * 100.0).round() as u32,
            self.completed_work
        );
        if self.paused {
            line.push_str("  (paused)");
        } else if let Some(ends_at) = &self.ends_at {
            line.push_str(&format!("  ends {}", ends_at));
        }
        line
    }
}

/// Share of the current phase already elapsed, in `[0, 1]`.
pub fn progress(state: &State, remaining: Duration, total: Duration) -> f64 {
    if state.is_idle() || total.is_zero() {
        return 0.0;
    }
    let done = total.saturating_sub(remaining);
    (done.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
}

pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

fn draw(engine: &PhaseEngine, format: OutputFormat) -> io::Result<()> {
    let status = StatusLine::from_engine(engine);
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => write!(stdout, "\r\x1b[2K{}", status.render_text())?,
        OutputFormat::Json => {
            let json = serde_json::to_string(&status)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(stdout, "{}", json)?;
        }
    }
    stdout.flush()
}

type InputReceiver = mpsc::UnboundedReceiver<io::Result<String>>;

/// Reads stdin on a dedicated thread so a pending read never holds up runtime shutdown.
fn spawn_input_reader() -> InputReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Runs until `q`, end of input, or Ctrl+C. A running or paused engine is stopped on exit.
pub async fn run(engine: Arc<PhaseEngine>, format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Text {
        println!("{}", HELP);
    }

    let mut input = spawn_input_reader();
    let mut refresh = interval(Duration::from_millis(REFRESH_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                if let Err(e) = draw(&engine, format) {
                    warn!("failed to draw status: {}", e);
                }
            }
            line = input.recv() => {
                let command = match line {
                    Some(Ok(line)) => parse_command(&line),
                    None => Some(Command::Quit),
                    Some(Err(e)) => {
                        warn!("failed to read input: {}", e);
                        Some(Command::Quit)
                    }
                };
                let Some(command) = command else {
                    continue;
                };
                info!(?command, "command received");
                if !apply(&engine, command) {
                    break;
                }
                if let Err(e) = draw(&engine, format) {
                    warn!("failed to draw status: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                apply(&engine, Command::Quit);
                break;
            }
        }
    }

    if format == OutputFormat::Text {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::Config;
    use tokio::time::Instant;

    fn engine() -> PhaseEngine {
        PhaseEngine::new(Config {
            work: Duration::from_secs(100),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("s"), Some(Command::StartOrResume));
        assert_eq!(parse_command("  P \n"), Some(Command::Pause));
        assert_eq!(parse_command("reset"), Some(Command::Reset));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_or_resume_follows_state() {
        let engine = engine();
        assert!(apply(&engine, Command::StartOrResume));
        assert!(engine.state().is_running());

        tokio::time::advance(Duration::from_secs(30)).await;
        // running: start-or-resume must not restart the phase
        apply(&engine, Command::StartOrResume);
        assert_eq!(engine.remaining(), Duration::from_secs(70));

        apply(&engine, Command::Pause);
        assert!(engine.state().paused);
        apply(&engine, Command::StartOrResume);
        assert!(engine.state().is_running());
        assert_eq!(engine.remaining(), Duration::from_secs(70));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_quit_stop_engine() {
        let engine = engine();
        apply(&engine, Command::StartOrResume);
        assert!(apply(&engine, Command::Reset));
        assert!(engine.state().is_idle());

        apply(&engine, Command::StartOrResume);
        assert!(!apply(&engine, Command::Quit));
        assert!(engine.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_from_idle_sends_no_stop_notice() {
        let engine = engine();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine.set_subscriber(move |state| {
            let _ = tx.send(state);
        });

        assert!(!apply(&engine, Command::Quit));
        assert!(engine.state().is_idle());
        let got = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(got.is_err(), "unexpected notification: {got:?}");
    }

    #[test]
    fn test_progress() {
        let total = Duration::from_secs(100);
        let now = Instant::now();
        let running = State {
            phase: Phase::Work,
            started_at: Some(now),
            ends_at: Some(now + total),
            completed_work: 0,
            paused: false,
        };
        assert_eq!(progress(&running, total, total), 0.0);
        assert_eq!(progress(&running, Duration::from_secs(25), total), 0.75);
        assert_eq!(progress(&running, Duration::ZERO, total), 1.0);
        assert_eq!(progress(&running, Duration::from_secs(500), total), 0.0);
        assert_eq!(progress(&State::idle(0), Duration::ZERO, total), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(0)), "00:00");
        assert_eq!(format_clock(Duration::from_secs(25 * 60)), "25:00");
        assert_eq!(format_clock(Duration::from_secs(61)), "01:01");
        assert_eq!(format_clock(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(0.0, 4), "[....]");
        assert_eq!(bar(0.5, 4), "[##..]");
        assert_eq!(bar(2.0, 4), "[####]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_line_text_and_json() {
        let engine = engine();
        let idle = StatusLine::from_engine(&engine);
        assert!(idle.render_text().contains("press s to start"));

        engine.start();
        tokio::time::advance(Duration::from_secs(40)).await;
        let status = StatusLine::from_engine(&engine);
        assert_eq!(status.remaining_secs, 60);
        assert!(status.ends_at.is_some());
        let text = status.render_text();
        assert!(text.contains("WORK"));
        assert!(text.contains("01:00"));
        assert!(text.contains("40%"));

        engine.pause();
        let paused = StatusLine::from_engine(&engine);
        assert!(paused.render_text().ends_with("(paused)"));

        let json: serde_json::Value = serde_json::to_value(&paused).unwrap();
        assert_eq!(json["phase"], "WORK");
        assert_eq!(json["remaining_secs"], 60);
        assert_eq!(json["paused"], true);
        assert_eq!(json["idle"], false);
        assert!(json.get("ends_at").is_none());
    }
}
