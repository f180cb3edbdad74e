use notify_rust::Notification;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::pomodoro::{Config, Phase, State};

pub const NOTIFICATION_TITLE: &str = "Pomodoro Timer";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("desktop notification failed: {0}")]
    Desktop(#[from] notify_rust::error::Error),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        Notification::new()
            .summary(title)
            .body(body)
            .timeout(0) // No auto-dismiss
            .show()?;
        Ok(())
    }
}

fn minutes(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}-minute", secs / 60)
    } else {
        format!("{}-second", secs)
    }
}

/// Notification body for a snapshot handed out by the engine.
pub fn phase_message(state: &State, config: &Config) -> String {
    if state.is_idle() {
        return "Timer stopped.".to_string();
    }
    match state.phase {
        Phase::Work => format!(
            "Break is over! Starting {} work session.",
            minutes(config.work)
        ),
        Phase::ShortBreak => format!(
            "Work session complete! Time for a {} break.",
            minutes(config.short_break)
        ),
        Phase::LongBreak => format!(
            "{} work sessions done! Time for a {} long break.",
            state.completed_work,
            minutes(config.long_break)
        ),
    }
}

/// Engine callback that logs each change and forwards it to `notifier`.
/// Delivery failures are logged and otherwise ignored.
pub fn subscriber(
    notifier: Option<Arc<dyn Notifier>>,
    config: Config,
) -> impl Fn(State) + Send + Sync + 'static {
    move |state: State| {
        let message = phase_message(&state, &config);
        info!(phase = %state.phase, completed_work = state.completed_work, "{}", message);
        if let Some(notifier) = &notifier {
            if let Err(e) = notifier.notify(NOTIFICATION_TITLE, &message) {
                warn!("failed to send notification: {}", e);
            }
        }
    }
}
