//! Deadline-driven Pomodoro phase engine.
//!
//! All state lives behind one `RwLock`. Every command and every deadline fire takes the
//! write side, so transitions are linearized. At most one deadline watcher is alive at a
//! time: spawning a watcher always cancels the previous token first, and a watcher only
//! mutates state after re-checking its token under the lock.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::error::ConfigError;
use super::pomodoro::{Config, MAX_PHASE_DURATION, Phase, State};

/// Callback invoked with a snapshot on every phase change and on stop.
pub type Subscriber = Arc<dyn Fn(State) + Send + Sync>;

pub struct PhaseEngine {
    shared: Arc<Shared>,
}

struct Shared {
    config: Config,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    core: RwLock<Core>,
    subscriber: RwLock<Option<Subscriber>>,
}

struct Core {
    state: State,
    /// Authoritative remaining time while paused.
    paused_remaining: Duration,
    watcher: Option<CancellationToken>,
}

impl PhaseEngine {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an idle engine bound to the current Tokio runtime.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                clock,
                runtime,
                core: RwLock::new(Core {
                    state: State::idle(0),
                    paused_remaining: Duration::ZERO,
                    watcher: None,
                }),
                subscriber: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Replaces the registered subscriber.
    pub fn set_subscriber<F>(&self, subscriber: F)
    where
        F: Fn(State) + Send + Sync + 'static,
    {
        *self
            .shared
            .subscriber
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(subscriber));
    }

    pub fn state(&self) -> State {
        self.shared.read().state
    }

    /// Time left in the current phase. Zero when idle or past the deadline.
    pub fn remaining(&self) -> Duration {
        let core = self.shared.read();
        if core.state.paused {
            return core.paused_remaining;
        }
        match core.state.ends_at {
            Some(ends_at) => ends_at.saturating_duration_since(self.shared.clock.now()),
            None => Duration::ZERO,
        }
    }

    pub fn phase_duration(&self, phase: Phase) -> Duration {
        self.shared.config.duration(phase)
    }

    /// (Re)enters a full-length work phase, discarding whatever was running.
    pub fn start(&self) {
        let mut core = self.shared.write();
        let now = self.shared.clock.now();
        core.state = State {
            phase: Phase::Work,
            started_at: Some(now),
            ends_at: Some(deadline(now, self.shared.config.work)),
            completed_work: core.state.completed_work,
            paused: false,
        };
        core.paused_remaining = Duration::ZERO;
        self.shared.spawn_watcher(&mut core);
        info!(duration = ?self.shared.config.work, "work phase started");
    }

    pub fn pause(&self) {
        let mut core = self.shared.write();
        if core.state.paused || core.state.is_idle() {
            return;
        }
        let remaining = core
            .state
            .ends_at
            .map(|ends_at| ends_at.saturating_duration_since(self.shared.clock.now()))
            .unwrap_or_default();
        core.paused_remaining = remaining;
        core.state.paused = true;
        Shared::cancel_watcher(&mut core);
        info!(phase = %core.state.phase, ?remaining, "paused");
    }

    pub fn resume(&self) {
        let mut core = self.shared.write();
        if !core.state.paused {
            return;
        }
        let now = self.shared.clock.now();
        let remaining = core.paused_remaining;
        core.state.started_at = Some(now);
        core.state.ends_at = Some(deadline(now, remaining));
        core.state.paused = false;
        core.paused_remaining = Duration::ZERO;
        self.shared.spawn_watcher(&mut core);
        info!(phase = %core.state.phase, ?remaining, "resumed");
    }

    /// Cancels the watcher and returns to idle. The completed work count is kept.
    pub fn stop(&self) {
        let snapshot = {
            let mut core = self.shared.write();
            Shared::cancel_watcher(&mut core);
            core.state = State::idle(core.state.completed_work);
            core.paused_remaining = Duration::ZERO;
            core.state
        };
        info!("stopped");
        self.shared.notify(snapshot);
    }

    #[cfg(test)]
    fn has_watcher(&self) -> bool {
        self.shared
            .read()
            .watcher
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

/// `now + duration`, clamped to the longest valid phase instead of overflowing.
fn deadline(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(MAX_PHASE_DURATION))
        .unwrap_or(now)
}

impl Drop for PhaseEngine {
    fn drop(&mut self) {
        Shared::cancel_watcher(&mut self.shared.write());
    }
}

impl fmt::Debug for PhaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.read();
        f.debug_struct("PhaseEngine")
            .field("config", &self.shared.config)
            .field("state", &core.state)
            .field("paused_remaining", &core.paused_remaining)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Core> {
        self.core.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Core> {
        self.core.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_watcher(core: &mut Core) {
        if let Some(token) = core.watcher.take() {
            token.cancel();
        }
    }

    /// Replaces the watcher with one waiting for the current `ends_at`.
    /// Must be called with the write lock held.
    fn spawn_watcher(self: &Arc<Self>, core: &mut Core) {
        Self::cancel_watcher(core);
        let Some(ends_at) = core.state.ends_at else {
            return;
        };

        let delay = ends_at.saturating_duration_since(self.clock.now());
        let token = CancellationToken::new();
        core.watcher = Some(token.clone());

        let mut timer = self.clock.new_timer(delay);
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let fired = tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = timer.fired() => true,
            };
            if fired {
                shared.advance(&token);
            } else if !timer.cancel() {
                debug!("deadline fired concurrently with cancellation, discarded");
            }
        });
        debug!(?delay, "deadline watcher spawned");
    }

    fn advance(self: &Arc<Self>, token: &CancellationToken) {
        let snapshot = {
            let mut core = self.write();
            // lost the race against a command that replaced this watcher
            if token.is_cancelled() {
                debug!("stale deadline ignored");
                return;
            }

            let next = match core.state.phase {
                Phase::Work => {
                    core.state.completed_work = core.state.completed_work.saturating_add(1);
                    self.config.break_after(core.state.completed_work)
                }
                Phase::ShortBreak | Phase::LongBreak => Phase::Work,
            };
            let now = self.clock.now();
            core.state.phase = next;
            core.state.started_at = Some(now);
            core.state.ends_at = Some(deadline(now, self.config.duration(next)));
            self.spawn_watcher(&mut core);
            info!(
                phase = %next,
                completed_work = core.state.completed_work,
                "phase advanced"
            );
            core.state
        };
        self.notify(snapshot);
    }

    /// Hands the snapshot to the subscriber on the blocking pool. Never called with the
    /// state lock held.
    fn notify(&self, snapshot: State) {
        let subscriber = self
            .subscriber
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(subscriber) = subscriber {
            self.runtime.spawn_blocking(move || subscriber(snapshot));
        }
    }
}
