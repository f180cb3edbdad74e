//! Time source for the phase engine.
//!
//! The engine never reads the wall clock or sleeps directly; it asks a [`Clock`]
//! for the current instant and for cancelable countdowns. [`SystemClock`] is backed
//! by Tokio's timer so tests can also drive it with a paused runtime clock.

use futures_util::future::{self, BoxFuture, FutureExt};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// A single countdown.
pub trait Timer: Send {
    /// Resolves once the countdown elapses. Never resolves after a successful `cancel`.
    fn fired(&mut self) -> BoxFuture<'_, ()>;

    /// Stops the countdown. Returns `false` if it had already fired, in which case the
    /// pending signal must be discarded by the owner.
    fn cancel(&mut self) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn new_timer(&self, duration: Duration) -> Box<dyn Timer>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn new_timer(&self, duration: Duration) -> Box<dyn Timer> {
        Box::new(SleepTimer {
            sleep: Box::pin(tokio::time::sleep(duration)),
            cancelled: false,
        })
    }
}

struct SleepTimer {
    sleep: Pin<Box<Sleep>>,
    cancelled: bool,
}

impl Timer for SleepTimer {
    fn fired(&mut self) -> BoxFuture<'_, ()> {
        if self.cancelled {
            return future::pending().boxed();
        }
        self.sleep.as_mut().boxed()
    }

    fn cancel(&mut self) -> bool {
        self.cancelled = true;
        !self.sleep.is_elapsed()
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Clock whose time and timers only move when a test says so.
    pub(crate) struct ManualClock {
        inner: Mutex<Inner>,
    }

    struct Inner {
        now: Instant,
        timers: Vec<Handle>,
    }

    struct Handle {
        tx: mpsc::Sender<()>,
        fired: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        requested: Duration,
    }

    struct ManualTimer {
        rx: mpsc::Receiver<()>,
        fired: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: Mutex::new(Inner {
                    now: Instant::now(),
                    timers: Vec::new(),
                }),
            })
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut inner = self.inner.lock().unwrap();
            inner.now += by;
        }

        /// Fires the most recently created timer unless it was cancelled.
        pub(crate) fn fire_last(&self) {
            let inner = self.inner.lock().unwrap();
            if let Some(handle) = inner.timers.last() {
                if !handle.stopped.load(Ordering::SeqCst) {
                    handle.fired.store(true, Ordering::SeqCst);
                    let _ = handle.tx.try_send(());
                }
            }
        }

        pub(crate) fn timers_created(&self) -> usize {
            self.inner.lock().unwrap().timers.len()
        }

        pub(crate) fn last_requested(&self) -> Option<Duration> {
            self.inner
                .lock()
                .unwrap()
                .timers
                .last()
                .map(|handle| handle.requested)
        }

        pub(crate) fn live_timers(&self) -> usize {
            self.inner
                .lock()
                .unwrap()
                .timers
                .iter()
                .filter(|handle| !handle.stopped.load(Ordering::SeqCst))
                .count()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.inner.lock().unwrap().now
        }

        fn new_timer(&self, duration: Duration) -> Box<dyn Timer> {
            let (tx, rx) = mpsc::channel(1);
            let fired = Arc::new(AtomicBool::new(false));
            let stopped = Arc::new(AtomicBool::new(false));
            self.inner.lock().unwrap().timers.push(Handle {
                tx,
                fired: Arc::clone(&fired),
                stopped: Arc::clone(&stopped),
                requested: duration,
            });
            Box::new(ManualTimer { rx, fired, stopped })
        }
    }

    impl Timer for ManualTimer {
        fn fired(&mut self) -> BoxFuture<'_, ()> {
            async move {
                if self.rx.recv().await.is_none() {
                    future::pending::<()>().await;
                }
            }
            .boxed()
        }

        fn cancel(&mut self) -> bool {
            self.stopped.store(true, Ordering::SeqCst);
            // drain a signal that raced with the cancel
            let _ = self.rx.try_recv();
            !self.fired.load(Ordering::SeqCst)
        }
    }
}
