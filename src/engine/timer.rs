//! Owned periodic timers.
//!
//! [`TimerDriver::start`] hands back a [`TimerHandle`]; the timer runs until the
//! handle is dropped or [`TimerHandle::cancel`]led. Whoever holds the handle owns
//! the timer, so a single `Option<TimerHandle>` slot can never hold two live
//! timers.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use parking_lot::Mutex;

use crate::core::errors::{FlowError, Result};

/// Tick callback. Returning `false` stops the timer from the inside.
pub type TickFn = Box<dyn FnMut() -> bool + Send>;

/// Cancel-on-drop handle for one running timer.
pub struct TimerHandle {
    interval: Duration,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(interval: Duration, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            interval,
            cancel: Some(Box::new(cancel)),
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the timer now. Equivalent to dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Source of periodic ticks.
pub trait TimerDriver: Send {
    /// Start calling `on_tick` every `interval` until the handle goes away.
    fn start(&self, interval: Duration, on_tick: TickFn) -> Result<TimerHandle>;
}

fn reject_zero(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(FlowError::Runtime {
            details: "timer interval must be greater than zero".to_string(),
        });
    }
    Ok(())
}

// ──────────────────── thread driver ────────────────────

/// Wall-clock timers, one thread per timer.
///
/// The thread waits on a cancel channel with `recv_timeout(interval)`; a
/// timeout is a tick, a disconnect is a cancel. Cancelling joins the thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimerDriver;

impl TimerDriver for ThreadTimerDriver {
    fn start(&self, interval: Duration, mut on_tick: TickFn) -> Result<TimerHandle> {
        reject_zero(interval)?;
        let (cancel_tx, cancel_rx) = bounded::<()>(1);

        let join = thread::Builder::new()
            .name("cfm-timer".to_string())
            .spawn(move || {
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !on_tick() {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|source| FlowError::Runtime {
                details: format!("failed to spawn timer thread: {source}"),
            })?;

        Ok(TimerHandle::new(interval, move || {
            drop(cancel_tx);
            let _ = join.join();
        }))
    }
}

// ──────────────────── manual driver ────────────────────

struct ManualTimer {
    id: u64,
    interval: Duration,
    next_due: Duration,
    on_tick: TickFn,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
}

/// Virtual-clock driver: time only moves when [`ManualTimerDriver::advance`]
/// is called. Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualTimerDriver {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimerDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Timers that have not been cancelled.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Move the clock forward by `by`, firing every tick that falls due, in
    /// due-time order. Returns the number of ticks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let mut state = self.state.lock();
        let target = state.now + by;
        let mut fired = 0;
        loop {
            let Some(idx) = state
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.next_due <= target)
                .min_by_key(|(_, t)| (t.next_due, t.id))
                .map(|(idx, _)| idx)
            else {
                break;
            };
            let due = state.timers[idx].next_due;
            state.now = due;
            let timer = &mut state.timers[idx];
            timer.next_due = due + timer.interval;
            fired += 1;
            if !(timer.on_tick)() {
                state.timers.remove(idx);
            }
        }
        state.now = target;
        fired
    }
}

impl TimerDriver for ManualTimerDriver {
    fn start(&self, interval: Duration, on_tick: TickFn) -> Result<TimerHandle> {
        reject_zero(interval)?;
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            let next_due = state.now + interval;
            state.timers.push(ManualTimer {
                id,
                interval,
                next_due,
                on_tick,
            });
            id
        };
        let shared = Arc::clone(&self.state);
        Ok(TimerHandle::new(interval, move || {
            shared.lock().timers.retain(|t| t.id != id);
        }))
    }
}

impl fmt::Debug for ManualTimerDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualTimerDriver")
            .field("now", &state.now)
            .field("timers", &state.timers.len())
            .finish()
    }
}
