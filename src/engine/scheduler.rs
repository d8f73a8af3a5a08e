//! Refresh scheduling state machine.
//!
//! Pure bookkeeping: the scheduler decides *whether* to fetch and what should
//! happen to the timer slot; the runtime owns the actual [`TimerHandle`].
//!
//! [`TimerHandle`]: super::timer::TimerHandle

use std::time::Duration;

use crate::domain::TimeRange;

/// Default auto-refresh interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Manual refresh only.
    Idle,
    /// A periodic timer is (or is about to be) running at this interval.
    AutoScheduled(Duration),
}

/// What the timer slot should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Leave the slot as it is.
    Keep,
    /// Replace whatever is in the slot with a new timer.
    Start { generation: u64, interval: Duration },
    /// Empty the slot.
    Cancel,
}

/// Outcome of one scheduler operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub fetch: bool,
    pub timer: TimerAction,
}

impl Decision {
    const NOTHING: Self = Self {
        fetch: false,
        timer: TimerAction::Keep,
    };
    const FETCH: Self = Self {
        fetch: true,
        timer: TimerAction::Keep,
    };

    const fn timer(timer: TimerAction) -> Self {
        Self {
            fetch: false,
            timer,
        }
    }
}

/// Idle / auto-refresh state machine with timer generations.
///
/// Every started or cancelled timer bumps the generation, so ticks that were
/// already queued by a superseded timer can be told apart and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshScheduler {
    state: SchedulerState,
    interval: Duration,
    time_range: TimeRange,
    generation: u64,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(TimeRange::default(), DEFAULT_INTERVAL)
    }
}

impl RefreshScheduler {
    #[must_use]
    pub const fn new(time_range: TimeRange, interval: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            interval,
            time_range,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(self.state, SchedulerState::AutoScheduled(_))
    }

    /// Stored interval, used by the next `enable_auto`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn time_range(&self) -> TimeRange {
        self.time_range
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Changing the range always fetches, whatever the state.
    pub const fn set_time_range(&mut self, range: TimeRange) -> Decision {
        self.time_range = range;
        Decision::FETCH
    }

    /// Start (or restart) periodic refresh. A zero interval leaves the
    /// scheduler untouched.
    pub const fn enable_auto(&mut self, interval: Duration) -> Decision {
        if interval.is_zero() {
            return Decision::NOTHING;
        }
        self.interval = interval;
        self.restart()
    }

    pub const fn disable_auto(&mut self) -> Decision {
        match self.state {
            SchedulerState::Idle => Decision::NOTHING,
            SchedulerState::AutoScheduled(_) => {
                self.state = SchedulerState::Idle;
                self.generation += 1;
                Decision::timer(TimerAction::Cancel)
            }
        }
    }

    /// While enabled the timer is replaced; while idle the interval is only
    /// stored. Zero while enabled turns auto-refresh off.
    pub const fn change_interval(&mut self, interval: Duration) -> Decision {
        match self.state {
            SchedulerState::Idle => {
                if !interval.is_zero() {
                    self.interval = interval;
                }
                Decision::NOTHING
            }
            SchedulerState::AutoScheduled(_) if interval.is_zero() => self.disable_auto(),
            SchedulerState::AutoScheduled(_) => {
                self.interval = interval;
                self.restart()
            }
        }
    }

    pub const fn manual_refresh(&self) -> Decision {
        Decision::FETCH
    }

    /// A tick from timer `generation`. Only the live generation fetches.
    #[must_use]
    pub const fn on_tick(&self, generation: u64) -> Decision {
        if self.is_auto() && generation == self.generation {
            Decision::FETCH
        } else {
            Decision::NOTHING
        }
    }

    const fn restart(&mut self) -> Decision {
        self.state = SchedulerState::AutoScheduled(self.interval);
        self.generation += 1;
        Decision::timer(TimerAction::Start {
            generation: self.generation,
            interval: self.interval,
        })
    }
}
