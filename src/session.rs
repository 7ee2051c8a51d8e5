//! The countdown state machine for a single work session.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    display::Display,
    error::{PomoError, Result},
    notify::Notifier,
    record::{BREAK_MINUTES, SESSION_MINUTES, SessionRecord, task_label},
};

pub const SESSION_SECS: u64 = SESSION_MINUTES * 60;
pub const TICK: Duration = Duration::from_secs(1);
/// Longest accepted tick; keeps tick arithmetic far from overflow.
pub const MAX_TICK: Duration = Duration::from_secs(60);

// ============================================================================
// State & Signals
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Sent by the display (or a signal handler) to the running controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Abort,
    Pause,
    Resume,
}

/// What pausing does to the countdown.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PausePolicy {
    /// Only the display stops refreshing; the session still ends at
    /// `start + duration`.
    #[default]
    DisplayOnly,
    /// Paused ticks are not consumed, so the session runs longer by the time
    /// spent paused.
    FreezeElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(SessionRecord),
    Aborted {
        task: String,
        start: NaiveDateTime,
        aborted_at: NaiveDateTime,
    },
}

impl SessionOutcome {
    /// The record to persist; `None` for aborted sessions.
    pub fn record(&self) -> Option<&SessionRecord> {
        match self {
            Self::Completed(record) => Some(record),
            Self::Aborted { .. } => None,
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Time source and tick pacing for the controller.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Local>;

    /// Waits up to `timeout` for a control signal.
    fn wait(
        &self,
        signals: &Receiver<ControlSignal>,
        timeout: Duration,
    ) -> std::result::Result<ControlSignal, RecvTimeoutError>;

    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn wait(
        &self,
        signals: &Receiver<ControlSignal>,
        timeout: Duration,
    ) -> std::result::Result<ControlSignal, RecvTimeoutError> {
        signals.recv_timeout(timeout)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct SessionController {
    notifier: Box<dyn Notifier>,
    display: Box<dyn Display>,
    signals: Receiver<ControlSignal>,
    clock: Box<dyn Clock>,
    tick: Duration,
    pause_policy: PausePolicy,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        notifier: Box<dyn Notifier>,
        display: Box<dyn Display>,
        signals: Receiver<ControlSignal>,
    ) -> Self {
        Self {
            notifier,
            display,
            signals,
            clock: Box::new(SystemClock),
            tick: TICK,
            pause_policy: PausePolicy::default(),
            state: SessionState::Idle,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.clamp(Duration::from_millis(1), MAX_TICK);
        self
    }

    pub fn with_pause_policy(mut self, policy: PausePolicy) -> Self {
        self.pause_policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs one session of `duration` ticks to completion or abort. Blocks
    /// the calling thread for the length of the session.
    pub fn start(&mut self, task: Option<&str>, duration: u64) -> Result<SessionOutcome> {
        if self.state != SessionState::Idle {
            return Err(PomoError::SessionFinished(self.state));
        }

        let task = task_label(task);
        self.state = SessionState::Running;
        let length = describe_length(self.tick.saturating_mul(clamp_u32(duration)));
        self.notifier.notify(
            &format!("Your {length} starts now"),
            &format!("Working on: {task}"),
            false,
        );
        // Console notifications must not land on a display that owns the screen.
        self.display.begin();
        let start = self.clock.now();
        info!(%task, ticks = duration, policy = ?self.pause_policy, "session started");

        let finished = self.countdown(duration, start);
        let stopped_at = self.clock.now();
        self.display.shutdown();

        let outcome = match finished {
            Countdown::Expired => {
                self.state = SessionState::Completed;
                self.notifier.notify(
                    "Time's up!",
                    &format!("Take a {BREAK_MINUTES} minute break..."),
                    true,
                );
                info!(%task, "session completed");
                SessionOutcome::Completed(SessionRecord::new(
                    Some(task.as_str()),
                    start.naive_local(),
                    stopped_at.naive_local(),
                ))
            }
            Countdown::Aborted => {
                self.state = SessionState::Aborted;
                self.notifier.notify(
                    "Pomodoro aborted",
                    &format!("Stopped working on: {task}"),
                    false,
                );
                info!(%task, "session aborted");
                SessionOutcome::Aborted {
                    task,
                    start: start.naive_local(),
                    aborted_at: stopped_at.naive_local(),
                }
            }
        };

        Ok(outcome)
    }

    fn countdown(&mut self, duration: u64, start: DateTime<Local>) -> Countdown {
        let mut remaining = duration;
        let mut anchor = start;
        let mut elapsed_ticks: u64 = 0;
        let mut paused = false;
        let mut signals_open = true;

        self.push_remaining(remaining);

        while remaining > 0 {
            let next_tick = anchor + self.ticks_to_delta(elapsed_ticks + 1);
            let timeout = (next_tick - self.clock.now()).to_std().unwrap_or(Duration::ZERO);

            let event = if signals_open {
                self.clock.wait(&self.signals, timeout)
            } else {
                self.clock.sleep(timeout);
                Err(RecvTimeoutError::Timeout)
            };

            match event {
                Ok(ControlSignal::Abort) => return Countdown::Aborted,
                Ok(ControlSignal::Pause) => {
                    if !paused {
                        debug!(remaining, "paused");
                        paused = true;
                    }
                    continue;
                }
                Ok(ControlSignal::Resume) => {
                    if paused {
                        debug!(remaining, "resumed");
                        paused = false;
                        if self.pause_policy == PausePolicy::FreezeElapsed {
                            anchor = self.clock.now();
                            elapsed_ticks = 0;
                        }
                        self.push_remaining(remaining);
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Nothing can resume a frozen session once the sender is gone.
                    debug!("control channel closed; running headless");
                    signals_open = false;
                    if paused && self.pause_policy == PausePolicy::FreezeElapsed {
                        anchor = self.clock.now();
                        elapsed_ticks = 0;
                    }
                    paused = false;
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            elapsed_ticks += 1;
            if paused && self.pause_policy == PausePolicy::FreezeElapsed {
                continue;
            }

            remaining -= 1;
            if !paused && remaining > 0 {
                self.push_remaining(remaining);
            }
        }

        Countdown::Expired
    }

    fn ticks_to_delta(&self, ticks: u64) -> TimeDelta {
        let tick = i64::try_from(self.tick.as_millis()).unwrap_or(i64::MAX);
        let ticks = i64::try_from(ticks).unwrap_or(i64::MAX);
        TimeDelta::try_milliseconds(tick.saturating_mul(ticks)).unwrap_or(TimeDelta::MAX)
    }

    fn push_remaining(&mut self, remaining: u64) {
        let left = self.tick.saturating_mul(clamp_u32(remaining));
        self.display.set_remaining(&format_remaining(left));
    }
}

enum Countdown {
    Expired,
    Aborted,
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Session length as the start notification words it: whole minutes when it
/// divides evenly, otherwise seconds, otherwise milliseconds.
fn describe_length(length: Duration) -> String {
    fn plural(n: u128, unit: &str) -> String {
        if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
    }

    let millis = length.as_millis();
    if millis >= 60_000 && millis % 60_000 == 0 {
        plural(millis / 60_000, "minute")
    } else if millis % 1000 == 0 {
        plural(millis / 1000, "second")
    } else {
        plural(millis, "millisecond")
    }
}

/// `H:MM:SS`, the way the countdown is shown to the user.
pub fn format_remaining(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
