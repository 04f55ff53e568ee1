/// Scheduled work for a challenge, polled from the frame loop.
///
/// Nothing here spawns threads or callbacks: each task remembers when it is
/// next due, and the owner calls `poll(now)` once per frame. A task has a
/// single owner, `cancel()` on an idle task is a no-op, and starting a task
/// that is already running replaces the old schedule.

use std::time::{Duration, Instant};

/// Repeating task (timer display refresh).
#[derive(Clone, Debug)]
pub struct Interval {
    period: Duration,
    next_due: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Interval { period: period.max(Duration::from_millis(1)), next_due: None }
    }

    /// (Re)start the interval. Any previous schedule is dropped.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// True at most once per call when the interval is due. Missed periods
    /// collapse into one firing.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(mut due) = self.next_due else { return false };
        if now < due {
            return false;
        }
        while due <= now {
            due += self.period;
        }
        self.next_due = Some(due);
        true
    }
}

/// One-shot task (advance to the next level after a pass).
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    due: Option<Instant>,
}

impl Deadline {
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Fires once, then the deadline is spent.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Elapsed-time source for scoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChallengeClock {
    started_at: Option<Instant>,
}

impl ChallengeClock {
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    /// Whole seconds since `start`, or 0 if the clock is not running.
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        self.started_at
            .map_or(0, |t| now.saturating_duration_since(t).as_secs())
    }
}
