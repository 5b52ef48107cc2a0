//! Clock abstraction and the two timer shapes the session needs: a repeating
//! interval and a one-shot deadline. Both are plain values polled against a
//! [`Clock`]; dropping one cancels it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Repeating timer. Fires once per elapsed period, catching up when polled late.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    pub fn new(started_at: Instant, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next_due: started_at + period,
        }
    }

    /// Number of periods that elapsed since the last poll.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next_due {
            fired += 1;
            self.next_due += self.period;
        }
        fired
    }
}

/// One-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    due: Instant,
}

impl Deadline {
    pub fn after(now: Instant, delay: Duration) -> Self {
        Self { due: now + delay }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_once_per_period() {
        let clock = ManualClock::new();
        let mut interval = Interval::new(clock.now(), Duration::from_secs(1));

        clock.advance(Duration::from_millis(999));
        assert_eq!(interval.poll(clock.now()), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(interval.poll(clock.now()), 1);
        assert_eq!(interval.poll(clock.now()), 0);
    }

    #[test]
    fn interval_catches_up_without_drift() {
        let clock = ManualClock::new();
        let mut interval = Interval::new(clock.now(), Duration::from_secs(1));

        clock.advance(Duration::from_millis(3500));
        assert_eq!(interval.poll(clock.now()), 3);
        clock.advance(Duration::from_millis(500));
        assert_eq!(interval.poll(clock.now()), 1);
    }

    #[test]
    fn zero_period_is_clamped() {
        let clock = ManualClock::new();
        let mut interval = Interval::new(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(3));
        assert_eq!(interval.poll(clock.now()), 3);
    }

    #[test]
    fn deadline_due_at_or_after() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(clock.now(), Duration::from_millis(2500));
        clock.advance(Duration::from_millis(2499));
        assert!(!deadline.is_due(clock.now()));
        clock.advance(Duration::from_millis(1));
        assert!(deadline.is_due(clock.now()));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.advance(Duration::from_secs(5));
        assert_eq!(a.now(), b.now());
    }
}
