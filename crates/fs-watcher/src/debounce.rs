//! Quiet-period detection.
//!
//! [`Debouncer`] holds at most one deadline. Every qualifying event pushes it
//! to `now + window`; once the deadline passes with no further events,
//! [`Debouncer::poll`] reports it exactly once.

use std::time::Duration;

use tokio::time::Instant;

/// A single-deadline debounce state machine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tokio::time::Instant;
/// use fs_watcher::Debouncer;
///
/// let mut debouncer = Debouncer::new(Duration::from_millis(100));
/// let t0 = Instant::now();
///
/// debouncer.record(t0);
/// debouncer.record(t0 + Duration::from_millis(60));
/// assert!(!debouncer.poll(t0 + Duration::from_millis(120)));
/// assert!(debouncer.poll(t0 + Duration::from_millis(160)));
/// assert!(!debouncer.poll(t0 + Duration::from_millis(500)));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
    pending_events: u64,
}

impl Debouncer {
    /// Creates an idle debouncer.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            pending_events: 0,
        }
    }

    /// Returns the quiet period.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Records a qualifying event seen at `now`, resetting the deadline.
    pub fn record(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        self.pending_events += 1;
    }

    /// Returns the armed deadline, if any.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` while events are waiting for their quiet period.
    #[inline]
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of events collapsed into the armed deadline.
    #[inline]
    #[must_use]
    pub const fn pending_events(&self) -> u64 {
        self.pending_events
    }

    /// Returns `true` once, when the deadline has passed at `now`, and disarms.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending_events = 0;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(2000);

    #[test]
    fn test_idle_never_fires() {
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.is_armed());
        assert!(!debouncer.poll(Instant::now() + WINDOW * 10));
    }

    #[test]
    fn test_burst_collapses_to_one_fire() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        for i in 0..10 {
            debouncer.record(t0 + Duration::from_millis(i * 100));
        }
        assert_eq!(debouncer.pending_events(), 10);
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(900) + WINDOW));

        assert!(!debouncer.poll(t0 + WINDOW));
        assert!(debouncer.poll(t0 + Duration::from_millis(900) + WINDOW));
        assert!(!debouncer.poll(t0 + WINDOW * 5));
        assert_eq!(debouncer.pending_events(), 0);
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();

        debouncer.record(t0);
        assert!(debouncer.poll(t0 + WINDOW));

        let t1 = t0 + WINDOW * 3;
        debouncer.record(t1);
        assert!(debouncer.is_armed());
        assert!(debouncer.poll(t1 + WINDOW));
    }
}
