//! Fire-once, cancellable timers measured against the frame clock.
//!
//! Timers never call back: the owner polls them once per frame, which keeps
//! every state change inside the single update pass.

use std::time::Duration;

/// A timer that fires at most once per arming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    deadline: Option<Duration>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire `delay` after `now`, replacing any pending deadline.
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Clears a pending deadline. No-op if idle.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fires_once_at_deadline() {
        let mut timer = OneShotTimer::new();
        timer.arm(ms(100), ms(400));

        assert!(!timer.poll(ms(499)));
        assert!(timer.poll(ms(500)));
        assert!(!timer.poll(ms(501)));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timer = OneShotTimer::new();
        timer.arm(ms(0), ms(10));
        timer.cancel();

        assert!(!timer.poll(ms(1000)));
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut timer = OneShotTimer::new();
        timer.arm(ms(0), ms(10));
        timer.arm(ms(5), ms(100));

        assert!(!timer.poll(ms(20)));
        assert_eq!(timer.deadline(), Some(ms(105)));
        assert!(timer.poll(ms(105)));
    }
}
