use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Time source and sleeper used by the producer and the consumer loop.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Block until `deadline`. Returns immediately if it has already passed.
    fn sleep_until(&self, deadline: SystemTime) {
        if let Ok(remaining) = deadline.duration_since(self.now()) {
            if !remaining.is_zero() {
                self.sleep(remaining);
            }
        }
    }
}

/// Wall clock backed by `SystemTime::now` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock: `sleep` advances `now` instantly and records the
/// requested duration.
#[derive(Debug)]
pub struct VirtualClock {
    state: Mutex<VirtualState>,
}

#[derive(Debug)]
struct VirtualState {
    now: SystemTime,
    sleeps: Vec<Duration>,
}

impl VirtualState {
    // Time stops at the latest representable instant instead of overflowing.
    fn advance(&mut self, duration: Duration) {
        if let Some(next) = self.now.checked_add(duration) {
            self.now = next;
        }
    }
}

impl VirtualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            state: Mutex::new(VirtualState {
                now: start,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.advance(duration);
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> SystemTime {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.advance(duration);
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn virtual_sleep_advances_and_records() {
        let start = UNIX_EPOCH + Duration::from_secs(100);
        let clock = VirtualClock::new(start);

        clock.sleep(Duration::from_millis(250));
        clock.sleep(Duration::from_millis(750));

        assert_eq!(clock.now(), start + Duration::from_secs(1));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(250), Duration::from_millis(750)]
        );
        assert_eq!(clock.total_slept(), Duration::from_secs(1));
    }

    #[test]
    fn sleep_until_past_deadline_does_not_sleep() {
        let start = UNIX_EPOCH + Duration::from_secs(100);
        let clock = VirtualClock::new(start);

        clock.sleep_until(start - Duration::from_secs(1));
        clock.sleep_until(start);

        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn sleep_until_future_deadline_lands_exactly() {
        let start = UNIX_EPOCH + Duration::from_secs(100);
        let clock = VirtualClock::new(start);
        let deadline = start + Duration::from_millis(1_234);

        clock.sleep_until(deadline);

        assert_eq!(clock.now(), deadline);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1_234)]);
    }

    #[test]
    fn oversized_sleep_does_not_overflow() {
        let start = UNIX_EPOCH + Duration::from_secs(100);
        let clock = VirtualClock::new(start);

        clock.sleep(Duration::MAX);
        clock.advance(Duration::MAX);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.sleeps(), vec![Duration::MAX]);
    }

    #[test]
    fn advance_is_not_a_sleep() {
        let start = UNIX_EPOCH;
        let clock = VirtualClock::new(start);
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), start + Duration::from_secs(3));
        assert!(clock.sleeps().is_empty());
    }
}
