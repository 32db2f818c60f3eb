//! Simulated step timer.

use crate::clock::StepTimer;
use std::thread;
use std::time::{Duration, Instant};

/// A periodic timer paced by sleeping until each expiry.
///
/// Expiries missed by more than one period are dropped rather than
/// delivered in a burst.
#[derive(Debug, Default)]
pub struct SimStepTimer {
    period: Option<Duration>,
    next: Option<Instant>,
}

impl SimStepTimer {
    /// Create a stopped timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.period.is_some()
    }
}

impl StepTimer for SimStepTimer {
    fn start(&mut self, period: Duration) {
        self.period = Some(period);
        self.next = Some(Instant::now() + period);
    }

    fn stop(&mut self) {
        self.period = None;
        self.next = None;
    }

    fn sync(&mut self) -> bool {
        let (Some(period), Some(next)) = (self.period, self.next) else {
            return false;
        };
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        let following = next + period;
        let now = Instant::now();
        self.next = Some(if following + period < now {
            now + period
        } else {
            following
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_timer_does_not_sync() {
        let mut timer = SimStepTimer::new();
        assert!(!timer.sync());
        timer.start(Duration::from_micros(100));
        assert!(timer.is_running());
        timer.stop();
        assert!(!timer.sync());
    }

    #[test]
    fn sync_waits_for_each_period() {
        let mut timer = SimStepTimer::new();
        let period = Duration::from_millis(2);
        let start = Instant::now();
        timer.start(period);
        for _ in 0..5 {
            assert!(timer.sync());
        }
        assert!(start.elapsed() >= period * 5);
    }
}
