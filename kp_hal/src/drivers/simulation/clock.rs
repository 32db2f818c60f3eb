//! Simulated cycle clock.

use crate::clock::Clock;
use std::thread;
use std::time::{Duration, Instant};

/// Delays up to this long are busy-waited, longer ones slept.
const SPIN_DELAY_MAX_US: u32 = 200;

/// A 32-bit wrapping cycle counter running at a fixed rate from creation.
///
/// A non-zero initial offset brings the wraparound point close, so code
/// measuring elapsed cycles can be exercised across it.
#[derive(Debug, Clone)]
pub struct SimClock {
    epoch: Instant,
    cycles_per_us: u32,
    offset: u32,
}

impl SimClock {
    /// Create a clock at `cycles_per_us`, starting from `offset` cycles.
    ///
    /// # Panics
    /// Panics if `cycles_per_us` is zero.
    pub fn new(cycles_per_us: u32, offset: u32) -> Self {
        assert!(cycles_per_us > 0, "clock frequency must be positive");
        Self {
            epoch: Instant::now(),
            cycles_per_us,
            offset,
        }
    }
}

impl Clock for SimClock {
    fn cycles(&self) -> u32 {
        let elapsed_ns = self.epoch.elapsed().as_nanos();
        let cycles = elapsed_ns * u128::from(self.cycles_per_us) / 1000;
        // Truncation models the 32-bit counter wrapping.
        self.offset.wrapping_add(cycles as u32)
    }

    fn cycles_per_us(&self) -> u32 {
        self.cycles_per_us
    }

    fn delay_us(&self, us: u32) {
        let delay = Duration::from_micros(u64::from(us));
        if us <= SPIN_DELAY_MAX_US {
            let start = Instant::now();
            while start.elapsed() < delay {
                std::hint::spin_loop();
            }
        } else {
            thread::sleep(delay);
        }
    }
}
