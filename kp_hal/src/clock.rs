//! Cycle clock and step pacing timer.

use std::time::Duration;

/// Monotonic hardware cycle counter.
///
/// The counter is 32 bits wide and wraps around.
pub trait Clock: Send + Sync {
    /// Current cycle count.
    fn cycles(&self) -> u32;

    /// Number of cycles per microsecond.
    fn cycles_per_us(&self) -> u32;

    /// Wait for a short relative delay.
    fn delay_us(&self, us: u32);

    /// Convert a cycle count to microseconds, rounding down.
    fn cycles_to_us(&self, cycles: u32) -> u32 {
        cycles / self.cycles_per_us().max(1)
    }
}

/// Periodic timer pacing the actuator steps.
///
/// Only the motion thread owns and drives its step timer.
pub trait StepTimer: Send {
    /// Start (or restart) firing every `period`, first expiry one period away.
    fn start(&mut self, period: Duration);

    /// Stop the timer.
    fn stop(&mut self);

    /// Wait for the next expiry.
    ///
    /// Returns `false` immediately if the timer is stopped or not started.
    fn sync(&mut self) -> bool;
}
