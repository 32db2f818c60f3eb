//! Capture timer register model.
//!
//! The capture timer is a 16-bit up-counter with a slave trigger input and
//! [`CAP_CH_NUM`] input-capture channels. Once the trigger is armed, the
//! next active trigger edge starts the counter. Each enabled channel latches
//! the counter value on its configured edge. When the counter reaches the
//! auto-reload value an update event is raised.
//!
//! Events are reported through a status register ([`TimerFlags`]) and, for
//! the events enabled in the interrupt-enable register, an interrupt handler
//! call. Handlers run in interrupt context: they must not block.

use bitflags::bitflags;
use kp_common::capture::Edge;
use kp_common::consts::CAP_CH_NUM;
use static_assertions::const_assert_eq;

// The flag layout below has one capture and one overcapture bit per channel.
const_assert_eq!(CAP_CH_NUM, 2);

bitflags! {
    /// Capture timer status and interrupt-enable bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TimerFlags: u32 {
        /// Update event: the counter reached the auto-reload value.
        const UPDATE   = 1 << 0;
        /// Channel 0 captured an edge.
        const CC0      = 1 << 1;
        /// Channel 1 captured an edge.
        const CC1      = 1 << 2;
        /// The trigger input started the counter.
        const TRIGGER  = 1 << 6;
        /// Channel 0 saw another edge while its capture flag was set.
        const CC0_OVER = 1 << 9;
        /// Channel 1 saw another edge while its capture flag was set.
        const CC1_OVER = 1 << 10;
    }
}

impl TimerFlags {
    /// All capture flags.
    pub const CAPTURE_ALL: TimerFlags = TimerFlags::CC0.union(TimerFlags::CC1);

    /// All overcapture flags.
    pub const OVERCAPTURE_ALL: TimerFlags = TimerFlags::CC0_OVER.union(TimerFlags::CC1_OVER);

    /// Capture flag of a channel.
    ///
    /// # Panics
    /// Panics if `ch` is not below [`CAP_CH_NUM`].
    pub const fn capture(ch: usize) -> Self {
        match ch {
            0 => Self::CC0,
            1 => Self::CC1,
            _ => panic!("capture channel out of range"),
        }
    }

    /// Overcapture flag of a channel.
    ///
    /// # Panics
    /// Panics if `ch` is not below [`CAP_CH_NUM`].
    pub const fn overcapture(ch: usize) -> Self {
        match ch {
            0 => Self::CC0_OVER,
            1 => Self::CC1_OVER,
            _ => panic!("capture channel out of range"),
        }
    }
}

/// Interrupt handler connected to a capture timer.
pub type IsrHandler = Box<dyn Fn() + Send + Sync>;

/// Capture timer peripheral.
///
/// Register accessors never block. Owners keep the timer inside an
/// [`IsrCell`](crate::IsrCell) shared with the interrupt handler.
pub trait CaptureTimer: Send {
    /// Connect the interrupt handler, replacing any previous one.
    ///
    /// The handler is called whenever an event enabled in the interrupt
    /// register is raised. It may be called from any thread.
    fn connect_interrupt(&mut self, handler: IsrHandler);

    /// Set a channel's capture edge polarity.
    fn configure_channel(&mut self, ch: usize, edge: Edge);

    /// Enable a channel's input capture.
    fn enable_channel(&mut self, ch: usize);

    /// Disable a channel's input capture.
    fn disable_channel(&mut self, ch: usize);

    /// Whether a channel's input capture is enabled.
    fn is_channel_enabled(&self, ch: usize) -> bool;

    /// Read the status register.
    fn status(&self) -> TimerFlags;

    /// Clear status bits.
    fn clear_status(&mut self, flags: TimerFlags);

    /// Read the interrupt-enable register.
    fn interrupts(&self) -> TimerFlags;

    /// Write the interrupt-enable register.
    fn set_interrupts(&mut self, flags: TimerFlags);

    /// Current counter value, in ticks.
    fn counter(&self) -> u32;

    /// Reset the counter to zero.
    fn reset_counter(&mut self);

    /// Start (or resume) counting.
    fn enable_counter(&mut self);

    /// Stop counting, keeping the counter value.
    fn disable_counter(&mut self);

    /// Auto-reload value, in ticks.
    fn auto_reload(&self) -> u32;

    /// Set the auto-reload value, in ticks.
    fn set_auto_reload(&mut self, ticks: u32);

    /// Arm the slave trigger: the next trigger edge starts the counter.
    fn arm_trigger(&mut self);

    /// Disarm the slave trigger.
    fn disarm_trigger(&mut self);

    /// Whether the slave trigger is armed.
    fn is_trigger_armed(&self) -> bool;

    /// Read a channel's captured counter value, clearing its capture flag.
    fn read_capture(&mut self, ch: usize) -> u32;
}
