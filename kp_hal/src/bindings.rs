//! Hardware handles bound to one bench.

use crate::clock::{Clock, StepTimer};
use crate::pin::OutputPin;
use crate::timer::CaptureTimer;
use std::sync::Arc;

/// One complete set of hardware handles: the actuator's outputs and step
/// pacing, the cycle clock, and the capture timer.
///
/// Consumed by the components that own each piece of hardware.
pub struct HardwareBindings {
    /// Actuator "disable" output (high = powered off).
    pub disable: Box<dyn OutputPin>,
    /// Actuator direction output (high = moving up).
    pub dir: Box<dyn OutputPin>,
    /// Actuator step output.
    pub step: Box<dyn OutputPin>,
    /// Timer pacing actuator steps.
    pub step_timer: Box<dyn StepTimer>,
    /// Cycle clock.
    pub clock: Arc<dyn Clock>,
    /// Capture timer.
    pub capture_timer: Box<dyn CaptureTimer>,
}
