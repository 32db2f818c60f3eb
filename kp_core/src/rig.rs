//! The Keypecker rig: one actuator, one capturer and one input queue bound
//! to one set of hardware handles.

use crate::actuator::{Actuator, ActuatorPins};
use crate::capture::Capturer;
use crate::input::InputQueue;
use crate::sample::Sampler;
use kp_common::actuator::StepPeriods;
use kp_hal::{HalError, HardwareBindings};
use std::sync::Arc;
use tracing::info;

/// A complete Keypecker instance.
pub struct Keypecker {
    actuator: Actuator,
    capturer: Arc<Capturer>,
    input: Arc<InputQueue>,
}

impl Keypecker {
    /// Take over the hardware and initialize every component.
    ///
    /// # Errors
    /// Returns an error if the actuator cannot be initialized.
    pub fn new(hw: HardwareBindings, periods: StepPeriods) -> Result<Self, HalError> {
        let HardwareBindings {
            disable,
            dir,
            step,
            step_timer,
            clock,
            capture_timer,
        } = hw;
        let actuator = Actuator::new(ActuatorPins { disable, dir, step }, step_timer, clock, periods)?;
        let capturer = Capturer::new(capture_timer);
        info!("keypecker initialized");
        Ok(Self {
            actuator,
            capturer,
            input: Arc::new(InputQueue::new()),
        })
    }

    /// The actuator motion controller.
    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    /// The capture engine.
    pub fn capturer(&self) -> &Capturer {
        &self.capturer
    }

    /// The user input queue.
    pub fn input(&self) -> &InputQueue {
        &self.input
    }

    /// A shareable handle to the input queue, for posting from other
    /// threads or signal handlers.
    pub fn input_handle(&self) -> Arc<InputQueue> {
        Arc::clone(&self.input)
    }

    /// A sampler over this rig's components.
    pub fn sampler(&self) -> Sampler<'_> {
        Sampler::new(&self.actuator, &self.capturer, &self.input)
    }
}
