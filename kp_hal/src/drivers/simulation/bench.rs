//! Simulated bench assembly.

use super::capture_timer::{SimCaptureTimer, SimCaptureTimerHandle};
use super::clock::SimClock;
use super::pin::SimPin;
use super::step_timer::SimStepTimer;
use super::switch::SimSwitch;
use crate::bindings::HardwareBindings;
use crate::error::HalError;
use kp_common::config::SimulationConfig;
use std::sync::Arc;
use tracing::info;

/// Observation side of a simulated bench.
///
/// Holds handles to the same simulated hardware whose driven side is
/// handed out as [`HardwareBindings`].
#[derive(Clone)]
pub struct SimulatedBench {
    /// Actuator "disable" output.
    pub disable: SimPin,
    /// Actuator direction output.
    pub dir: SimPin,
    /// Actuator step output.
    pub step: SimPin,
    /// The key switch under the actuator.
    pub switch: SimSwitch,
    /// Capture timer input injection.
    pub capture: SimCaptureTimerHandle,
    /// The cycle clock.
    pub clock: Arc<SimClock>,
}

impl SimulatedBench {
    /// Build a simulated bench.
    ///
    /// The actuator starts powered off: "disable" high, dir and step low.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` on invalid simulation parameters and
    /// `HalError::InitFailed` if the capture timer cannot start.
    pub fn new(config: &SimulationConfig) -> Result<(Self, HardwareBindings), HalError> {
        config.validate()?;

        let disable = SimPin::new("disable", true);
        let dir = SimPin::new("dir", false);
        let step = SimPin::new("step", false);
        let clock = Arc::new(SimClock::new(config.cycles_per_us, config.clock_offset_cycles));
        let timer = SimCaptureTimer::new()
            .map_err(|e| HalError::InitFailed(format!("capture timer thread: {e}")))?;
        let capture = timer.handle();
        let switch = SimSwitch::attach(config, &disable, &dir, &step, capture.clone());

        info!(
            actuation = config.actuation,
            bounce_edges = config.bounce_edges,
            cycles_per_us = config.cycles_per_us,
            "simulated bench ready"
        );

        let bindings = HardwareBindings {
            disable: Box::new(disable.clone()),
            dir: Box::new(dir.clone()),
            step: Box::new(step.clone()),
            step_timer: Box::new(SimStepTimer::new()),
            clock: clock.clone(),
            capture_timer: Box::new(timer),
        };
        let bench = Self {
            disable,
            dir,
            step,
            switch,
            capture,
            clock,
        };
        Ok((bench, bindings))
    }

    /// Total number of level changes on the actuator outputs.
    pub fn actuator_toggles(&self) -> u64 {
        self.disable.toggles() + self.dir.toggles() + self.step.toggles()
    }
}
