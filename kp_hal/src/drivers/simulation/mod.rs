//! Simulation driver module.
//!
//! Software models of the bench hardware, so the control logic can run and
//! be tested without a physical actuator, switch or capture timer:
//!
//! - [`SimPin`] - Output pin recording its level and toggles
//! - [`SimClock`] - Wrapping cycle counter derived from the host clock
//! - [`SimStepTimer`] - Sleep-paced periodic timer
//! - [`SimCaptureTimer`] - Capture timer register model with an expiry thread
//! - [`SimSwitch`] - Key switch pressed by the simulated actuator
//! - [`SimulatedBench`] - All of the above, wired together

mod bench;
mod capture_timer;
mod clock;
mod pin;
mod step_timer;
mod switch;

pub use bench::SimulatedBench;
pub use capture_timer::{SimCaptureTimer, SimCaptureTimerHandle};
pub use clock::SimClock;
pub use pin::SimPin;
pub use step_timer::SimStepTimer;
pub use switch::SimSwitch;
