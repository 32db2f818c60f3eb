//! HAL driver implementations.
//!
//! This module contains all HAL driver implementations:
//!
//! - [`simulation`] - Software simulation of the bench for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement [`OutputPin`](crate::OutputPin), [`StepTimer`](crate::StepTimer),
//!    [`Clock`](crate::Clock) and [`CaptureTimer`](crate::CaptureTimer)
//! 3. Provide a constructor returning [`HardwareBindings`](crate::HardwareBindings)

pub mod simulation;
