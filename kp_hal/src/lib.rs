//! # Keypecker HAL Library
//!
//! Hardware abstraction for the Keypecker bench: the actuator's
//! disable/dir/step outputs, the step-pacing timer, the cycle clock and the
//! capture timer, plus the interrupt-safe cell shared by interrupt handlers
//! and threads.
//!
//! # Module Structure
//!
//! - [`isr_cell`] - Spinlock-class cell usable from interrupt context
//! - [`pin`] - Digital output trait
//! - [`clock`] - Cycle clock and step timer traits
//! - [`timer`] - Capture timer register model
//! - [`bindings`] - One set of hardware handles for a bench
//! - [`drivers`] - Driver implementations (simulation)
//! - [`error`] - HAL error type
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      kp_core                               │
//! │   Actuator ──────────────┐        Capturer ◄── ISR         │
//! └──────────┬───────────────┼───────────┬─────────────────────┘
//!            ▼               ▼           ▼
//!      OutputPin x3    StepTimer/Clock  CaptureTimer
//!            │               │           │
//!            └───────────────┴─────┬─────┘
//!                                  ▼
//!                        HardwareBindings (driver)
//! ```

#![deny(missing_docs)]

pub mod bindings;
pub mod clock;
pub mod drivers;
pub mod error;
pub mod isr_cell;
pub mod pin;
pub mod timer;

// Re-export key types for convenience
pub use crate::bindings::HardwareBindings;
pub use crate::clock::{Clock, StepTimer};
pub use crate::error::HalError;
pub use crate::isr_cell::{IsrCell, IsrGuard, in_critical_section};
pub use crate::pin::OutputPin;
pub use crate::timer::{CaptureTimer, IsrHandler, TimerFlags};
