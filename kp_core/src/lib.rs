//! # Keypecker Core Library
//!
//! Drives a stepper actuator pressing and releasing a key switch while
//! timing the switch's electrical edges against the actuator's first step.
//!
//! # Module Structure
//!
//! - [`actuator`] - Actuator motion controller
//! - [`capture`] - Capture engine
//! - [`sample`] - Sampling orchestrator (move + capture, range check)
//! - [`measure`] - Multi-pass measurement acquisition
//! - [`input`] - User input message queue
//! - [`sync`] - Semaphores, timeouts and the multi-source poller
//! - [`rig`] - All of the above bound to one set of hardware handles
//!
//! # Architecture
//!
//! ```text
//!                ┌──────────────┐
//!   InputQueue ─►│   Sampler    │
//!                └──┬────────┬──┘
//!        start/finish│        │start/finish
//!                   ▼        ▼
//!            ┌──────────┐ ┌──────────┐
//!            │ Actuator │ │ Capturer │◄── capture timer ISR
//!            └────┬─────┘ └────┬─────┘
//!   motion thread │            │
//!                 ▼            ▼
//!      disable/dir/step    CaptureTimer
//!        step pulse ─────► trigger input
//! ```

pub mod actuator;
pub mod capture;
pub mod input;
pub mod measure;
pub mod rig;
pub mod sample;
pub mod sync;

pub use crate::rig::Keypecker;
