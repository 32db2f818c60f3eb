//! Prelude module for common re-exports.
//!
//! ```rust
//! use kp_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, KeypeckerConfig, SharedConfig};

// ─── Actuator ───────────────────────────────────────────────────────
pub use crate::actuator::{MoveResult, POS_INVALID, Position, Speed, StepPeriods, pos_is_valid};

// ─── Capture ────────────────────────────────────────────────────────
pub use crate::capture::{
    CaptureConfig, CaptureDirs, CaptureResultCode, ChannelConfig, ChannelResult, ChannelStatus,
    Edge,
};

// ─── Sampling ───────────────────────────────────────────────────────
pub use crate::sample::SampleResult;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CAP_CH_NUM, CAP_RES_US, CAP_TIME_MAX_US};
