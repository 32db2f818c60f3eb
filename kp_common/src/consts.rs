//! System-wide constants for the Keypecker workspace.
//!
//! Single source of truth for all numeric limits and defaults.

use static_assertions::const_assert;

/// Capture timer resolution, microseconds per tick.
pub const CAP_RES_US: u32 = 20;

/// Maximum value of the capture timer counter, ticks.
pub const CAP_CNT_MAX: u32 = u16::MAX as u32;

/// Maximum time a capture window (timeout + bounce) can take, microseconds.
pub const CAP_TIME_MAX_US: u32 = CAP_RES_US * CAP_CNT_MAX;

/// Number of available capture channels.
pub const CAP_CH_NUM: usize = 2;

/// Maximum number of characters in a channel name.
pub const CAP_CH_NAME_MAX_LEN: usize = 15;

/// Channel result value reported for channels that never captured.
pub const CAP_VALUE_NONE_US: u32 = u32::MAX;

/// Maximum actuator speed, percent.
pub const SPEED_MAX: u8 = 100;

/// Default shortest step period (full speed), microseconds.
pub const DEFAULT_STEP_PERIOD_MIN_US: u32 = 250;

/// Default longest step period (zero speed), microseconds.
pub const DEFAULT_STEP_PERIOD_MAX_US: u32 = 4000;

/// Width of a single step pulse, microseconds.
pub const STEP_PULSE_WIDTH_US: u32 = 2;

/// Maximum number of channel results a measurement can hold.
pub const MEAS_CH_RES_MAX: usize = 1024;

/// Depth of the input message queue.
pub const INPUT_QUEUE_DEPTH: usize = 16;

const_assert!(CAP_CH_NUM >= 1);
const_assert!(CAP_CNT_MAX <= u32::MAX / CAP_RES_US);
const_assert!(DEFAULT_STEP_PERIOD_MIN_US <= DEFAULT_STEP_PERIOD_MAX_US);
