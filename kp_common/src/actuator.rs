//! Actuator value types.
//!
//! Positions are signed step counts relative to the power-on origin.
//! Positive positions are lower (closer to pressing the switch),
//! negative ones are higher.

use crate::config::ConfigError;
use crate::consts::{DEFAULT_STEP_PERIOD_MAX_US, DEFAULT_STEP_PERIOD_MIN_US, SPEED_MAX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actuator position, in steps.
pub type Position = i32;

/// Invalid (unavailable) actuator position, reported while powered off.
pub const POS_INVALID: Position = i32::MIN;

/// Minimum possible actuator position.
pub const POS_MIN: Position = i32::MIN + 1;

/// Maximum possible actuator position.
pub const POS_MAX: Position = i32::MAX;

/// Check if a position is valid.
#[inline]
pub const fn pos_is_valid(pos: Position) -> bool {
    pos != POS_INVALID
}

/// Actuator speed, 0-100% of the configured step rate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Speed(u8);

impl Speed {
    /// The slowest speed.
    pub const MIN: Speed = Speed(0);
    /// The fastest speed.
    pub const MAX: Speed = Speed(SPEED_MAX);

    /// Create a speed from a percentage.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if `percent` exceeds 100.
    pub fn new(percent: u8) -> Result<Self, ConfigError> {
        if percent > SPEED_MAX {
            return Err(ConfigError::ValidationError(format!(
                "speed {percent}% exceeds {SPEED_MAX}%"
            )));
        }
        Ok(Self(percent))
    }

    /// The speed percentage.
    #[inline]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Speed {
    type Error = ConfigError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<Speed> for u8 {
    fn from(speed: Speed) -> u8 {
        speed.0
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Step period bounds of an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPeriods {
    /// Step period at full speed, microseconds.
    #[serde(rename = "step_period_min_us")]
    pub min_us: u32,
    /// Step period at zero speed, microseconds.
    #[serde(rename = "step_period_max_us")]
    pub max_us: u32,
}

impl Default for StepPeriods {
    fn default() -> Self {
        Self {
            min_us: DEFAULT_STEP_PERIOD_MIN_US,
            max_us: DEFAULT_STEP_PERIOD_MAX_US,
        }
    }
}

impl StepPeriods {
    /// Validate the bounds.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` unless `0 < min_us <= max_us`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_us == 0 {
            return Err(ConfigError::ValidationError(
                "step_period_min_us must be positive".to_string(),
            ));
        }
        if self.min_us > self.max_us {
            return Err(ConfigError::ValidationError(format!(
                "step_period_min_us ({}) exceeds step_period_max_us ({})",
                self.min_us, self.max_us
            )));
        }
        Ok(())
    }

    /// Step period for a speed: higher speed gives a shorter period.
    pub fn period_us(&self, speed: Speed) -> u32 {
        let range = u64::from(self.max_us - self.min_us);
        self.max_us - (range * u64::from(speed.percent()) / u64::from(SPEED_MAX)) as u32
    }

    /// Delay letting the actuator's momentum settle before reversing, microseconds.
    ///
    /// Empirically tuned; keep the formula as is.
    pub fn turnaround_us(&self, speed: Speed) -> u32 {
        let range = u64::from(self.max_us - self.min_us);
        let half = u64::from(self.min_us) + range * u64::from(speed.percent()) / u64::from(SPEED_MAX);
        (2 * half).min(u64::from(u32::MAX)) as u32
    }
}

/// Result code of a movement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveResult {
    /// Target reached.
    Ok,
    /// Move aborted.
    Aborted,
    /// Actuator powered off before or during the move.
    PoweredOff,
    /// Waiting for the move to finish timed out.
    Timeout,
}

impl MoveResult {
    /// Upper-case name of the result.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Aborted => "ABORTED",
            Self::PoweredOff => "POWERED_OFF",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for MoveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
