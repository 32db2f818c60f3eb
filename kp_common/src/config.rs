//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! and the layout of the Keypecker configuration file.
//!
//! # Usage
//!
//! ```rust,no_run
//! use kp_common::config::{ConfigError, ConfigLoader, KeypeckerConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = KeypeckerConfig::load(Path::new("keypecker.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::actuator::{Position, Speed, StepPeriods, pos_is_valid};
use crate::capture::{CaptureConfig, ChannelConfig};
use crate::consts::CAP_CH_NUM;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// The matching `tracing` level.
    pub const fn as_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "keypecker-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// `[capture]` section: the capture window and up to [`CAP_CH_NUM`] channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSection {
    /// Maximum time to wait for all channels, microseconds.
    pub timeout_us: u32,
    /// Minimum time to wait for a channel to bounce, microseconds.
    #[serde(default)]
    pub bounce_us: u32,
    /// Channel configurations; missing channels are disabled.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl CaptureSection {
    /// Build a validated capture configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` on too many channels or an
    /// oversized window.
    pub fn to_capture_config(&self) -> Result<CaptureConfig, ConfigError> {
        if self.channels.len() > CAP_CH_NUM {
            return Err(ConfigError::ValidationError(format!(
                "{} capture channels configured, at most {CAP_CH_NUM} available",
                self.channels.len()
            )));
        }
        let mut conf = CaptureConfig {
            timeout_us: self.timeout_us,
            bounce_us: self.bounce_us,
            ..Default::default()
        };
        for (slot, ch) in conf.channels.iter_mut().zip(&self.channels) {
            *slot = ch.clone();
        }
        conf.validate()?;
        Ok(conf)
    }
}

/// `[check]` section: the range and passes to exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSection {
    /// Top position of the movement range.
    pub top: Position,
    /// Bottom position of the movement range.
    pub bottom: Position,
    /// Movement speed.
    pub speed: Speed,
    /// Number of passes to execute.
    pub passes: usize,
}

impl CheckSection {
    /// Validate the range.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if either position is invalid
    /// or `top` is not above `bottom`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !pos_is_valid(self.top) || !pos_is_valid(self.bottom) {
            return Err(ConfigError::ValidationError(
                "check positions must be valid".to_string(),
            ));
        }
        if self.top >= self.bottom {
            return Err(ConfigError::ValidationError(format!(
                "check top ({}) must be less than bottom ({})",
                self.top, self.bottom
            )));
        }
        Ok(())
    }
}

/// How a simulated capture channel is wired to the simulated key switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelWiring {
    /// Follows the switch: rising on press, falling on release.
    #[default]
    Level,
    /// Pulses (rising, then falling) on every switch transition.
    Pulse,
    /// Never changes.
    Disconnected,
}

/// `[simulation]` section: the simulated key switch and clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Position at and below which the simulated switch is pressed.
    pub actuation: Position,
    /// Extra edge pairs emitted after each switch transition.
    #[serde(default)]
    pub bounce_edges: u32,
    /// Simulated clock frequency, cycles per microsecond.
    #[serde(default = "default_cycles_per_us")]
    pub cycles_per_us: u32,
    /// Initial simulated cycle counter value.
    #[serde(default)]
    pub clock_offset_cycles: u32,
    /// Wiring of each capture channel.
    #[serde(default = "default_wiring")]
    pub channels: [ChannelWiring; CAP_CH_NUM],
}

fn default_cycles_per_us() -> u32 {
    1
}

fn default_wiring() -> [ChannelWiring; CAP_CH_NUM] {
    [ChannelWiring::Level; CAP_CH_NUM]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            actuation: 0,
            bounce_edges: 0,
            cycles_per_us: default_cycles_per_us(),
            clock_offset_cycles: 0,
            channels: default_wiring(),
        }
    }
}

impl SimulationConfig {
    /// Validate the simulation parameters.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` on a zero clock frequency or
    /// an invalid actuation position.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycles_per_us == 0 {
            return Err(ConfigError::ValidationError(
                "cycles_per_us must be positive".to_string(),
            ));
        }
        if !pos_is_valid(self.actuation) {
            return Err(ConfigError::ValidationError(
                "actuation position must be valid".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete Keypecker configuration file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "keypecker"
///
/// [actuator]
/// step_period_min_us = 250
/// step_period_max_us = 4000
///
/// [capture]
/// timeout_us = 200000
/// bounce_us = 5000
/// channels = [{ dirs = "both", edge = "rising", name = "switch" }]
///
/// [check]
/// top = 0
/// bottom = 40
/// speed = 100
/// passes = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypeckerConfig {
    /// Common fields.
    pub shared: SharedConfig,
    /// Actuator step period bounds.
    #[serde(default)]
    pub actuator: StepPeriods,
    /// Capture window and channels.
    pub capture: CaptureSection,
    /// Range check parameters.
    pub check: CheckSection,
    /// Simulated hardware parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl KeypeckerConfig {
    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first `ConfigError::ValidationError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.actuator.validate()?;
        self.capture.to_capture_config()?;
        self.check.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureDirs, Edge};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
        [shared]
        service_name = "keypecker-test"
        log_level = "debug"

        [actuator]
        step_period_min_us = 300
        step_period_max_us = 3000

        [capture]
        timeout_us = 100000
        bounce_us = 2000
        [[capture.channels]]
        dirs = "down"
        edge = "rising"
        name = "press"

        [check]
        top = -5
        bottom = 30
        speed = 80
        passes = 6

        [simulation]
        actuation = 12
        bounce_edges = 2
        channels = ["pulse", "disconnected"]
    "#;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_shared_config_validation() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: String::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_full_config_parses() {
        let config: KeypeckerConfig = toml::from_str(FULL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.actuator.min_us, 300);
        assert_eq!(config.check.speed.percent(), 80);
        assert_eq!(config.simulation.bounce_edges, 2);
        assert_eq!(config.simulation.channels[0], ChannelWiring::Pulse);

        let capture = config.capture.to_capture_config().unwrap();
        assert_eq!(capture.channels[0].dirs, CaptureDirs::DOWN);
        assert_eq!(capture.channels[0].edge, Edge::Rising);
        assert_eq!(capture.channels[1].dirs, CaptureDirs::NONE);
        assert_eq!(capture.timeout_us, 100_000);
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config: KeypeckerConfig = toml::from_str(
            r#"
            [shared]
            service_name = "kp"
            [capture]
            timeout_us = 1000
            [check]
            top = 0
            bottom = 10
            speed = 100
            passes = 4
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.actuator, StepPeriods::default());
        assert_eq!(config.capture.bounce_us, 0);
        assert_eq!(config.simulation.cycles_per_us, 1);
    }

    #[test]
    fn test_too_many_channels_rejected() {
        let section = CaptureSection {
            timeout_us: 10,
            bounce_us: 0,
            channels: vec![ChannelConfig::default(); CAP_CH_NUM + 1],
        };
        assert!(matches!(
            section.to_capture_config(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let check = CheckSection {
            top: 10,
            bottom: 10,
            speed: Speed::MAX,
            passes: 1,
        };
        assert!(check.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = KeypeckerConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.service_name, "keypecker-test");
    }

    #[test]
    fn test_load_missing_file() {
        let result = KeypeckerConfig::load(Path::new("/nonexistent/keypecker.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[shared\nservice_name = ").unwrap();
        let result = KeypeckerConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
