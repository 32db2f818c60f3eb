//! Capture configuration and result types.
//!
//! A capture times electrical edges on up to [`CAP_CH_NUM`] channels,
//! relative to a trigger edge, within a bounded window. Each channel is
//! captured only for the movement directions it is configured for.
//!
//! Channel results are densely packed: only channels enabled for the
//! captured direction get a result slot, in channel order.

use crate::config::ConfigError;
use crate::consts::{CAP_CH_NAME_MAX_LEN, CAP_CH_NUM, CAP_RES_US, CAP_TIME_MAX_US};
use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Set of movement directions to capture in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CaptureDirs: u8 {
        /// Capture on the way up.
        const UP   = 0x01;
        /// Capture on the way down.
        const DOWN = 0x02;
        /// Capture both ways.
        const BOTH = Self::UP.bits() | Self::DOWN.bits();
    }
}

impl CaptureDirs {
    /// No capture.
    pub const NONE: CaptureDirs = CaptureDirs::empty();

    /// The unit direction set for a movement direction.
    #[inline]
    pub const fn from_down(down: bool) -> Self {
        if down { Self::DOWN } else { Self::UP }
    }

    /// Parse a direction set keyword (none/up/down/both), ignoring case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [Self::NONE, Self::UP, Self::DOWN, Self::BOTH]
            .into_iter()
            .find(|dirs| dirs.keyword().eq_ignore_ascii_case(keyword))
    }

    /// Lower-case keyword of the direction set.
    pub fn keyword(self) -> &'static str {
        match (self.contains(Self::UP), self.contains(Self::DOWN)) {
            (false, false) => "none",
            (true, false) => "up",
            (false, true) => "down",
            (true, true) => "both",
        }
    }

    /// Capitalized name of the direction set.
    pub fn title(self) -> &'static str {
        match (self.contains(Self::UP), self.contains(Self::DOWN)) {
            (false, false) => "None",
            (true, false) => "Up",
            (false, true) => "Down",
            (true, true) => "Both",
        }
    }
}

impl Serialize for CaptureDirs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.keyword())
    }
}

impl<'de> Deserialize<'de> for CaptureDirs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keyword = String::deserialize(deserializer)?;
        Self::from_keyword(&keyword).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid capture direction '{keyword}', expected none/up/down/both"
            ))
        })
    }
}

/// Edge polarity a channel captures on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Low-to-high transition.
    #[default]
    Rising,
    /// High-to-low transition.
    Falling,
}

/// Capture channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// The movement directions to capture in.
    #[serde(default)]
    pub dirs: CaptureDirs,
    /// The edge to capture.
    #[serde(default)]
    pub edge: Edge,
    /// User's channel name, may be empty.
    #[serde(default)]
    pub name: heapless::String<CAP_CH_NAME_MAX_LEN>,
}

impl ChannelConfig {
    /// Create an unnamed channel configuration.
    pub fn new(dirs: CaptureDirs, edge: Edge) -> Self {
        Self {
            dirs,
            edge,
            name: heapless::String::new(),
        }
    }

    /// Set the channel name.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the name is longer than
    /// [`CAP_CH_NAME_MAX_LEN`] bytes.
    pub fn with_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.name = heapless::String::try_from(name).map_err(|_| {
            ConfigError::ValidationError(format!(
                "channel name '{name}' is longer than {CAP_CH_NAME_MAX_LEN} characters"
            ))
        })?;
        Ok(self)
    }
}

/// Capture configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Channel configurations, in channel order.
    pub channels: [ChannelConfig; CAP_CH_NUM],
    /// Maximum time to wait for all channels to be captured, microseconds.
    pub timeout_us: u32,
    /// Minimum time to wait for a captured channel to bounce, microseconds.
    pub bounce_us: u32,
}

impl CaptureConfig {
    /// Check the window fits the capture timer.
    pub fn is_valid(&self) -> bool {
        self.timeout_us
            .checked_add(self.bounce_us)
            .is_some_and(|window| window <= CAP_TIME_MAX_US)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if `timeout_us + bounce_us`
    /// exceeds [`CAP_TIME_MAX_US`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_valid() {
            return Err(ConfigError::ValidationError(format!(
                "capture window timeout_us ({}) + bounce_us ({}) exceeds {CAP_TIME_MAX_US}us",
                self.timeout_us, self.bounce_us
            )));
        }
        Ok(())
    }

    /// Number of timer ticks in the timeout.
    #[inline]
    pub fn timeout_ticks(&self) -> u32 {
        self.timeout_us / CAP_RES_US
    }

    /// Number of timer ticks in the bounce period.
    #[inline]
    pub fn bounce_ticks(&self) -> u32 {
        self.bounce_us / CAP_RES_US
    }

    /// Number of channels enabled for any of the specified directions.
    pub fn ch_num(&self, dirs: CaptureDirs) -> usize {
        self.channels
            .iter()
            .filter(|ch| ch.dirs.intersects(dirs))
            .count()
    }

    /// Index of a channel's result for a pass in a dense list of results
    /// accumulated over alternating passes.
    ///
    /// Even passes go down if `even_down` is true, up otherwise. The
    /// returned index for channel 0 of pass `n` equals the number of results
    /// accumulated by passes `0..n`.
    pub fn ch_res_idx(&self, even_down: bool, pass: usize, ch: usize) -> usize {
        assert!(ch < CAP_CH_NUM, "channel index {ch} out of range");
        let odd_pass = pass & 1 == 1;
        let even_dirs = CaptureDirs::from_down(even_down);
        let pass_dirs = CaptureDirs::from_down(even_down ^ odd_pass);
        let mut round_ch_res_num = 0;
        let mut pass_ch_res_idx = 0;

        for (i, ch_conf) in self.channels.iter().enumerate() {
            round_ch_res_num += ch_conf.dirs.bits().count_ones() as usize;
            if odd_pass && ch_conf.dirs.intersects(even_dirs) {
                pass_ch_res_idx += 1;
            }
            if i < ch && ch_conf.dirs.intersects(pass_dirs) {
                pass_ch_res_idx += 1;
            }
        }

        round_ch_res_num * (pass >> 1) + pass_ch_res_idx
    }
}

/// Channel capture status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelStatus {
    /// No edge within the timeout.
    #[default]
    Timeout,
    /// Edge captured.
    Ok,
    /// More than one edge captured before the result was read.
    Overcapture,
}

impl ChannelStatus {
    /// Upper-case name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Ok => "OK",
            Self::Overcapture => "OVERCAPTURE",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel capture result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelResult {
    /// Capture status.
    pub status: ChannelStatus,
    /// Time from trigger to the (first) captured edge, microseconds.
    pub value_us: u32,
}

impl ChannelResult {
    /// Whether the channel saw an edge within the timeout.
    #[inline]
    pub fn triggered(&self) -> bool {
        self.status != ChannelStatus::Timeout
    }
}

/// Capture result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureResultCode {
    /// Capture finished, check individual channel results.
    Ok,
    /// Capture aborted, channel results not modified.
    Aborted,
    /// Waiting for the capture timed out, channel results not modified.
    Timeout,
}

impl CaptureResultCode {
    /// Upper-case name of the result code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Aborted => "ABORTED",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for CaptureResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
