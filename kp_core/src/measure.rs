//! Measurement acquisition.
//!
//! A measurement is a series of alternating passes between a top and a
//! bottom position, each sampled with the capture channels enabled for
//! the pass direction. Channel results of all passes are stored densely,
//! in pass order, as laid out by [`CaptureConfig::ch_res_idx`].
//!
//! ```text
//!   top ─┐     ┌─────┐     ┌─ ...      even_down = true
//!        │ p0  │ p1  │ p2  │
//!        ▼     │     ▼     │
//!   bottom ────┘     └─────┘
//! ```

use crate::sample::Sampler;
use kp_common::actuator::{Position, Speed, pos_is_valid};
use kp_common::capture::{CaptureConfig, CaptureDirs, ChannelResult};
use kp_common::consts::MEAS_CH_RES_MAX;
use kp_common::sample::SampleResult;
use tracing::{debug, info};

/// A measurement, acquired or in progress.
#[derive(Debug, Clone)]
pub struct Measurement {
    conf: CaptureConfig,
    top: Position,
    bottom: Position,
    speed: Speed,
    requested_passes: usize,
    even_down: bool,
    captured_passes: usize,
    passes: usize,
    ch_res: heapless::Vec<ChannelResult, MEAS_CH_RES_MAX>,
}

impl Measurement {
    /// Create an empty measurement of `passes` passes between `top` and
    /// `bottom`. Even passes go down if `even_down` is true.
    ///
    /// # Panics
    /// Panics if `top` is not above `bottom`, either is invalid, the
    /// capture configuration is invalid or has no enabled channels, or the
    /// results would not fit [`MEAS_CH_RES_MAX`].
    pub fn new(
        top: Position,
        bottom: Position,
        speed: Speed,
        passes: usize,
        conf: &CaptureConfig,
        even_down: bool,
    ) -> Self {
        assert!(pos_is_valid(top) && pos_is_valid(bottom), "invalid measurement range");
        assert!(top < bottom, "measurement top {top} not above bottom {bottom}");
        assert!(conf.is_valid(), "invalid capture configuration");
        assert!(conf.ch_num(CaptureDirs::BOTH) > 0, "no capture channels enabled");
        assert!(
            Self::fits(conf, even_down, passes),
            "{passes} passes exceed {MEAS_CH_RES_MAX} channel results"
        );
        Self {
            conf: conf.clone(),
            top,
            bottom,
            speed,
            requested_passes: passes,
            even_down,
            captured_passes: 0,
            passes: 0,
            ch_res: heapless::Vec::new(),
        }
    }

    /// Whether the results of `passes` passes fit a measurement.
    pub fn fits(conf: &CaptureConfig, even_down: bool, passes: usize) -> bool {
        conf.ch_res_idx(even_down, passes, 0) <= MEAS_CH_RES_MAX
    }

    /// Acquire the measurement, calling `pass_fn` after every pass.
    ///
    /// Moves to the starting boundary without capturing first. Stops at
    /// the first sample that doesn't succeed and returns its result; the
    /// passes done so far are kept.
    ///
    /// # Panics
    /// Panics if the measurement is not empty.
    pub fn acquire(
        &mut self,
        sampler: &Sampler<'_>,
        mut pass_fn: impl FnMut(&Measurement),
    ) -> SampleResult {
        assert!(self.is_empty(), "measurement already acquired");

        let start = if self.even_down { self.top } else { self.bottom };
        let rc = sampler.sample(start, self.speed, &self.conf, CaptureDirs::NONE, &mut []);
        if rc != SampleResult::Ok {
            return rc;
        }

        while self.passes < self.requested_passes {
            let down = self.even_down ^ (self.passes & 1 == 1);
            let dirs = CaptureDirs::from_down(down);
            let offset = self.ch_res.len();
            let ch_res_num = self.conf.ch_num(dirs);
            // Capacity was checked on creation.
            let resized = self
                .ch_res
                .resize(offset + ch_res_num, ChannelResult::default());
            assert!(resized.is_ok(), "no space for channel results");

            let target = if down { self.bottom } else { self.top };
            let rc = sampler.sample(
                target,
                self.speed,
                &self.conf,
                dirs,
                &mut self.ch_res[offset..],
            );
            if rc != SampleResult::Ok {
                self.ch_res.truncate(offset);
                info!(passes = self.passes, %rc, "measurement interrupted");
                return rc;
            }

            if ch_res_num != 0 {
                self.captured_passes += 1;
            }
            self.passes += 1;
            debug!(pass = self.passes - 1, dirs = dirs.keyword(), "pass acquired");
            pass_fn(self);
        }
        SampleResult::Ok
    }

    /// The capture configuration.
    pub fn conf(&self) -> &CaptureConfig {
        &self.conf
    }

    /// Top of the movement range.
    pub fn top(&self) -> Position {
        self.top
    }

    /// Bottom of the movement range.
    pub fn bottom(&self) -> Position {
        self.bottom
    }

    /// Movement speed.
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Whether even passes go down.
    pub fn even_down(&self) -> bool {
        self.even_down
    }

    /// Number of passes requested.
    pub fn requested_passes(&self) -> usize {
        self.requested_passes
    }

    /// Number of passes done so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of passes done so far with at least one channel captured.
    pub fn captured_passes(&self) -> usize {
        self.captured_passes
    }

    /// Directions covered by the requested passes.
    pub fn requested_dirs(&self) -> CaptureDirs {
        match self.requested_passes {
            0 => CaptureDirs::NONE,
            1 => CaptureDirs::from_down(self.even_down),
            _ => CaptureDirs::BOTH,
        }
    }

    /// Number of channels captured in any of the requested passes.
    pub fn requested_ch_num(&self) -> usize {
        self.conf.ch_num(self.requested_dirs())
    }

    /// Direction of a pass done.
    ///
    /// # Panics
    /// Panics if `pass` was not done yet.
    pub fn pass_dirs(&self, pass: usize) -> CaptureDirs {
        assert!(pass < self.passes, "pass {pass} not acquired");
        CaptureDirs::from_down(self.even_down ^ (pass & 1 == 1))
    }

    /// Number of channels captured in a pass done.
    ///
    /// # Panics
    /// Panics if `pass` was not done yet.
    pub fn pass_ch_num(&self, pass: usize) -> usize {
        self.conf.ch_num(self.pass_dirs(pass))
    }

    /// Channel results of a pass done, in channel order.
    ///
    /// # Panics
    /// Panics if `pass` was not done yet.
    pub fn pass_ch_res(&self, pass: usize) -> &[ChannelResult] {
        let ch_num = self.pass_ch_num(pass);
        let start = self.conf.ch_res_idx(self.even_down, pass, 0);
        &self.ch_res[start..start + ch_num]
    }

    /// Result of a channel in a pass done, `None` if the channel was not
    /// captured in the pass direction.
    ///
    /// # Panics
    /// Panics if `pass` was not done yet.
    pub fn ch_res(&self, pass: usize, ch: usize) -> Option<&ChannelResult> {
        let dirs = self.pass_dirs(pass);
        if !self.conf.channels.get(ch)?.dirs.intersects(dirs) {
            return None;
        }
        self.ch_res
            .get(self.conf.ch_res_idx(self.even_down, pass, ch))
    }

    /// Whether the measurement captures no results at all.
    pub fn is_null(&self) -> bool {
        self.conf
            .ch_res_idx(self.even_down, self.requested_passes, 0)
            == 0
    }

    /// Whether no passes were done yet.
    pub fn is_empty(&self) -> bool {
        self.passes == 0
    }
}
