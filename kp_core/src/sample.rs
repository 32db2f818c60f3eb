//! Sampling orchestrator.
//!
//! A sample is one actuator movement with a capture running alongside it.
//! The capture is armed before the movement starts, so the first step pulse
//! triggers its window. While both are in flight the orchestrator waits on
//! user input, move completion and capture completion at once; an abort
//! message from the user aborts both.

use crate::actuator::Actuator;
use crate::capture::Capturer;
use crate::input::{InputMsg, InputQueue};
use crate::sync::{Pollable, Poller, Timeout};
use kp_common::actuator::{MoveResult, Position, Speed, pos_is_valid};
use kp_common::capture::{CaptureConfig, CaptureDirs, CaptureResultCode, ChannelResult};
use kp_common::consts::CAP_CH_NUM;
use kp_common::sample::SampleResult;
use tracing::{debug, info, warn};

/// Outcome of [`Sampler::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Result of the last sample taken.
    pub result: SampleResult,
    /// Passes in which every captured channel triggered.
    pub triggers: usize,
}

/// Runs samples with one actuator, one capturer and one input queue.
#[derive(Clone, Copy)]
pub struct Sampler<'a> {
    actuator: &'a Actuator,
    capturer: &'a Capturer,
    input: &'a InputQueue,
}

impl<'a> Sampler<'a> {
    /// Create a sampler over the given components.
    pub fn new(actuator: &'a Actuator, capturer: &'a Capturer, input: &'a InputQueue) -> Self {
        Self {
            actuator,
            capturer,
            input,
        }
    }

    /// Move to `target`, capturing the channels enabled for `dirs`.
    ///
    /// Channel results are written to `results` as by
    /// [`Capturer::finish`]. If the actuator is already at `target`
    /// nothing moves and `results` is filled with zeroed timeouts.
    ///
    /// # Panics
    /// Panics on an invalid target or capture configuration.
    pub fn sample(
        &self,
        target: Position,
        speed: Speed,
        conf: &CaptureConfig,
        dirs: CaptureDirs,
        results: &mut [ChannelResult],
    ) -> SampleResult {
        assert!(pos_is_valid(target), "invalid sample target");
        assert!(conf.is_valid(), "invalid capture configuration");

        let start = self.actuator.locate();
        if !pos_is_valid(start) {
            return SampleResult::PoweredOff;
        }
        if target == start {
            results.fill(ChannelResult::default());
            return SampleResult::Ok;
        }

        self.capturer.start(conf, dirs);
        self.actuator.start_move_to(target, speed);

        let poller = Poller::new();
        let mut move_rc: Option<MoveResult> = None;
        let mut cap_rc: Option<CaptureResultCode> = None;
        let mut user_aborted = false;

        while move_rc.is_none() || cap_rc.is_none() {
            let sources: [&dyn Pollable; 3] = [
                self.input,
                self.actuator.done_event(),
                self.capturer.done_event(),
            ];
            let Some([input, moved, captured]) = poller.poll(sources, Timeout::Forever) else {
                continue;
            };

            if input && self.input.try_get() == Some(InputMsg::Abort) {
                debug!("sample aborted by user");
                user_aborted = true;
                self.actuator.abort();
                self.capturer.abort();
            }

            if moved && move_rc.is_none() {
                let rc = self.actuator.finish_move(Timeout::Forever);
                // No steps will trigger the capture anymore.
                if rc == MoveResult::PoweredOff && cap_rc.is_none() {
                    self.capturer.abort();
                }
                move_rc = Some(rc);
            }

            if captured && cap_rc.is_none() {
                cap_rc = Some(self.capturer.finish(results, Timeout::Forever));
            }
        }

        match (move_rc, cap_rc) {
            (Some(MoveResult::PoweredOff), _) if !user_aborted => SampleResult::PoweredOff,
            (Some(move_rc), Some(cap_rc)) => SampleResult::reduce(move_rc, cap_rc),
            _ => unreachable!("sample loop exited with uncollected results"),
        }
    }

    /// Run `passes` capturing passes between `top` and `bottom`, counting
    /// the passes in which every captured channel triggered.
    ///
    /// Starts by moving, without capturing, to the nearer boundary. Passes
    /// in a direction without enabled channels are not counted.
    ///
    /// # Panics
    /// Panics on invalid positions or configuration, or if no channel is
    /// enabled in either direction.
    pub fn check(
        &self,
        top: Position,
        bottom: Position,
        speed: Speed,
        passes: usize,
        conf: &CaptureConfig,
    ) -> CheckOutcome {
        assert!(pos_is_valid(top) && pos_is_valid(bottom), "invalid check range");
        assert!(conf.is_valid(), "invalid capture configuration");
        assert!(conf.ch_num(CaptureDirs::BOTH) > 0, "no capture channels enabled");

        let mut outcome = CheckOutcome {
            result: SampleResult::Ok,
            triggers: 0,
        };
        if passes == 0 {
            return outcome;
        }

        let pos = self.actuator.locate();
        if !pos_is_valid(pos) {
            outcome.result = SampleResult::PoweredOff;
            return outcome;
        }
        let even_down = pos.abs_diff(top) < pos.abs_diff(bottom);
        outcome.result = self.sample(
            if even_down { top } else { bottom },
            speed,
            conf,
            CaptureDirs::NONE,
            &mut [],
        );
        if outcome.result != SampleResult::Ok {
            return outcome;
        }

        let mut results = [ChannelResult::default(); CAP_CH_NUM];
        let mut pass = 0usize;
        let mut captured_passes = 0usize;
        while captured_passes < passes {
            let down = even_down ^ (pass & 1 == 1);
            let dirs = CaptureDirs::from_down(down);
            outcome.result = self.sample(
                if down { bottom } else { top },
                speed,
                conf,
                dirs,
                &mut results,
            );
            if outcome.result != SampleResult::Ok {
                warn!(pass, result = %outcome.result, "check interrupted");
                return outcome;
            }

            let ch_num = conf.ch_num(dirs);
            if ch_num > 0 {
                captured_passes += 1;
                if results[..ch_num].iter().all(ChannelResult::triggered) {
                    outcome.triggers += 1;
                }
            }
            pass += 1;
        }

        info!(passes, triggers = outcome.triggers, "check finished");
        outcome
    }
}
