//! Capture engine.
//!
//! Times edges on the capture channel inputs relative to the trigger input
//! (the actuator's first step pulse), using the capture timer and its
//! interrupt.
//!
//! # State Machine
//!
//! ```text
//!   IDLE ──start()──► ARMED ──trigger──► ACTIVE ──window expired──► done
//!                       │                  │
//!                       └──abort()─────────┴──────────────────────► done
//! ```
//!
//! The window is `timeout + bounce` long. Once every enabled channel has
//! captured, the window is shortened to end one bounce period later, but
//! never lengthened. Exactly one capture may be in flight: [`Capturer::start`]
//! waits until the previous capture's result was collected by
//! [`Capturer::finish`].

use crate::sync::{Pollable, Semaphore, Timeout};
use kp_common::capture::{
    CaptureConfig, CaptureDirs, CaptureResultCode, ChannelResult, ChannelStatus,
};
use kp_common::consts::{CAP_CH_NUM, CAP_RES_US, CAP_VALUE_NONE_US};
use kp_hal::{CaptureTimer, IsrCell, TimerFlags};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct State {
    timer: Box<dyn CaptureTimer>,
    aborted: bool,
    timeout_ticks: u32,
    bounce_ticks: u32,
    /// Capture flags of the enabled channels.
    ch_mask: TimerFlags,
}

impl State {
    /// Handle one pending timer event. Returns `true` when the window ended.
    fn service(&mut self) -> bool {
        if self.aborted {
            return false;
        }
        let timer = &mut self.timer;
        let status = timer.status();
        let interrupts = timer.interrupts();
        let pending = status & interrupts;

        if pending.contains(TimerFlags::TRIGGER) {
            timer.set_interrupts(interrupts - TimerFlags::TRIGGER);
            timer.clear_status(TimerFlags::TRIGGER);
            false
        } else if pending.contains(TimerFlags::UPDATE) {
            timer.disarm_trigger();
            timer.disable_counter();
            timer.set_interrupts(TimerFlags::empty());
            true
        } else if pending.intersects(TimerFlags::CAPTURE_ALL) {
            let captured = status & self.ch_mask;
            if captured == self.ch_mask {
                // All channels in: wait out the bounce, if that ends sooner.
                timer.disable_counter();
                let shortened = timer.counter().saturating_add(self.bounce_ticks).max(1);
                if shortened < timer.auto_reload() {
                    timer.set_auto_reload(shortened);
                }
                timer.enable_counter();
            }
            timer.set_interrupts(interrupts - captured);
            false
        } else {
            false
        }
    }

    /// Read out the enabled channels, in channel order.
    fn collect(&mut self) -> heapless::Vec<ChannelResult, CAP_CH_NUM> {
        let mut results = heapless::Vec::new();
        let status = self.timer.status();
        for ch in 0..CAP_CH_NUM {
            if !self.timer.is_channel_enabled(ch) {
                continue;
            }
            let result = if status.contains(TimerFlags::capture(ch)) {
                let ticks = self.timer.read_capture(ch);
                let ch_status = if status.contains(TimerFlags::overcapture(ch)) {
                    self.timer.clear_status(TimerFlags::overcapture(ch));
                    ChannelStatus::Overcapture
                } else if ticks > self.timeout_ticks {
                    // Captured during the bounce period only.
                    ChannelStatus::Timeout
                } else {
                    ChannelStatus::Ok
                };
                ChannelResult {
                    status: ch_status,
                    value_us: ticks.saturating_mul(CAP_RES_US),
                }
            } else {
                ChannelResult {
                    status: ChannelStatus::Timeout,
                    value_us: CAP_VALUE_NONE_US,
                }
            };
            // At most CAP_CH_NUM channels are enabled.
            let _ = results.push(result);
        }
        results
    }
}

/// The capture engine.
pub struct Capturer {
    state: IsrCell<State>,
    /// A capture can be started.
    available: Semaphore,
    /// A capture is done, its result can be collected.
    done: Semaphore,
}

impl Capturer {
    /// Take over a capture timer and connect its interrupt.
    ///
    /// The timer is stopped, disarmed and has all channels disabled.
    pub fn new(mut timer: Box<dyn CaptureTimer>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            timer.connect_interrupt(Box::new(move || {
                if let Some(capturer) = weak.upgrade() {
                    capturer.isr();
                }
            }));
            timer.disarm_trigger();
            timer.disable_counter();
            timer.set_interrupts(TimerFlags::empty());
            for ch in 0..CAP_CH_NUM {
                timer.disable_channel(ch);
            }
            timer.clear_status(TimerFlags::all());
            debug!("capturer initialized");
            Self {
                state: IsrCell::new(State {
                    timer,
                    aborted: false,
                    timeout_ticks: 0,
                    bounce_ticks: 0,
                    ch_mask: TimerFlags::empty(),
                }),
                available: Semaphore::new(1, 1),
                done: Semaphore::new(0, 1),
            }
        })
    }

    /// Capture timer interrupt handler.
    pub fn isr(&self) {
        let done = self.state.with(State::service);
        if done {
            trace!("capture window ended");
            self.done.give();
        }
    }

    /// Arm a capture on the channels enabled for any of `dirs`.
    ///
    /// Waits for the previous capture's result to be collected. The window
    /// starts with the next trigger. With no channels enabled, the full
    /// window elapses.
    ///
    /// # Panics
    /// Panics if the configuration's window exceeds the timer's range.
    pub fn start(&self, conf: &CaptureConfig, dirs: CaptureDirs) {
        assert!(conf.is_valid(), "capture window too long: {conf:?}");

        self.available.take(Timeout::Forever);

        let ch_mask = self.state.with(|st| {
            let timer = &mut st.timer;
            let mut ch_mask = TimerFlags::empty();
            for (ch, ch_conf) in conf.channels.iter().enumerate() {
                if ch_conf.dirs.intersects(dirs) {
                    ch_mask |= TimerFlags::capture(ch);
                    timer.configure_channel(ch, ch_conf.edge);
                    timer.enable_channel(ch);
                } else {
                    timer.disable_channel(ch);
                }
            }
            st.ch_mask = ch_mask;
            st.aborted = false;
            st.timeout_ticks = conf.timeout_ticks();
            st.bounce_ticks = conf.bounce_ticks();

            timer.disable_counter();
            timer.reset_counter();
            timer.clear_status(TimerFlags::all());
            timer.set_interrupts(TimerFlags::TRIGGER | ch_mask | TimerFlags::UPDATE);
            // A zero auto-reload value stalls the counter.
            timer.set_auto_reload((st.timeout_ticks + st.bounce_ticks).max(1));
            timer.arm_trigger();
            ch_mask
        });

        debug!(
            dirs = dirs.keyword(),
            channels = ch_mask.bits(),
            timeout_us = conf.timeout_us,
            bounce_us = conf.bounce_us,
            "capture armed"
        );
    }

    /// Wait for the capture to end and collect the channel results.
    ///
    /// Results of the enabled channels are written densely, in channel
    /// order, to the start of `results`; slots beyond those are zeroed
    /// timeouts and channels beyond its length are dropped.
    ///
    /// Returns [`CaptureResultCode::Timeout`] if the wait expired (the
    /// capture goes on) and [`CaptureResultCode::Aborted`] if the capture
    /// was aborted. `results` is untouched in both cases.
    pub fn finish(&self, results: &mut [ChannelResult], timeout: Timeout) -> CaptureResultCode {
        if !self.done.take(timeout) {
            return CaptureResultCode::Timeout;
        }

        let collected = self.state.with(|st| (!st.aborted).then(|| st.collect()));
        self.available.give();

        let Some(collected) = collected else {
            debug!("capture aborted");
            return CaptureResultCode::Aborted;
        };
        results.fill(ChannelResult::default());
        for (slot, result) in results.iter_mut().zip(&collected) {
            *slot = *result;
        }
        trace!(?collected, "capture finished");
        CaptureResultCode::Ok
    }

    /// Abort the capture in flight.
    ///
    /// Returns `false` if no capture was armed or running.
    pub fn abort(&self) -> bool {
        let aborted = self.state.with(|st| {
            let timer = &mut st.timer;
            if !timer.is_trigger_armed() {
                return false;
            }
            timer.disarm_trigger();
            timer.disable_counter();
            timer.set_interrupts(TimerFlags::empty());
            st.aborted = true;
            true
        });
        if aborted {
            debug!("capture abort requested");
            self.done.give();
        }
        aborted
    }

    /// Source ready when a capture result can be collected.
    pub fn done_event(&self) -> &dyn Pollable {
        &self.done
    }
}
