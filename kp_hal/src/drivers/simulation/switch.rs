//! Simulated key switch.
//!
//! The switch sits under the simulated actuator. Every rising edge on the
//! step output moves the plunger one step in the direction selected by the
//! dir output, and also triggers the capture timer. Crossing the actuation
//! position makes the switch emit edges on the capture channel inputs
//! according to each channel's [`ChannelWiring`].

use super::capture_timer::SimCaptureTimerHandle;
use super::pin::SimPin;
use kp_common::actuator::Position;
use kp_common::capture::Edge;
use kp_common::config::{ChannelWiring, SimulationConfig};
use kp_common::consts::CAP_CH_NUM;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

#[derive(Debug)]
struct Plunger {
    pos: Position,
    pressed: bool,
}

struct Inner {
    actuation: Position,
    bounce_edges: u32,
    wiring: [ChannelWiring; CAP_CH_NUM],
    plunger: Mutex<Plunger>,
    /// Set when the actuator power changes, the origin moves with it.
    rezero: AtomicBool,
    transitions: AtomicU64,
    dir: SimPin,
    disable: SimPin,
    timer: SimCaptureTimerHandle,
}

impl Inner {
    fn on_step(&self) {
        if self.disable.level() {
            return;
        }
        self.timer.inject_trigger();

        let transition = {
            let mut plunger = self.plunger.lock();
            if self.rezero.swap(false, Ordering::AcqRel) {
                plunger.pos = 0;
                plunger.pressed = self.is_pressed_at(0);
            }
            // Dir high moves up, towards lower positions.
            plunger.pos = if self.dir.level() {
                plunger.pos.saturating_sub(1)
            } else {
                plunger.pos.saturating_add(1)
            };
            let pressed = self.is_pressed_at(plunger.pos);
            let changed = pressed != plunger.pressed;
            plunger.pressed = pressed;
            changed.then_some(pressed)
        };

        if let Some(pressed) = transition {
            self.transitions.fetch_add(1, Ordering::AcqRel);
            trace!(pressed, "simulated switch transition");
            self.emit(pressed);
        }
    }

    fn is_pressed_at(&self, pos: Position) -> bool {
        pos >= self.actuation
    }

    fn emit(&self, pressed: bool) {
        let (first, second) = if pressed {
            (Edge::Rising, Edge::Falling)
        } else {
            (Edge::Falling, Edge::Rising)
        };
        for (ch, wiring) in self.wiring.iter().enumerate() {
            match wiring {
                ChannelWiring::Level => {
                    self.timer.inject_edge(ch, first);
                    for _ in 0..self.bounce_edges {
                        self.timer.inject_edge(ch, second);
                        self.timer.inject_edge(ch, first);
                    }
                }
                ChannelWiring::Pulse => {
                    for _ in 0..=self.bounce_edges {
                        self.timer.inject_edge(ch, Edge::Rising);
                        self.timer.inject_edge(ch, Edge::Falling);
                    }
                }
                ChannelWiring::Disconnected => {}
            }
        }
    }
}

/// A simulated key switch driven by the simulated actuator outputs.
#[derive(Clone)]
pub struct SimSwitch {
    inner: Arc<Inner>,
}

impl SimSwitch {
    /// Attach a switch to the actuator pins and the capture timer inputs.
    pub fn attach(
        config: &SimulationConfig,
        disable: &SimPin,
        dir: &SimPin,
        step: &SimPin,
        timer: SimCaptureTimerHandle,
    ) -> Self {
        let inner = Arc::new(Inner {
            actuation: config.actuation,
            bounce_edges: config.bounce_edges,
            wiring: config.channels,
            plunger: Mutex::new(Plunger {
                pos: 0,
                pressed: 0 >= config.actuation,
            }),
            rezero: AtomicBool::new(false),
            transitions: AtomicU64::new(0),
            dir: dir.clone(),
            disable: disable.clone(),
            timer,
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        step.on_change(move |high| {
            if let (true, Some(inner)) = (high, weak.upgrade()) {
                inner.on_step();
            }
        });

        // Only raises a flag: the disable pin changes inside critical sections.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        disable.on_change(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.rezero.store(true, Ordering::Release);
            }
        });

        Self { inner }
    }

    /// Current plunger position, in actuator steps.
    pub fn position(&self) -> Position {
        if self.inner.rezero.load(Ordering::Acquire) {
            return 0;
        }
        self.inner.plunger.lock().pos
    }

    /// Whether the switch is currently pressed.
    pub fn is_pressed(&self) -> bool {
        if self.inner.rezero.load(Ordering::Acquire) {
            return self.inner.is_pressed_at(0);
        }
        self.inner.plunger.lock().pressed
    }

    /// Number of press and release transitions so far.
    pub fn transitions(&self) -> u64 {
        self.inner.transitions.load(Ordering::Acquire)
    }
}
