//! Actuator motion controller.
//!
//! The actuator is a stepper-driven plunger positioned over the switch
//! under test. It is controlled through three outputs: "disable" (high
//! removes power), "dir" (high moves up) and "step" (one pulse per step).
//!
//! # State Machine
//!
//! ```text
//!            power_on()               start_move()
//!   ┌─────┐ ──────────► ┌──────────┐ ────────────► ┌────────┐
//!   │ OFF │             │ ON, idle │               │ MOVING │
//!   └─────┘ ◄────────── └──────────┘ ◄──────────── └────────┘
//!      ▲     power_off()              target/abort      │
//!      └────────────────────────────────────────────────┘
//!                      power_off(): POWERED_OFF
//! ```
//!
//! Moves are executed by a dedicated motion thread paced by the step timer.
//! Exactly one move may be in flight: [`Actuator::start_move`] waits until
//! the previous move's result was collected by [`Actuator::finish_move`].
//!
//! Position, target, abort flag and power state live in one [`IsrCell`];
//! every check and update of them is a short critical section, and the
//! step pulse itself is timed outside of it.

use crate::sync::{Pollable, Semaphore, Timeout};
use kp_common::actuator::{MoveResult, POS_INVALID, Position, Speed, StepPeriods, pos_is_valid};
use kp_common::consts::STEP_PULSE_WIDTH_US;
use kp_hal::{Clock, HalError, IsrCell, OutputPin, StepTimer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace};

struct State {
    disable: Box<dyn OutputPin>,
    dir: Box<dyn OutputPin>,
    pos: Position,
    target: Position,
    speed: Speed,
    aborted: bool,
    /// Power was turned off since the move in flight started.
    powered_off: bool,
    move_rc: MoveResult,
}

/// What the motion thread does on a timer tick.
enum Tick {
    /// Step once, up (towards lower positions) or down.
    Step { up: bool },
    /// Stop with a result.
    Finish(MoveResult),
}

impl State {
    fn is_off(&self) -> bool {
        self.disable.is_high()
    }

    fn control(&mut self) -> Tick {
        if self.is_off() || self.powered_off {
            return Tick::Finish(MoveResult::PoweredOff);
        }
        if self.aborted {
            self.aborted = false;
            return Tick::Finish(MoveResult::Aborted);
        }
        if self.pos == self.target {
            return Tick::Finish(MoveResult::Ok);
        }
        let up = self.pos > self.target;
        self.dir.set(up);
        Tick::Step { up }
    }

    fn advance(&mut self, up: bool) {
        // Power-off zeroes the position; a late step must not move it.
        if self.is_off() || self.powered_off {
            return;
        }
        self.pos += if up { -1 } else { 1 };
    }
}

struct Shared {
    state: IsrCell<State>,
    periods: StepPeriods,
    /// A move can be started.
    available: Semaphore,
    /// A move should begin.
    begin: Semaphore,
    /// A move is done, its result can be collected.
    done: Semaphore,
    shutdown: AtomicBool,
}

/// Remaining wait before stepping in the opposite direction, microseconds.
///
/// `elapsed_us` is the time since the last step, `None` if the cycle
/// counter wrapped meanwhile, in which case the full turnaround is waited.
pub fn turnaround_delay_us(turnaround_us: u32, elapsed_us: Option<u32>) -> u32 {
    match elapsed_us {
        Some(elapsed) => turnaround_us.saturating_sub(elapsed),
        None => turnaround_us,
    }
}

/// The last step taken.
#[derive(Debug, Clone, Copy)]
struct LastStep {
    up: bool,
    cycles: u32,
}

struct Motion {
    shared: Arc<Shared>,
    step: Box<dyn OutputPin>,
    timer: Box<dyn StepTimer>,
    clock: Arc<dyn Clock>,
    last_step: Option<LastStep>,
}

impl Motion {
    fn run(mut self) {
        debug!("motion thread started");
        loop {
            self.shared.begin.take(Timeout::Forever);
            if self.shared.shutdown.load(Ordering::Acquire) {
                break;
            }
            let rc = self.run_move();
            self.timer.stop();
            self.shared.state.with(|st| st.move_rc = rc);
            trace!(%rc, "move finished");
            self.shared.done.give();
        }
        debug!("motion thread stopped");
    }

    fn run_move(&mut self) -> MoveResult {
        let speed = self.shared.state.with(|st| st.speed);
        let period_us = self.shared.periods.period_us(speed);
        let turnaround_us = self.shared.periods.turnaround_us(speed);
        self.timer.start(Duration::from_micros(u64::from(period_us)));

        loop {
            if !self.timer.sync() || self.shared.shutdown.load(Ordering::Acquire) {
                return MoveResult::Aborted;
            }
            let up = match self.shared.state.with(State::control) {
                Tick::Step { up } => up,
                Tick::Finish(rc) => return rc,
            };
            if let Some(last) = self.last_step.filter(|last| last.up != up) {
                self.absorb_momentum(last, turnaround_us);
            }
            self.step.set(true);
            self.shared.state.with(|st| st.advance(up));
            self.clock.delay_us(STEP_PULSE_WIDTH_US);
            self.step.set(false);
            self.last_step = Some(LastStep {
                up,
                cycles: self.clock.cycles(),
            });
        }
    }

    /// Let the plunger's momentum settle before reversing.
    fn absorb_momentum(&self, last: LastStep, turnaround_us: u32) {
        let now = self.clock.cycles();
        let elapsed_us = now
            .checked_sub(last.cycles)
            .map(|cycles| self.clock.cycles_to_us(cycles));
        let delay_us = turnaround_delay_us(turnaround_us, elapsed_us);
        trace!(delay_us, "reversing direction");
        if delay_us > 0 {
            self.clock.delay_us(delay_us);
        }
    }
}

/// Hardware handles an [`Actuator`] takes ownership of.
pub struct ActuatorPins {
    /// "disable" output, high removes power.
    pub disable: Box<dyn OutputPin>,
    /// "dir" output, high moves up.
    pub dir: Box<dyn OutputPin>,
    /// "step" output.
    pub step: Box<dyn OutputPin>,
}

/// The actuator motion controller.
///
/// Dropping the controller stops its motion thread.
pub struct Actuator {
    shared: Arc<Shared>,
    motion: Option<JoinHandle<()>>,
}

impl Actuator {
    /// Take over the actuator hardware and start the motion thread.
    ///
    /// The actuator starts powered off.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` on invalid step periods and
    /// `HalError::InitFailed` if the motion thread cannot be spawned.
    pub fn new(
        pins: ActuatorPins,
        timer: Box<dyn StepTimer>,
        clock: Arc<dyn Clock>,
        periods: StepPeriods,
    ) -> Result<Self, HalError> {
        periods.validate()?;
        let ActuatorPins {
            mut disable,
            mut dir,
            mut step,
        } = pins;
        disable.set(true);
        dir.set(false);
        step.set(false);

        let shared = Arc::new(Shared {
            state: IsrCell::new(State {
                disable,
                dir,
                pos: 0,
                target: 0,
                speed: Speed::MIN,
                aborted: false,
                powered_off: false,
                move_rc: MoveResult::Ok,
            }),
            periods,
            available: Semaphore::new(1, 1),
            begin: Semaphore::new(0, 1),
            done: Semaphore::new(0, 1),
            shutdown: AtomicBool::new(false),
        });

        let motion = Motion {
            shared: Arc::clone(&shared),
            step,
            timer,
            clock,
            last_step: None,
        };
        let handle = thread::Builder::new()
            .name("kp-act-move".to_string())
            .spawn(move || motion.run())
            .map_err(|e| HalError::InitFailed(format!("motion thread: {e}")))?;

        info!(
            step_period_min_us = periods.min_us,
            step_period_max_us = periods.max_us,
            "actuator initialized"
        );
        Ok(Self {
            shared,
            motion: Some(handle),
        })
    }

    /// Check if the actuator power is off.
    pub fn is_off(&self) -> bool {
        self.shared.state.with(|st| st.is_off())
    }

    /// Check if the actuator power is on.
    pub fn is_on(&self) -> bool {
        !self.is_off()
    }

    /// Turn the actuator power on, zeroing the position.
    ///
    /// Returns `false` if the power was already on.
    pub fn power_on(&self) -> bool {
        let turned_on = self.shared.state.with(|st| {
            if !st.is_off() {
                return false;
            }
            st.disable.set(false);
            st.pos = 0;
            true
        });
        if turned_on {
            info!("actuator powered on");
        }
        turned_on
    }

    /// Turn the actuator power off, zeroing the position.
    ///
    /// A move in progress finishes with [`MoveResult::PoweredOff`], even if
    /// the power is turned back on before the motion thread notices.
    /// Returns `false` if the power was already off.
    pub fn power_off(&self) -> bool {
        let turned_off = self.shared.state.with(|st| {
            if st.is_off() {
                return false;
            }
            st.disable.set(true);
            st.pos = 0;
            st.powered_off = true;
            true
        });
        if turned_off {
            info!("actuator powered off");
        }
        turned_off
    }

    /// Current position, or [`POS_INVALID`] if the power is off.
    pub fn locate(&self) -> Position {
        self.shared
            .state
            .with(|st| if st.is_off() { POS_INVALID } else { st.pos })
    }

    /// Start moving to an absolute or relative position.
    ///
    /// Waits for the previous move's result to be collected, then returns
    /// without waiting for the movement. Collect the result with
    /// [`finish_move`](Self::finish_move).
    ///
    /// # Panics
    /// Panics if the absolute target is [`POS_INVALID`] or the relative
    /// target falls outside the valid position range.
    pub fn start_move(&self, relative: bool, steps: Position, speed: Speed) {
        assert!(relative || pos_is_valid(steps), "invalid move target {steps}");

        self.shared.available.take(Timeout::Forever);

        enum Start {
            Began(Position),
            Finished(MoveResult),
            Overflow(Position),
        }

        let start = self.shared.state.with(|st| {
            if st.is_off() {
                st.move_rc = MoveResult::PoweredOff;
                return Start::Finished(MoveResult::PoweredOff);
            }
            let target = if relative {
                match st.pos.checked_add(steps).filter(|t| pos_is_valid(*t)) {
                    Some(target) => target,
                    None => return Start::Overflow(st.pos),
                }
            } else {
                steps
            };
            if target == st.pos {
                st.move_rc = MoveResult::Ok;
                return Start::Finished(MoveResult::Ok);
            }
            st.target = target;
            st.speed = speed;
            st.aborted = false;
            st.powered_off = false;
            Start::Began(target)
        });

        match start {
            Start::Began(target) => {
                debug!(target, %speed, "move started");
                self.shared.begin.give();
            }
            Start::Finished(rc) => {
                trace!(%rc, "move finished without stepping");
                self.shared.done.give();
            }
            Start::Overflow(pos) => {
                self.shared.available.give();
                panic!("relative move by {steps} from {pos} leaves the position range");
            }
        }
    }

    /// Start moving to an absolute position.
    pub fn start_move_to(&self, pos: Position, speed: Speed) {
        self.start_move(false, pos, speed);
    }

    /// Start moving by a number of steps (positive is down).
    pub fn start_move_by(&self, steps: Position, speed: Speed) {
        self.start_move(true, steps, speed);
    }

    /// Wait for the move in flight to finish and collect its result.
    ///
    /// Returns [`MoveResult::Timeout`] if the wait expired; the move keeps
    /// going and must still be finished later.
    pub fn finish_move(&self, timeout: Timeout) -> MoveResult {
        if !self.shared.done.take(timeout) {
            return MoveResult::Timeout;
        }
        let rc = self.shared.state.with(|st| st.move_rc);
        self.shared.available.give();
        rc
    }

    /// Move to an absolute position and wait for the result.
    pub fn move_to(&self, pos: Position, speed: Speed) -> MoveResult {
        self.start_move_to(pos, speed);
        self.finish_move(Timeout::Forever)
    }

    /// Move by a number of steps and wait for the result.
    pub fn move_by(&self, steps: Position, speed: Speed) -> MoveResult {
        self.start_move_by(steps, speed);
        self.finish_move(Timeout::Forever)
    }

    /// Request the move in flight to abort.
    ///
    /// The step being executed completes first. Returns `false` if the
    /// power is off. An abort requested while idle is forgotten by the
    /// next move.
    pub fn abort(&self) -> bool {
        let aborted = self.shared.state.with(|st| {
            if st.is_off() {
                return false;
            }
            st.aborted = true;
            true
        });
        if aborted {
            debug!("move abort requested");
        }
        aborted
    }

    /// Source ready when a move result can be collected.
    pub fn done_event(&self) -> &dyn Pollable {
        &self.shared.done
    }
}

impl Drop for Actuator {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.begin.give();
        if let Some(handle) = self.motion.take() {
            let _ = handle.join();
        }
    }
}
