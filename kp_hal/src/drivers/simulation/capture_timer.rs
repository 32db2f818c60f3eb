//! Simulated capture timer.
//!
//! Models the registers of [`CaptureTimer`] over the host clock: the counter
//! advances one tick every [`CAP_RES_US`] microseconds while enabled, a
//! background thread raises the update event when it reaches the auto-reload
//! value, and [`SimCaptureTimerHandle`] injects trigger and channel edges.
//!
//! The interrupt handler is called on the thread that caused the event,
//! never with the register lock held, and again while an enabled event
//! stays pending.

use crate::timer::{CaptureTimer, IsrHandler, TimerFlags};
use kp_common::capture::Edge;
use kp_common::consts::{CAP_CH_NUM, CAP_RES_US};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Duration of one counter tick.
const TICK: Duration = Duration::from_micros(CAP_RES_US as u64);

/// Bound on back-to-back handler calls for one event.
const MAX_NESTED_INTERRUPTS: usize = 8;

type SharedHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct Registers {
    status: TimerFlags,
    interrupts: TimerFlags,
    auto_reload: u32,
    captures: [u32; CAP_CH_NUM],
    enabled: [bool; CAP_CH_NUM],
    edges: [Edge; CAP_CH_NUM],
    trigger_armed: bool,
    /// When the counter last started from `count_base`, if counting.
    counting_since: Option<Instant>,
    count_base: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            status: TimerFlags::empty(),
            interrupts: TimerFlags::empty(),
            auto_reload: u32::from(u16::MAX),
            captures: [0; CAP_CH_NUM],
            enabled: [false; CAP_CH_NUM],
            edges: [Edge::Rising; CAP_CH_NUM],
            trigger_armed: false,
            counting_since: None,
            count_base: 0,
        }
    }
}

impl Registers {
    fn counter_at(&self, now: Instant) -> u32 {
        let Some(since) = self.counting_since else {
            return self.count_base;
        };
        let ticks = now.saturating_duration_since(since).as_micros() / u128::from(CAP_RES_US);
        let limit = self.auto_reload.max(self.count_base);
        (u128::from(self.count_base) + ticks).min(u128::from(limit)) as u32
    }

    /// Instant the counter reaches the auto-reload value, if counting.
    ///
    /// A zero auto-reload value stalls the counter.
    fn expiry(&self) -> Option<Instant> {
        let since = self.counting_since?;
        if self.auto_reload == 0 {
            return None;
        }
        Some(since + TICK * self.auto_reload.saturating_sub(self.count_base))
    }

    fn pending(&self) -> bool {
        self.status.intersects(self.interrupts)
    }
}

struct Shared {
    regs: Mutex<Registers>,
    changed: Condvar,
    handler: Mutex<Option<SharedHandler>>,
    shutdown: AtomicBool,
}

impl Shared {
    fn regs(&self) -> MutexGuard<'_, Registers> {
        self.regs.lock()
    }

    /// Modify the registers and wake the expiry thread.
    fn update<R>(&self, f: impl FnOnce(&mut Registers) -> R) -> R {
        let mut regs = self.regs.lock();
        let result = f(&mut regs);
        self.changed.notify_all();
        result
    }

    /// Call the handler while an enabled event is pending.
    fn raise_interrupt(&self) {
        let Some(handler) = self.handler.lock().clone() else {
            return;
        };
        for _ in 0..MAX_NESTED_INTERRUPTS {
            if !self.regs().pending() {
                return;
            }
            handler();
        }
        trace!("capture timer interrupt still pending after handler calls");
    }

    fn run_expiry(&self) {
        let mut regs = self.regs.lock();
        while !self.shutdown.load(Ordering::Acquire) {
            let Some(deadline) = regs.expiry() else {
                self.changed.wait(&mut regs);
                continue;
            };
            if Instant::now() < deadline {
                self.changed.wait_until(&mut regs, deadline);
                continue;
            }
            regs.status |= TimerFlags::UPDATE;
            regs.count_base = 0;
            regs.counting_since = Some(deadline);
            trace!("capture timer update event");
            if regs.pending() {
                MutexGuard::unlocked(&mut regs, || self.raise_interrupt());
            }
        }
    }
}

/// A simulated capture timer.
///
/// Dropping the timer stops its expiry thread.
pub struct SimCaptureTimer {
    shared: Arc<Shared>,
}

impl SimCaptureTimer {
    /// Create a stopped timer with all channels disabled.
    ///
    /// # Errors
    /// Returns an error if the expiry thread cannot be spawned.
    pub fn new() -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            regs: Mutex::new(Registers::default()),
            changed: Condvar::new(),
            handler: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        });
        let expiry = Arc::clone(&shared);
        thread::Builder::new()
            .name("kp-sim-captim".to_string())
            .spawn(move || expiry.run_expiry())?;
        debug!("simulated capture timer created");
        Ok(Self { shared })
    }

    /// A handle for injecting input events.
    pub fn handle(&self) -> SimCaptureTimerHandle {
        SimCaptureTimerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for SimCaptureTimer {
    fn drop(&mut self) {
        // The expiry thread may be running the last owner's drop; don't join.
        let _regs = self.shared.regs.lock();
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.changed.notify_all();
    }
}

impl CaptureTimer for SimCaptureTimer {
    fn connect_interrupt(&mut self, handler: IsrHandler) {
        *self.shared.handler.lock() = Some(Arc::from(handler));
    }

    fn configure_channel(&mut self, ch: usize, edge: Edge) {
        self.shared.update(|regs| regs.edges[ch] = edge);
    }

    fn enable_channel(&mut self, ch: usize) {
        self.shared.update(|regs| regs.enabled[ch] = true);
    }

    fn disable_channel(&mut self, ch: usize) {
        self.shared.update(|regs| regs.enabled[ch] = false);
    }

    fn is_channel_enabled(&self, ch: usize) -> bool {
        self.shared.regs().enabled[ch]
    }

    fn status(&self) -> TimerFlags {
        self.shared.regs().status
    }

    fn clear_status(&mut self, flags: TimerFlags) {
        self.shared.update(|regs| regs.status.remove(flags));
    }

    fn interrupts(&self) -> TimerFlags {
        self.shared.regs().interrupts
    }

    fn set_interrupts(&mut self, flags: TimerFlags) {
        self.shared.update(|regs| regs.interrupts = flags);
    }

    fn counter(&self) -> u32 {
        self.shared.regs().counter_at(Instant::now())
    }

    fn reset_counter(&mut self) {
        self.shared.update(|regs| {
            regs.count_base = 0;
            if regs.counting_since.is_some() {
                regs.counting_since = Some(Instant::now());
            }
        });
    }

    fn enable_counter(&mut self) {
        self.shared.update(|regs| {
            if regs.counting_since.is_none() {
                regs.counting_since = Some(Instant::now());
            }
        });
    }

    fn disable_counter(&mut self) {
        self.shared.update(|regs| {
            regs.count_base = regs.counter_at(Instant::now());
            regs.counting_since = None;
        });
    }

    fn auto_reload(&self) -> u32 {
        self.shared.regs().auto_reload
    }

    fn set_auto_reload(&mut self, ticks: u32) {
        self.shared.update(|regs| regs.auto_reload = ticks);
    }

    fn arm_trigger(&mut self) {
        self.shared.update(|regs| regs.trigger_armed = true);
    }

    fn disarm_trigger(&mut self) {
        self.shared.update(|regs| regs.trigger_armed = false);
    }

    fn is_trigger_armed(&self) -> bool {
        self.shared.regs().trigger_armed
    }

    fn read_capture(&mut self, ch: usize) -> u32 {
        self.shared.update(|regs| {
            regs.status.remove(TimerFlags::capture(ch));
            regs.captures[ch]
        })
    }
}

/// Injects input events into a [`SimCaptureTimer`].
#[derive(Clone)]
pub struct SimCaptureTimerHandle {
    shared: Arc<Shared>,
}

impl SimCaptureTimerHandle {
    /// Deliver an active trigger edge.
    ///
    /// Starts the counter if the trigger is armed and the counter is stopped.
    /// Returns whether the counter was started.
    pub fn inject_trigger(&self) -> bool {
        let (started, pending) = self.shared.update(|regs| {
            if !regs.trigger_armed || regs.counting_since.is_some() {
                return (false, false);
            }
            regs.counting_since = Some(Instant::now());
            regs.status |= TimerFlags::TRIGGER;
            (true, regs.pending())
        });
        if pending {
            self.shared.raise_interrupt();
        }
        started
    }

    /// Deliver an edge on a capture channel input.
    ///
    /// Edges are latched only while the counter runs, on enabled channels
    /// configured for the edge's polarity. An edge arriving while the
    /// channel's capture flag is still set raises the overcapture flag and
    /// keeps the first captured value. Returns whether the edge was latched.
    pub fn inject_edge(&self, ch: usize, edge: Edge) -> bool {
        if ch >= CAP_CH_NUM {
            warn!(ch, "edge injected on nonexistent capture channel");
            return false;
        }
        let (latched, pending) = self.shared.update(|regs| {
            if regs.counting_since.is_none() || !regs.enabled[ch] || regs.edges[ch] != edge {
                return (false, false);
            }
            let flag = TimerFlags::capture(ch);
            if regs.status.contains(flag) {
                regs.status |= TimerFlags::overcapture(ch);
            } else {
                regs.captures[ch] = regs.counter_at(Instant::now());
                regs.status |= flag;
            }
            (true, regs.pending())
        });
        if pending {
            self.shared.raise_interrupt();
        }
        latched
    }

    /// Whether the counter is running.
    pub fn is_counting(&self) -> bool {
        self.shared.regs().counting_since.is_some()
    }
}
