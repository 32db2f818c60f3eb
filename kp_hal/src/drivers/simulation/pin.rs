//! Simulated output pin.

use crate::pin::OutputPin;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct PinState {
    name: &'static str,
    level: AtomicBool,
    toggles: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// A simulated output pin.
///
/// Clones share the same line, so a test can keep one handle while the
/// driven side owns another.
#[derive(Clone)]
pub struct SimPin {
    state: Arc<PinState>,
}

impl SimPin {
    /// Create a pin at an initial level.
    pub fn new(name: &'static str, initial: bool) -> Self {
        Self {
            state: Arc::new(PinState {
                name,
                level: AtomicBool::new(initial),
                toggles: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Pin name.
    pub fn name(&self) -> &'static str {
        self.state.name
    }

    /// Current level.
    pub fn level(&self) -> bool {
        self.state.level.load(Ordering::Acquire)
    }

    /// Number of level changes since creation.
    pub fn toggles(&self) -> u64 {
        self.state.toggles.load(Ordering::Acquire)
    }

    /// Call `listener` with the new level on every level change.
    ///
    /// Listeners run on the thread driving the pin, possibly inside a
    /// critical section, and must not block.
    pub fn on_change(&self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.state.listeners.lock().push(Arc::new(listener));
    }

    fn drive(&self, high: bool) {
        if self.state.level.swap(high, Ordering::AcqRel) == high {
            return;
        }
        self.state.toggles.fetch_add(1, Ordering::AcqRel);
        let listeners = self.state.listeners.lock().clone();
        for listener in listeners {
            listener(high);
        }
    }
}

impl OutputPin for SimPin {
    fn set(&mut self, high: bool) {
        self.drive(high);
    }

    fn is_high(&self) -> bool {
        self.level()
    }
}

impl fmt::Debug for SimPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimPin")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("toggles", &self.toggles())
            .finish()
    }
}
