//! Synchronisation primitives.
//!
//! - [`Timeout`] - How long a blocking call may wait
//! - [`Semaphore`] - Counting semaphore with a limit, pollable
//! - [`Poller`] - Blocking wait for any of a fixed set of [`Pollable`] sources
//!
//! Completion of a move, a capture, or the arrival of input is signalled
//! through a [`Pollable`] source. A [`Poller`] subscribes to each source and
//! is woken whenever one becomes ready, without consuming it.

use kp_hal::in_critical_section;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// How long a blocking call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Return immediately.
    NoWait,
    /// Wait at most this long.
    After(Duration),
    /// Wait indefinitely.
    Forever,
}

impl Timeout {
    /// Absolute deadline of a wait starting now, `None` for no deadline.
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Timeout::NoWait => Some(Instant::now()),
            Timeout::After(duration) => Some(Instant::now() + duration),
            Timeout::Forever => None,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

/// Wait on `cond` while `blocked` holds, until `deadline`.
///
/// Returns `false` if the deadline passed with `blocked` still true.
pub(crate) fn wait_while<T>(
    cond: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    deadline: Option<Instant>,
    mut blocked: impl FnMut(&mut T) -> bool,
) -> bool {
    while blocked(&mut **guard) {
        match deadline {
            None => cond.wait(guard),
            Some(deadline) => {
                if cond.wait_until(guard, deadline).timed_out() {
                    return !blocked(&mut **guard);
                }
            }
        }
    }
    true
}

fn assert_may_block(timeout: Timeout) {
    debug_assert!(
        timeout == Timeout::NoWait || !in_critical_section(),
        "blocking wait inside a critical section"
    );
}

/// Wake-up flag shared between a [`Poller`] and its sources.
#[derive(Debug, Default)]
pub struct PollSignal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl PollSignal {
    fn raise(&self) {
        *self.raised.lock() = true;
        self.cond.notify_all();
    }

    fn reset(&self) {
        *self.raised.lock() = false;
    }

    fn wait(&self, deadline: Option<Instant>) -> bool {
        let mut raised = self.raised.lock();
        wait_while(&self.cond, &mut raised, deadline, |raised| !*raised)
    }
}

/// Subscribed poll signals of one source.
#[derive(Debug, Default)]
pub(crate) struct Observers {
    signals: Mutex<Vec<Weak<PollSignal>>>,
}

impl Observers {
    pub(crate) fn add(&self, signal: &Arc<PollSignal>) {
        let mut signals = self.signals.lock();
        signals.retain(|s| s.strong_count() > 0);
        if !signals.iter().any(|s| std::ptr::eq(s.as_ptr(), Arc::as_ptr(signal))) {
            signals.push(Arc::downgrade(signal));
        }
    }

    pub(crate) fn notify(&self) {
        let signals: Vec<Arc<PollSignal>> = {
            let mut signals = self.signals.lock();
            signals.retain(|s| s.strong_count() > 0);
            signals.iter().filter_map(Weak::upgrade).collect()
        };
        for signal in signals {
            signal.raise();
        }
    }
}

/// A source of readiness a [`Poller`] can wait on.
pub trait Pollable: Sync {
    /// Whether the source is ready.
    fn is_ready(&self) -> bool;

    /// Raise `signal` whenever the source may have become ready.
    fn subscribe(&self, signal: &Arc<PollSignal>);
}

/// Waits for any of several [`Pollable`] sources to become ready.
#[derive(Debug, Default)]
pub struct Poller {
    signal: Arc<PollSignal>,
}

impl Poller {
    /// Create a poller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until at least one source is ready.
    ///
    /// Returns the readiness of every source, or `None` if the timeout
    /// expired first. Sources are only observed, never consumed.
    pub fn poll<const N: usize>(
        &self,
        sources: [&dyn Pollable; N],
        timeout: Timeout,
    ) -> Option<[bool; N]> {
        assert_may_block(timeout);
        let deadline = timeout.deadline();
        for source in sources {
            source.subscribe(&self.signal);
        }
        loop {
            self.signal.reset();
            let ready = sources.map(|source| source.is_ready());
            if ready.iter().any(|&r| r) {
                return Some(ready);
            }
            if !self.signal.wait(deadline) {
                return None;
            }
        }
    }
}

#[derive(Debug)]
struct Count {
    value: u32,
}

/// A counting semaphore with an upper limit.
///
/// Giving beyond the limit is a no-op, so a binary semaphore is one with a
/// limit of 1.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<Count>,
    cond: Condvar,
    limit: u32,
    observers: Observers,
}

impl Semaphore {
    /// Create a semaphore with an initial count and a limit.
    ///
    /// # Panics
    /// Panics if `limit` is zero or below `initial`.
    pub fn new(initial: u32, limit: u32) -> Self {
        assert!(limit > 0 && initial <= limit, "invalid semaphore count/limit");
        Self {
            count: Mutex::new(Count { value: initial }),
            cond: Condvar::new(),
            limit,
            observers: Observers::default(),
        }
    }

    /// Increment the count, unless at the limit, and wake waiters.
    pub fn give(&self) {
        {
            let mut count = self.count.lock();
            if count.value < self.limit {
                count.value += 1;
            }
            self.cond.notify_one();
        }
        self.observers.notify();
    }

    /// Decrement the count, waiting for it to become positive.
    ///
    /// Returns `false` if the timeout expired first.
    pub fn take(&self, timeout: Timeout) -> bool {
        assert_may_block(timeout);
        let deadline = timeout.deadline();
        let mut count = self.count.lock();
        if !wait_while(&self.cond, &mut count, deadline, |count| count.value == 0) {
            return false;
        }
        count.value -= 1;
        true
    }

    /// Reset the count to zero.
    pub fn reset(&self) {
        self.count.lock().value = 0;
    }

    /// Current count.
    pub fn count(&self) -> u32 {
        self.count.lock().value
    }
}

impl Pollable for Semaphore {
    fn is_ready(&self) -> bool {
        self.count() > 0
    }

    fn subscribe(&self, signal: &Arc<PollSignal>) {
        self.observers.add(signal);
    }
}
