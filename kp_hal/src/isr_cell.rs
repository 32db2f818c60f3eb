//! Interrupt-safe cell.
//!
//! State shared between an interrupt handler and threads lives in an
//! [`IsrCell`]. Locking spins instead of sleeping, so it may be taken from
//! interrupt context, and the guard releases the lock on every exit path.
//!
//! Critical sections must stay bounded to a handful of register and
//! variable accesses. Blocking while holding a guard is a bug; blocking
//! primitives check [`in_critical_section`] in debug builds.

use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// Spins before yielding the CPU to a (possibly preempted) lock holder.
const SPINS_BEFORE_YIELD: u32 = 64;

thread_local! {
    static CRITICAL_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Whether the current thread holds any [`IsrCell`] guard.
pub fn in_critical_section() -> bool {
    CRITICAL_DEPTH.with(|depth| depth.get() > 0)
}

/// A spinlock-protected cell shared with interrupt handlers.
pub struct IsrCell<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Sync for IsrCell<T> {}

impl<T> IsrCell<T> {
    /// Create a new unlocked cell.
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Enter the critical section, spinning until the lock is free.
    pub fn lock(&self) -> IsrGuard<'_, T> {
        let mut spins = 0u32;
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                spins = spins.wrapping_add(1);
                if spins % SPINS_BEFORE_YIELD == 0 {
                    std::thread::yield_now();
                } else {
                    std::hint::spin_loop();
                }
            }
        }
        CRITICAL_DEPTH.with(|depth| depth.set(depth.get() + 1));
        IsrGuard {
            cell: self,
            _not_send: PhantomData,
        }
    }

    /// Run `f` inside the critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

/// Scoped critical section over an [`IsrCell`].
///
/// Not `Send`: a critical section ends on the thread that entered it.
pub struct IsrGuard<'a, T> {
    cell: &'a IsrCell<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for IsrGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for IsrGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the lock exclusively.
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for IsrGuard<'_, T> {
    fn drop(&mut self) {
        CRITICAL_DEPTH.with(|depth| depth.set(depth.get() - 1));
        self.cell.locked.store(false, Ordering::Release);
    }
}
