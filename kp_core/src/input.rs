//! User input message queue.
//!
//! Decoded user input (Ctrl-C, arrow keys, Enter) is posted here by the
//! input front end and consumed by whoever is running a command. The
//! sampling loop polls the queue to abort movement and capture.

use crate::sync::{Observers, PollSignal, Pollable, Timeout, wait_while};
use heapless::Deque;
use kp_common::consts::INPUT_QUEUE_DEPTH;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// A decoded input message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMsg {
    /// Abort the running command (Ctrl-C).
    Abort,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Enter.
    Enter,
}

impl fmt::Display for InputMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Up => "up",
            Self::Down => "down",
            Self::Enter => "enter",
        })
    }
}

/// Bounded queue of input messages.
#[derive(Default)]
pub struct InputQueue {
    queue: Mutex<Deque<InputMsg, INPUT_QUEUE_DEPTH>>,
    cond: Condvar,
    observers: Observers,
}

impl InputQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a message without blocking.
    ///
    /// Returns `false` if the queue is full and the message was dropped.
    pub fn send(&self, msg: InputMsg) -> bool {
        let queued = {
            let mut queue = self.queue.lock();
            let queued = queue.push_back(msg).is_ok();
            self.cond.notify_one();
            queued
        };
        if queued {
            trace!(%msg, "input queued");
            self.observers.notify();
        } else {
            warn!(%msg, "input queue full, message dropped");
        }
        queued
    }

    /// Take the oldest message, waiting for one to arrive.
    ///
    /// Returns `None` if the timeout expired first.
    pub fn get(&self, timeout: Timeout) -> Option<InputMsg> {
        let deadline = timeout.deadline();
        let mut queue = self.queue.lock();
        if !wait_while(&self.cond, &mut queue, deadline, |queue| queue.is_empty()) {
            return None;
        }
        queue.pop_front()
    }

    /// Take the oldest message, if any.
    pub fn try_get(&self) -> Option<InputMsg> {
        self.queue.lock().pop_front()
    }

    /// Discard all queued messages, starting a new input session.
    pub fn reset(&self) {
        self.queue.lock().clear();
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Pollable for InputQueue {
    fn is_ready(&self) -> bool {
        !self.is_empty()
    }

    fn subscribe(&self, signal: &Arc<PollSignal>) {
        self.observers.add(signal);
    }
}
