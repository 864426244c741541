//! Unbounded blocking FIFO between any number of producers and the dispatcher.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::trace;

use crate::command::{Command, Tag};

/// The consumer was cancelled while waiting for a command.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("command queue interrupted")]
pub struct Interrupted;

/// Queue contents plus the cancellation flag, guarded together.
#[derive(Default)]
struct Inner {
    /// Pending commands, oldest first.
    items: VecDeque<Command>,
    /// Set once by [`CommandQueue::interrupt`].
    interrupted: bool,
    /// A popped command has not been marked finished yet.
    in_flight: bool,
}

/// Multi-producer, single-consumer command queue.
///
/// Producers never block. The queue preserves append order exactly; any
/// dropping of redundant work is dispatcher policy built on [`peek_tag`].
///
/// [`peek_tag`]: CommandQueue::peek_tag
#[derive(Default)]
pub struct CommandQueue {
    /// Guarded state.
    inner: Mutex<Inner>,
    /// Signalled on every push and on interrupt.
    ready: Condvar,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the tail.
    pub fn push(&self, cmd: Command) {
        let mut inner = self.inner.lock();
        trace!(tag = ?cmd.tag(), depth = inner.items.len(), "queue_push");
        inner.items.push_back(cmd);
        drop(inner);
        self.ready.notify_one();
    }

    /// Remove the head, blocking while the queue is empty.
    ///
    /// Returns [`Interrupted`] once [`interrupt`](Self::interrupt) has been
    /// called, even if commands remain queued.
    pub fn pop_blocking(&self) -> Result<Command, Interrupted> {
        let mut inner = self.inner.lock();
        loop {
            if inner.interrupted {
                return Err(Interrupted);
            }
            if let Some(cmd) = inner.items.pop_front() {
                inner.in_flight = true;
                return Ok(cmd);
            }
            self.ready.wait(&mut inner);
        }
    }

    /// Mark the last popped command as fully handled, follow-ons included.
    pub fn finish(&self) {
        self.inner.lock().in_flight = false;
    }

    /// True when nothing is queued and no popped command is still being handled.
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.items.is_empty() && !inner.in_flight
    }

    /// Tag of the head command, without removing it.
    pub fn peek_tag(&self) -> Option<Tag> {
        self.inner.lock().items.front().map(Command::tag)
    }

    /// True if any queued command has interactive origin.
    pub fn has_interactive(&self) -> bool {
        self.inner.lock().items.iter().any(Command::is_interactive)
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Cancel the consumer. Wakes a blocked [`pop_blocking`](Self::pop_blocking).
    pub fn interrupt(&self) {
        self.inner.lock().interrupted = true;
        self.ready.notify_all();
    }
}
