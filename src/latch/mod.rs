use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};

/// One-shot barrier over a fixed set of named events.
///
/// [`NamedLatch::wait`] returns once every name has been counted down at
/// least once. Counting down an unknown or already completed name does
/// nothing. The latch cannot be re-armed.
///
/// `wait` has no timeout: if some name is never counted down, the waiter
/// blocks forever.
#[derive(Debug)]
pub struct NamedLatch {
    remaining: Mutex<HashSet<String>>,
    all_done: Condvar,
}

impl NamedLatch {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: Mutex::new(names.into_iter().map(Into::into).collect()),
            all_done: Condvar::new(),
        }
    }

    /// Marks `name` as complete, waking all waiters if it was the last one.
    pub fn count_down(&self, name: &str) {
        let drained = {
            let mut remaining = self.remaining.lock();
            remaining.remove(name) && remaining.is_empty()
        };
        if drained {
            self.all_done.notify_all();
        }
    }

    /// Blocks until every name has been counted down.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while !remaining.is_empty() {
            self.all_done.wait(&mut remaining);
        }
    }

    /// Number of names still outstanding.
    pub fn remaining(&self) -> usize {
        self.remaining.lock().len()
    }
}
