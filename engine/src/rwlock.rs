use std::sync::{Condvar, Mutex};
use std::thread::ThreadId;

use crate::error::{EngineError, Result};

struct State {
    readers: usize,
    writer_active: bool,
    writers_waiting: usize,
    writer_id: Option<ThreadId>,
}

/// A multi-reader / single-writer mutex with writer-thread identity checks.
///
/// This is intentionally not built on [`std::sync::RwLock`]: the spec calls
/// for explicit `read_lock`/`read_unlock`/`write_lock`/`write_unlock` pairs
/// (not RAII guards) plus a fatal check that the thread releasing the write
/// lock is the one that acquired it. Waiters block on a single [`Condvar`],
/// woken whenever the last reader or the writer releases.
///
/// Neither read nor write acquisition is re-entrant.
pub struct RwLock {
    state: Mutex<State>,
    cond: Condvar,
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RwLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer_active: false,
                writers_waiting: 0,
                writer_id: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Blocks until no writer holds or is being granted the lock, then
    /// registers this thread as a reader.
    pub fn read_lock(&self) {
        let mut state = self.state.lock().expect("rwlock state poisoned");
        while state.writer_active || state.writers_waiting > 0 {
            state = self.cond.wait(state).expect("rwlock state poisoned");
        }
        state.readers += 1;
    }

    /// Releases this thread's read lock, waking waiters if it was the last
    /// reader.
    pub fn read_unlock(&self) {
        let mut state = self.state.lock().expect("rwlock state poisoned");
        debug_assert!(state.readers > 0, "read_unlock called with no readers held");
        state.readers = state.readers.saturating_sub(1);
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    /// Blocks until `readers == 0 && !writer_active`, then acquires the
    /// writer slot and records the calling thread's identity.
    pub fn write_lock(&self) {
        let mut state = self.state.lock().expect("rwlock state poisoned");
        state.writers_waiting += 1;
        while state.readers > 0 || state.writer_active {
            state = self.cond.wait(state).expect("rwlock state poisoned");
        }
        state.writers_waiting -= 1;
        state.writer_active = true;
        state.writer_id = Some(std::thread::current().id());
    }

    /// Releases the write lock held by the calling thread.
    ///
    /// Returns [`EngineError::LockOwnership`] — without releasing anything —
    /// if called from a thread other than the one that acquired it.
    pub fn write_unlock(&self) -> Result<()> {
        let mut state = self.state.lock().expect("rwlock state poisoned");
        let current = std::thread::current().id();
        match state.writer_id {
            Some(owner) if owner == current => {}
            Some(owner) => {
                return Err(EngineError::LockOwnership {
                    expected: owner,
                    actual: current,
                })
            }
            None => {
                return Err(EngineError::LockOwnership {
                    expected: current,
                    actual: current,
                })
            }
        }

        state.writer_active = false;
        state.writer_id = None;
        self.cond.notify_all();
        Ok(())
    }
}
