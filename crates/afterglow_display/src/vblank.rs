//! # Vertical-Blank Gate
//!
//! The blocking primitive that lets any number of external threads suspend
//! until the next vertical blank. The render loop opens the gate exactly
//! once per frame, after the last scanline and the frame-sink notification,
//! and before the VBL listener runs.
//!
//! The gate broadcasts: every thread waiting when it opens is released
//! together. Waiters boost their scheduling priority for the duration of the
//! wait to cut wake latency, then restore it on the way out; both steps are
//! best effort and merely logged when the OS refuses.

use parking_lot::{Condvar, Mutex};
use thread_priority::{
    get_current_thread_priority, set_current_thread_priority, ThreadPriority,
};
use tracing::debug;

/// Broadcast gate opened once per vertical blank.
#[derive(Debug, Default)]
pub struct VblankGate {
    /// Frames presented so far; bumped on every open.
    generation: Mutex<u64>,
    /// Broadcast on open and on shutdown pokes.
    opened: Condvar,
}

impl VblankGate {
    /// Creates a gate that has never opened.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertical blanks that have occurred.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Opens the gate for one vertical blank, releasing every waiter.
    pub fn open(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.opened.notify_all();
    }

    /// Wakes every waiter without counting a vertical blank.
    ///
    /// Used on render-loop exit so no waiter outlives the display; the woken
    /// threads observe the stopped state and return.
    pub fn poke(&self) {
        let _guard = self.generation.lock();
        self.opened.notify_all();
    }

    /// Blocks the calling thread until the gate next opens.
    ///
    /// `running` is sampled before waiting and after every wakeup; when it
    /// reports `false` up front the call returns immediately, and a shutdown
    /// [`poke`](Self::poke) ends the wait early. Returns `true` if a
    /// vertical blank released the wait, `false` if the display was (or
    /// went) stopped.
    pub fn wait_next<F: Fn() -> bool>(&self, running: F) -> bool {
        if !running() {
            return false;
        }

        let previous = raise_priority();

        let mut generation = self.generation.lock();
        let seen = *generation;
        while *generation == seen && running() {
            self.opened.wait(&mut generation);
        }
        let released = *generation != seen;
        drop(generation);

        restore_priority(previous);
        released
    }
}

/// Boosts the current thread to maximum priority, returning what it was.
fn raise_priority() -> Option<ThreadPriority> {
    let previous = get_current_thread_priority().ok();
    if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
        debug!(error = ?err, "vblank waiter priority boost unavailable");
    }
    previous
}

/// Restores the priority captured by [`raise_priority`].
fn restore_priority(previous: Option<ThreadPriority>) {
    if let Some(priority) = previous {
        if let Err(err) = set_current_thread_priority(priority) {
            debug!(error = ?err, "failed to restore waiter priority");
        }
    }
}
