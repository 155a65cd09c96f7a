//! # Run-State Machine
//!
//! The single cross-thread coordination point for shutdown. The pacer, the
//! render loop and every external waiter read this flag; only the lifecycle
//! surface ([`crate::DisplayController`] and
//! [`crate::DisplayHandle::request_stop`]) writes it.

use std::sync::atomic::{AtomicU8, Ordering};

/// Display run state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// No render thread exists (initial state, and after stop).
    Stopped = 0,
    /// Pacer and render threads are live.
    Running = 1,
}

impl RunState {
    fn from_u8(raw: u8) -> Self {
        if raw == RunState::Running as u8 {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }
}

/// Atomic cell holding the [`RunState`].
///
/// Stops are cooperative: the render loop checks this once per frame
/// boundary, never mid-scanline, so a stop request always lets the current
/// frame finish.
#[derive(Debug)]
pub struct RunFlag(AtomicU8);

impl RunFlag {
    /// Creates a flag in the [`RunState::Stopped`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(RunState::Stopped as u8))
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// True while the display is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Attempts the `Stopped -> Running` transition.
    ///
    /// Returns `true` if this call performed the transition. Exactly one
    /// caller wins, which is what guarantees a single render thread per
    /// display.
    pub fn begin(&self) -> bool {
        self.0
            .compare_exchange(
                RunState::Stopped as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Requests the `Running -> Stopped` transition.
    ///
    /// Idempotent; safe to call from any thread, including interrupt
    /// listeners and frame sinks running on the render thread.
    pub fn request_stop(&self) {
        self.0.store(RunState::Stopped as u8, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_stopped() {
        let flag = RunFlag::new();
        assert_eq!(flag.state(), RunState::Stopped);
        assert!(!flag.is_running());
    }

    #[test]
    fn test_begin_wins_once() {
        let flag = RunFlag::new();
        assert!(flag.begin());
        assert!(!flag.begin());
        assert!(flag.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let flag = RunFlag::new();
        assert!(flag.begin());
        flag.request_stop();
        flag.request_stop();
        assert_eq!(flag.state(), RunState::Stopped);
        // A fresh start is allowed after a stop.
        assert!(flag.begin());
    }
}
