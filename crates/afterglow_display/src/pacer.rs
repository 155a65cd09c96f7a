//! # Frame Pacer
//!
//! A background thread that establishes the target frame cadence,
//! independent of how long rendering actually takes. Each interval it pulses
//! the [`FrameClock`]; the render loop blocks on that clock once per frame.
//!
//! The default strategy reproduces a hardware-style interval timer: sleep a
//! fixed duration, pulse, repeat. It measures nothing and corrects nothing,
//! so a slow compositor drags the achieved rate below target instead of
//! triggering catch-up bursts. [`PacingStrategy::DeadlineCorrected`] is the
//! explicitly selectable alternative that sleeps toward absolute deadlines.
//!
//! On shutdown the pacer issues one final pulse so a render loop blocked on
//! the clock always wakes to observe the stop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::lifecycle::RunFlag;

/// How the pacer schedules its pulses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    /// Sleep a fixed interval between pulses. The default. Matches a
    /// hardware interrupt timer: no drift correction, no frame skipping;
    /// overruns simply lower the achieved rate.
    #[default]
    FixedInterval,
    /// Sleep toward absolute deadlines (sleep most of the way, spin the
    /// last stretch). Keeps long-run cadence on target even when individual
    /// sleeps overshoot.
    DeadlineCorrected,
}

/// Broadcast frame-cadence condition.
///
/// A monotonically increasing generation under a mutex plus a condvar.
/// Pulses are never consumed: a waiter that captured its generation before a
/// pulse landed returns immediately, which is what makes the final shutdown
/// pulse race-free.
#[derive(Debug, Default)]
pub struct FrameClock {
    /// Pulse generation; one increment per pacer pulse.
    generation: Mutex<u64>,
    /// Signaled (broadcast) on every pulse.
    pulsed: Condvar,
}

impl FrameClock {
    /// Creates a clock at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pulse generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Advances the generation and wakes every waiter.
    pub fn pulse(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.pulsed.notify_all();
    }

    /// Blocks until the generation moves past `seen`.
    ///
    /// Returns immediately if it already has. Spurious wakeups re-check the
    /// generation and go back to waiting.
    pub fn wait_past(&self, seen: u64) {
        let mut generation = self.generation.lock();
        while *generation <= seen {
            self.pulsed.wait(&mut generation);
        }
    }

    /// Like [`wait_past`](Self::wait_past), but also gives up as soon as
    /// `running` reports `false`.
    ///
    /// The predicate is sampled before the first wait and after every
    /// wakeup. This is what the render loop blocks on: a waiter that
    /// arrives after the pacer's final shutdown pulse captured a `seen` no
    /// pulse will ever move past, and must observe the stopped state
    /// instead of sleeping forever.
    pub fn wait_past_while<F: Fn() -> bool>(&self, seen: u64, running: F) {
        let mut generation = self.generation.lock();
        while *generation <= seen && running() {
            self.pulsed.wait(&mut generation);
        }
    }
}

/// The background pacing thread.
pub struct FramePacer {
    /// Clock pulsed once per interval.
    clock: Arc<FrameClock>,
    /// Shared run flag; the pacer exits when it drops.
    run: Arc<RunFlag>,
    /// Target interval between pulses.
    interval: Duration,
    /// Scheduling strategy.
    strategy: PacingStrategy,
}

impl FramePacer {
    /// Spawns the pacer thread.
    ///
    /// The thread runs until `run` leaves the running state, then issues one
    /// final pulse and exits.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    pub fn spawn(
        clock: Arc<FrameClock>,
        run: Arc<RunFlag>,
        interval: Duration,
        strategy: PacingStrategy,
    ) -> JoinHandle<()> {
        let pacer = Self {
            clock,
            run,
            interval,
            strategy,
        };

        thread::Builder::new()
            .name("afterglow-pacer".into())
            .spawn(move || pacer.run())
            .expect("failed to spawn pacer thread")
    }

    fn run(self) {
        info!(interval_us = self.interval.as_micros() as u64, strategy = ?self.strategy, "pacer started");

        let mut deadline = Instant::now() + self.interval;
        while self.run.is_running() {
            match self.strategy {
                PacingStrategy::FixedInterval => thread::sleep(self.interval),
                PacingStrategy::DeadlineCorrected => {
                    sleep_until(deadline);
                    deadline += self.interval;
                    // A badly overrun deadline is rebased, not replayed.
                    let now = Instant::now();
                    if deadline < now {
                        debug!("pacer overran its deadline, rebasing");
                        deadline = now + self.interval;
                    }
                }
            }

            self.clock.pulse();
        }

        // Final pulse so a render loop blocked on the clock can observe the
        // stop instead of hanging.
        self.clock.pulse();
        info!("pacer stopped");
    }
}

/// Sleeps until `deadline`: coarse sleep for the bulk, spin for precision.
fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline <= now {
        return;
    }

    let remaining = deadline - now;
    if remaining > Duration::from_micros(1000) {
        thread::sleep(remaining - Duration::from_micros(500));
    }

    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_pulse_advances_generation() {
        let clock = FrameClock::new();
        assert_eq!(clock.generation(), 0);
        clock.pulse();
        clock.pulse();
        assert_eq!(clock.generation(), 2);
    }

    #[test]
    fn test_wait_past_returns_immediately_when_already_past() {
        let clock = FrameClock::new();
        clock.pulse();
        // Generation is 1 > 0; must not block.
        clock.wait_past(0);
    }

    #[test]
    fn test_wait_past_blocks_until_pulse() {
        let clock = Arc::new(FrameClock::new());
        let waiter_clock = Arc::clone(&clock);
        let waiter = thread::spawn(move || {
            waiter_clock.wait_past(0);
            waiter_clock.generation()
        });

        thread::sleep(Duration::from_millis(10));
        clock.pulse();
        assert!(waiter.join().unwrap() >= 1);
    }

    #[test]
    fn test_wait_past_while_returns_once_stopped() {
        let clock = FrameClock::new();
        let run = RunFlag::new();
        assert!(run.begin());

        // Shutdown order as the pacer produces it: flag drops, then the
        // final pulse lands. A waiter arriving after both captures a
        // generation no pulse will ever move past; the predicate is its
        // only way out.
        run.request_stop();
        clock.pulse();
        let seen = clock.generation();

        clock.wait_past_while(seen, || run.is_running());
    }

    #[test]
    fn test_pacer_pulses_at_rate_and_final_pulses_on_stop() {
        let clock = Arc::new(FrameClock::new());
        let run = Arc::new(RunFlag::new());
        assert!(run.begin());

        // 1kHz so the test stays fast.
        let handle = FramePacer::spawn(
            Arc::clone(&clock),
            Arc::clone(&run),
            Duration::from_millis(1),
            PacingStrategy::FixedInterval,
        );

        thread::sleep(Duration::from_millis(30));
        let seen = clock.generation();
        assert!(seen >= 5, "expected several pulses, saw {seen}");

        run.request_stop();
        handle.join().unwrap();

        // At least the shutdown pulse landed after the flag dropped.
        assert!(clock.generation() > seen);
    }

    #[test]
    fn test_deadline_corrected_pacer_keeps_cadence() {
        let clock = Arc::new(FrameClock::new());
        let run = Arc::new(RunFlag::new());
        assert!(run.begin());

        let handle = FramePacer::spawn(
            Arc::clone(&clock),
            Arc::clone(&run),
            Duration::from_millis(2),
            PacingStrategy::DeadlineCorrected,
        );

        thread::sleep(Duration::from_millis(50));
        run.request_stop();
        handle.join().unwrap();

        let pulses = clock.generation();
        // ~25 expected; generous bounds for loaded CI machines.
        assert!(pulses >= 10, "too few pulses: {pulses}");
    }
}
