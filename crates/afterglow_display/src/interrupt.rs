//! # Interrupt Channels
//!
//! Two independent channels, horizontal blank and vertical blank, each with
//! an enable flag and an optional listener. Raising a disabled channel or a
//! channel with no listener is a silent no-op, never an error.
//!
//! ## Dispatch Contract
//!
//! By default listeners run **synchronously on the raising (render) thread**,
//! exactly like an in-line hardware interrupt handler: a slow listener delays
//! the next scanline and the next frame. That latency coupling is the point
//! of the emulation and is the default. [`DispatchMode::Deferred`] is the
//! explicit opt-out: raises are forwarded over a bounded channel to a
//! dispatcher thread, trading ordering-with-the-render-loop for isolation.
//!
//! Enable flags and listener slots are independently writable from any
//! thread, last-writer-wins. There is no transaction across the two fields.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Depth of the deferred-dispatch queue. A full queue drops the raise.
const INTERRUPT_QUEUE_DEPTH: usize = 256;

/// The two simulated display interrupts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterruptKind {
    /// Fired once per scanline, after that line's pixels are finalized.
    HorizontalBlank,
    /// Fired once per frame, after the last scanline.
    VerticalBlank,
}

impl InterruptKind {
    fn index(self) -> usize {
        match self {
            InterruptKind::HorizontalBlank => 0,
            InterruptKind::VerticalBlank => 1,
        }
    }
}

/// How raised interrupts reach their listeners.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Listeners run on the raising thread. The default, and the faithful
    /// emulation of in-line interrupt handlers.
    #[default]
    Inline,
    /// Raises are queued to a dedicated dispatcher thread. Opt-in deviation
    /// for callers that cannot tolerate listener latency on the render
    /// thread. The enable flag is still sampled at raise time.
    Deferred,
}

/// Boxed interrupt listener callback.
pub type InterruptListener = Box<dyn FnMut(InterruptKind) + Send>;

/// One interrupt channel: an enable flag and an optional listener.
struct Channel {
    /// Whether raises on this channel are delivered.
    enabled: AtomicBool,
    /// The registered listener, if any.
    listener: Mutex<Option<InterruptListener>>,
}

impl Channel {
    fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    /// Invokes the listener if one is registered.
    ///
    /// Holds the slot lock for the duration of the call, so a listener must
    /// not replace or clear itself from inside its own invocation.
    fn invoke(&self, kind: InterruptKind) {
        if let Some(listener) = self.listener.lock().as_mut() {
            listener(kind);
        }
    }
}

/// Holds both interrupt channels and delivers notifications.
pub struct InterruptDispatch {
    /// Indexed by [`InterruptKind::index`].
    channels: Arc<[Channel; 2]>,
    /// Present in [`DispatchMode::Deferred`] only.
    deferred: Option<Sender<InterruptKind>>,
}

impl InterruptDispatch {
    /// Creates the dispatch in the given mode.
    ///
    /// In deferred mode this spawns the dispatcher thread; it exits when the
    /// dispatch is dropped.
    #[must_use]
    pub fn new(mode: DispatchMode) -> Self {
        let channels: Arc<[Channel; 2]> = Arc::new([Channel::new(), Channel::new()]);

        let deferred = match mode {
            DispatchMode::Inline => None,
            DispatchMode::Deferred => {
                let (tx, rx) = bounded::<InterruptKind>(INTERRUPT_QUEUE_DEPTH);
                let worker_channels = Arc::clone(&channels);
                // Detached; the worker exits once every sender is dropped.
                let _worker = thread::Builder::new()
                    .name("afterglow-interrupts".into())
                    .spawn(move || {
                        while let Ok(kind) = rx.recv() {
                            worker_channels[kind.index()].invoke(kind);
                        }
                        trace!("deferred interrupt dispatcher exited");
                    })
                    .expect("failed to spawn interrupt dispatcher thread");
                Some(tx)
            }
        };

        Self { channels, deferred }
    }

    /// Enables or disables a channel.
    pub fn set_enabled(&self, kind: InterruptKind, enabled: bool) {
        self.channels[kind.index()]
            .enabled
            .store(enabled, Ordering::Release);
    }

    /// Whether a channel is currently enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: InterruptKind) -> bool {
        self.channels[kind.index()].enabled.load(Ordering::Acquire)
    }

    /// Registers a listener, replacing any previous one.
    pub fn set_listener<F>(&self, kind: InterruptKind, listener: F)
    where
        F: FnMut(InterruptKind) + Send + 'static,
    {
        *self.channels[kind.index()].listener.lock() = Some(Box::new(listener));
    }

    /// Removes the listener. Further raises on the channel deliver nothing,
    /// even while the channel stays enabled.
    pub fn clear_listener(&self, kind: InterruptKind) {
        *self.channels[kind.index()].listener.lock() = None;
    }

    /// Raises an interrupt.
    ///
    /// No-op when the channel is disabled or has no listener. In inline mode
    /// the listener has returned by the time this returns.
    pub fn raise(&self, kind: InterruptKind) {
        let channel = &self.channels[kind.index()];
        if !channel.enabled.load(Ordering::Acquire) {
            return;
        }

        match &self.deferred {
            None => channel.invoke(kind),
            Some(tx) => {
                if tx.try_send(kind).is_err() {
                    warn!(?kind, "interrupt queue full, dropping raise");
                }
            }
        }
    }
}

impl fmt::Debug for InterruptDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptDispatch")
            .field("hbl_enabled", &self.is_enabled(InterruptKind::HorizontalBlank))
            .field("vbl_enabled", &self.is_enabled(InterruptKind::VerticalBlank))
            .field("deferred", &self.deferred.is_some())
            .finish()
    }
}
