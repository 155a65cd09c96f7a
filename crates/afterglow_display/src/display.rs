//! # Display Controller
//!
//! The per-frame, per-scanline driving loop plus the lifecycle state
//! machine that owns the render thread's existence.
//!
//! ## Frame Algorithm (render thread)
//!
//! ```text
//! loop:
//!   for y in 0..height:
//!     vcount = y
//!     clear row y to opaque black
//!     compositor.compose_scanline(buffer, y)
//!     raise HBL
//!   sink.frame_completed(buffer)        (if a sink is attached)
//!   vblank gate opens                   (unconditional, waiters first)
//!   raise VBL                           (gated by its enable flag)
//!   block on the frame clock
//!   exit if stopped, else next frame
//! ```
//!
//! Within one frame, composition and HBL for line `y` always complete
//! before line `y + 1` begins; the sink notification always lands after the
//! last scanline and before the VBL fan-out; and waiters are always released
//! before the VBL listener runs.
//!
//! ## Lifecycle
//!
//! `Stopped --start()--> Running --stop()--> Stopped`. Stops are
//! cooperative: the flag is checked once per frame boundary, so the
//! in-flight frame always completes - its sink notification and VBL step
//! included - before the render thread exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::config::DisplayConfig;
use crate::error::DisplayResult;
use crate::framebuffer::FrameBuffer;
use crate::interrupt::{InterruptDispatch, InterruptKind};
use crate::lifecycle::RunFlag;
use crate::pacer::{FrameClock, FramePacer};
use crate::vblank::VblankGate;

/// Composes one scanline of the frame buffer.
///
/// Invoked once per scanline on the render thread, after the row has been
/// cleared to opaque black. Implementations must write only within the row
/// for `line`; execution time is allowed but counts against the frame
/// budget.
pub trait ScanlineCompositor: Send {
    /// Draws line `line` into `framebuffer`.
    fn compose_scanline(&mut self, framebuffer: &mut FrameBuffer, line: u32);
}

impl<F> ScanlineCompositor for F
where
    F: FnMut(&mut FrameBuffer, u32) + Send,
{
    fn compose_scanline(&mut self, framebuffer: &mut FrameBuffer, line: u32) {
        self(framebuffer, line);
    }
}

/// Consumes completed frames.
///
/// The buffer reference is only transiently consistent: read it inside
/// these callbacks, never retain it across frames.
pub trait FrameSink: Send {
    /// Called once at setup with the buffer this display will publish.
    fn register_buffer(&mut self, framebuffer: &FrameBuffer);

    /// Called once per frame, on the render thread, after the last
    /// scanline.
    fn frame_completed(&mut self, framebuffer: &FrameBuffer);
}

/// Extension point for presentation adapters owning external resources.
pub trait DisplayBackend: Send {
    /// Whether the display is ready to start. `start()` refuses while this
    /// reports `false`.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Best-effort resource teardown, invoked by
    /// [`DisplayController::destroy`]. Adapters owning OS resources must
    /// override this.
    fn destroy(&mut self) {}
}

/// The default backend: always initialized, nothing to tear down.
#[derive(Debug, Default)]
pub struct ReadyBackend;

impl DisplayBackend for ReadyBackend {}

/// State shared between the controller, the render/pacer threads, and every
/// cloned [`DisplayHandle`].
struct DisplayShared {
    /// Lifecycle flag; sole cross-thread shutdown coordination point.
    run: Arc<RunFlag>,
    /// Pacing condition the render loop blocks on.
    clock: Arc<FrameClock>,
    /// Broadcast gate opened once per vertical blank.
    gate: VblankGate,
    /// HBL/VBL channels.
    interrupts: InterruptDispatch,
    /// Scanline currently being drawn; `[0, height)` while running.
    vcount: AtomicU32,
    /// Screen width in pixels.
    width: u32,
    /// Screen height in pixels.
    height: u32,
}

/// Everything the render thread owns exclusively while it runs. Handed back
/// when the thread exits so the display can be restarted.
struct RenderContext {
    /// The pixel buffer; this thread is its only writer.
    framebuffer: FrameBuffer,
    /// Caller-supplied scanline composition hook.
    compositor: Box<dyn ScanlineCompositor>,
    /// Optional consumer of completed frames.
    sink: Option<Box<dyn FrameSink>>,
}

/// The display controller: lifecycle owner and public entry point.
pub struct DisplayController {
    /// Validated static configuration.
    config: DisplayConfig,
    /// Cross-thread state.
    shared: Arc<DisplayShared>,
    /// Render-thread state; `None` while the render thread holds it.
    context: Option<RenderContext>,
    /// Presentation adapter.
    backend: Box<dyn DisplayBackend>,
    /// Live render thread, if any.
    render_thread: Option<JoinHandle<RenderContext>>,
    /// Live pacer thread, if any.
    pacer_thread: Option<JoinHandle<()>>,
}

impl DisplayController {
    /// Builds a stopped display from a validated configuration and a
    /// scanline compositor.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero dimensions or a zero refresh
    /// rate.
    pub fn new<C>(config: DisplayConfig, compositor: C) -> DisplayResult<Self>
    where
        C: ScanlineCompositor + 'static,
    {
        config.validate()?;
        let framebuffer = FrameBuffer::new(config.width, config.height)?;

        let shared = Arc::new(DisplayShared {
            run: Arc::new(RunFlag::new()),
            clock: Arc::new(FrameClock::new()),
            gate: VblankGate::new(),
            interrupts: InterruptDispatch::new(config.dispatch),
            vcount: AtomicU32::new(0),
            width: config.width,
            height: config.height,
        });

        Ok(Self {
            config,
            shared,
            context: Some(RenderContext {
                framebuffer,
                compositor: Box::new(compositor),
                sink: None,
            }),
            backend: Box::new(ReadyBackend),
            render_thread: None,
            pacer_thread: None,
        })
    }

    /// Attaches a frame sink, registering the buffer with it immediately.
    ///
    /// Builder-style; must be called while stopped.
    #[must_use]
    pub fn with_sink<S: FrameSink + 'static>(mut self, mut sink: S) -> Self {
        if let Some(context) = self.context.as_mut() {
            sink.register_buffer(&context.framebuffer);
            context.sink = Some(Box::new(sink));
        } else {
            warn!("cannot attach a sink while the display is running");
        }
        self
    }

    /// Replaces the default backend.
    #[must_use]
    pub fn with_backend<B: DisplayBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Starts the display.
    ///
    /// Returns `true` as a no-op if already running. Returns `false`,
    /// without side effects, if the backend reports uninitialized.
    /// Otherwise transitions to running and spawns the pacer and render
    /// threads; from the caller's perspective the flag-set and the spawn
    /// are one atomic step.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    pub fn start(&mut self) -> bool {
        if self.shared.run.is_running() {
            return true;
        }
        if !self.backend.is_initialized() {
            return false;
        }

        // Threads from a previous run are joined before restart; this is
        // also what recovers the render context after a handle-requested
        // stop.
        self.join_threads();

        let Some(context) = self.context.take() else {
            warn!("render context unavailable, refusing to start");
            return false;
        };

        if !self.shared.run.begin() {
            self.context = Some(context);
            return true;
        }

        info!(
            width = self.config.width,
            height = self.config.height,
            refresh_hz = self.config.refresh_hz,
            "display starting"
        );

        self.pacer_thread = Some(FramePacer::spawn(
            Arc::clone(&self.shared.clock),
            Arc::clone(&self.shared.run),
            self.config.frame_interval(),
            self.config.pacing,
        ));

        let shared = Arc::clone(&self.shared);
        self.render_thread = Some(
            thread::Builder::new()
                .name("afterglow-render".into())
                .spawn(move || render_loop(context, &shared))
                .expect("failed to spawn render thread"),
        );

        true
    }

    /// Stops the display cooperatively and joins both threads.
    ///
    /// The in-flight frame completes - sink notification and VBL step
    /// included - before the render thread exits. Safe to call when already
    /// stopped.
    pub fn stop(&mut self) {
        self.shared.run.request_stop();
        self.join_threads();
    }

    /// Stops the display and invokes the backend's teardown hook.
    pub fn destroy(&mut self) {
        self.stop();
        self.backend.destroy();
        info!("display destroyed");
    }

    /// Whether the backend reports ready to start.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    /// Whether the render thread is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.run.is_running()
    }

    /// The cross-thread surface: waiters, interrupt toggles, observers.
    #[must_use]
    pub fn handle(&self) -> DisplayHandle {
        DisplayHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn join_threads(&mut self) {
        // Pacer first: its final pulse is what unblocks the render loop.
        if let Some(pacer) = self.pacer_thread.take() {
            let _ = pacer.join();
        }
        if let Some(render) = self.render_thread.take() {
            match render.join() {
                Ok(context) => self.context = Some(context),
                Err(_) => warn!("render thread panicked; display cannot be restarted"),
            }
        }
    }
}

impl Drop for DisplayController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable cross-thread surface of a display.
///
/// Everything here is safe to call from any thread, including from
/// interrupt listeners and frame sinks running on the render thread itself
/// (with the exception of [`wait_for_vblank`](Self::wait_for_vblank), which
/// would deadlock there).
#[derive(Clone)]
pub struct DisplayHandle {
    /// Shared display state.
    shared: Arc<DisplayShared>,
}

impl DisplayHandle {
    /// Screen width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.shared.width
    }

    /// Screen height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.shared.height
    }

    /// The scanline currently being drawn.
    #[must_use]
    pub fn vcount(&self) -> u32 {
        self.shared.vcount.load(Ordering::Acquire)
    }

    /// Whether the display is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.run.is_running()
    }

    /// Number of frames whose vertical blank has occurred.
    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.shared.gate.generation()
    }

    /// Requests a cooperative stop; the in-flight frame still completes.
    ///
    /// The owning [`DisplayController`] must still call
    /// [`stop`](DisplayController::stop) to join the threads.
    pub fn request_stop(&self) {
        self.shared.run.request_stop();
    }

    /// Blocks until the next vertical blank.
    ///
    /// Returns immediately with `false` while the display is stopped;
    /// returns `true` once a vertical blank releases the wait. The calling
    /// thread's priority is boosted for the duration of the wait.
    #[must_use = "returns false when the display is stopped"]
    pub fn wait_for_vblank(&self) -> bool {
        let run = &self.shared.run;
        self.shared.gate.wait_next(|| run.is_running())
    }

    /// Enables or disables an interrupt channel.
    ///
    /// Takes effect no later than the next scanline boundary.
    pub fn set_interrupt_enabled(&self, kind: InterruptKind, enabled: bool) {
        self.shared.interrupts.set_enabled(kind, enabled);
    }

    /// Whether an interrupt channel is enabled.
    #[must_use]
    pub fn interrupt_enabled(&self, kind: InterruptKind) -> bool {
        self.shared.interrupts.is_enabled(kind)
    }

    /// Registers an interrupt listener, replacing any previous one.
    pub fn set_interrupt_listener<F>(&self, kind: InterruptKind, listener: F)
    where
        F: FnMut(InterruptKind) + Send + 'static,
    {
        self.shared.interrupts.set_listener(kind, listener);
    }

    /// Removes an interrupt listener; the channel delivers nothing until a
    /// new one is registered, regardless of its enable flag.
    pub fn clear_interrupt_listener(&self, kind: InterruptKind) {
        self.shared.interrupts.clear_listener(kind);
    }
}

/// The render thread body. Returns the context so the controller can
/// restart the display later.
fn render_loop(mut context: RenderContext, shared: &DisplayShared) -> RenderContext {
    info!("render loop started");
    let height = context.framebuffer.height();

    loop {
        // Captured at frame start: a pacer pulse (including the final
        // shutdown pulse) landing anywhere during this frame makes the wait
        // below return immediately instead of being lost.
        let seen = shared.clock.generation();

        for line in 0..height {
            shared.vcount.store(line, Ordering::Release);
            context.framebuffer.clear_row(line);
            context
                .compositor
                .compose_scanline(&mut context.framebuffer, line);
            shared.interrupts.raise(InterruptKind::HorizontalBlank);
        }

        if let Some(sink) = context.sink.as_mut() {
            sink.frame_completed(&context.framebuffer);
        }

        // Waiters are released unconditionally, and strictly before the VBL
        // listener is notified.
        shared.gate.open();
        shared.interrupts.raise(InterruptKind::VerticalBlank);

        // The run flag is part of the wait: if this frame started after the
        // pacer's final shutdown pulse, no further pulse is coming and the
        // stopped state is the only wakeup.
        shared.clock.wait_past_while(seen, || shared.run.is_running());
        if !shared.run.is_running() {
            break;
        }
    }

    // No waiter outlives the display: stragglers wake, observe the stopped
    // state and return without a frame.
    shared.gate.poke();
    info!(frames = shared.gate.generation(), "render loop stopped");
    context
}
