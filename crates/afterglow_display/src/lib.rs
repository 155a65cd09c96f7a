//! # AFTERGLOW Display Core
//!
//! A fixed-resolution bitmap display controller for a handheld-style game
//! client: steady 60Hz frame cadence, simulated horizontal-blank (per
//! scanline) and vertical-blank (per frame) interrupts, and a blocking gate
//! that lets any thread lock its own logic to the display rate.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     DISPLAY CONTROLLER                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐       │
//! │  │ Frame Pacer  │──▶│ Render Loop  │──▶│ Interrupts   │       │
//! │  │ (60Hz pulse) │   │ (scanlines)  │   │ (HBL / VBL)  │       │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘       │
//! │                           │                                   │
//! │               ┌───────────▼───────────┐                       │
//! │               │ Frame Buffer (ARGB)   │──▶ FrameSink          │
//! │               └───────────┬───────────┘                       │
//! │                           │                                   │
//! │               ┌───────────▼───────────┐                       │
//! │               │ Vblank Gate (bcast)   │◀── external waiters   │
//! │               └───────────────────────┘                       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Roles
//!
//! 1. **Pacer thread** - sleeps a fixed interval, pulses the frame clock
//! 2. **Render thread** - composes scanlines, fires interrupts, publishes
//!    the finished buffer, blocks on the frame clock
//! 3. **External threads** - wait for vertical blank, toggle interrupt
//!    enables, register listeners, drive start/stop/destroy
//!
//! ## Rules
//!
//! 1. **Only the render thread writes the frame buffer** - sinks and
//!    compositors see it between scanline/frame boundaries, never torn
//! 2. **Interrupt listeners run on the render thread** - a slow listener
//!    delays subsequent scanlines and frames; that is faithful to how
//!    hardware interrupt handlers behave, so it is the default
//! 3. **Stopping is cooperative** - the in-flight frame always completes

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod interrupt;
pub mod lifecycle;
pub mod pacer;
pub mod vblank;

pub use config::DisplayConfig;
pub use display::{
    DisplayBackend, DisplayController, DisplayHandle, FrameSink, ReadyBackend,
    ScanlineCompositor,
};
pub use error::{DisplayError, DisplayResult};
pub use framebuffer::FrameBuffer;
pub use interrupt::{DispatchMode, InterruptDispatch, InterruptKind};
pub use lifecycle::{RunFlag, RunState};
pub use pacer::{FrameClock, FramePacer, PacingStrategy};
pub use vblank::VblankGate;

/// Default screen width in pixels (handheld-class geometry).
pub const DEFAULT_WIDTH: u32 = 240;

/// Default screen height in pixels.
pub const DEFAULT_HEIGHT: u32 = 160;

/// Default refresh rate in Hz.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Duration of one frame at the default refresh rate, in microseconds.
pub const FRAME_INTERVAL_MICROS: u64 = 1_000_000 / DEFAULT_REFRESH_HZ as u64;

/// Opaque black, the color every scanline is cleared to before composition.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;
