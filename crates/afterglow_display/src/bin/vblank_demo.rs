//! Soak demo: runs the display for a couple of seconds with a gradient
//! test-pattern compositor, a frame-counting sink and a main thread locked
//! to the vertical blank, then reports the achieved frame rate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use afterglow_display::{
    DisplayConfig, DisplayController, DisplayResult, FrameBuffer, FrameSink, InterruptKind,
};
use tracing::info;

/// Counts completed frames.
struct FrameCounter(Arc<AtomicU64>);

impl FrameSink for FrameCounter {
    fn register_buffer(&mut self, framebuffer: &FrameBuffer) {
        info!(
            width = framebuffer.width(),
            height = framebuffer.height(),
            "buffer registered"
        );
    }

    fn frame_completed(&mut self, _framebuffer: &FrameBuffer) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() -> DisplayResult<()> {
    tracing_subscriber::fmt::init();

    let config = DisplayConfig::default();
    let height = config.height;

    // Vertical green gradient, one row per scanline.
    let compositor = move |framebuffer: &mut FrameBuffer, line: u32| {
        let green = (line * 255 / height.saturating_sub(1).max(1)) & 0xFF;
        let argb = 0xFF00_0000 | (green << 8);
        for pixel in framebuffer.row_mut(line) {
            *pixel = argb;
        }
    };

    let frames = Arc::new(AtomicU64::new(0));
    let mut display = DisplayController::new(config, compositor)?
        .with_sink(FrameCounter(Arc::clone(&frames)));
    let handle = display.handle();

    handle.set_interrupt_listener(InterruptKind::VerticalBlank, |_| {});
    handle.set_interrupt_enabled(InterruptKind::VerticalBlank, true);

    assert!(display.start());
    let started = Instant::now();

    // Lock this thread to the display rate for two seconds' worth of
    // frames.
    let mut waits = 0u32;
    while waits < 120 && handle.wait_for_vblank() {
        waits += 1;
    }

    let elapsed = started.elapsed();
    display.destroy();

    let presented = frames.load(Ordering::Relaxed);
    let fps = presented as f64 / elapsed.as_secs_f64();
    info!(presented, waits, elapsed_ms = elapsed.as_millis() as u64, fps, "soak finished");

    Ok(())
}
