//! Benchmarks for the per-scanline render path: row clear plus composition,
//! measured without threads so the numbers reflect pure pixel work.

use afterglow_display::FrameBuffer;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Gradient fill, the same per-row cost profile as the demo compositor.
fn compose_gradient(framebuffer: &mut FrameBuffer, line: u32) {
    let height = framebuffer.height();
    let green = (line * 255 / height.saturating_sub(1).max(1)) & 0xFF;
    let argb = 0xFF00_0000 | (green << 8);
    for pixel in framebuffer.row_mut(line) {
        *pixel = argb;
    }
}

fn bench_scanline(c: &mut Criterion) {
    let mut framebuffer = FrameBuffer::new(240, 160).unwrap();

    c.bench_function("clear_row_240", |b| {
        b.iter(|| {
            framebuffer.clear_row(black_box(80));
        });
    });

    c.bench_function("compose_row_240", |b| {
        b.iter(|| {
            framebuffer.clear_row(80);
            compose_gradient(&mut framebuffer, black_box(80));
        });
    });
}

fn bench_full_frame(c: &mut Criterion) {
    let mut framebuffer = FrameBuffer::new(240, 160).unwrap();

    c.bench_function("compose_frame_240x160", |b| {
        b.iter(|| {
            for line in 0..framebuffer.height() {
                framebuffer.clear_row(line);
                compose_gradient(&mut framebuffer, line);
            }
            black_box(framebuffer.pixels()[0]);
        });
    });
}

criterion_group!(benches, bench_scanline, bench_full_frame);
criterion_main!(benches);
