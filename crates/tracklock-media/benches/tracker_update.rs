//! Tracker Benchmarks
//!
//! Measures the per-frame cost of the pieces on the hot path.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package tracklock-media --bench tracker_update
//! ```
//!
//! # Metrics Measured
//! - Coordinate mapping round trip
//! - Tracker update latency per box size
//! - Full pipeline cycle (lock, track) latency

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{GrayImage, Luma};
use std::time::Duration;
use tracklock_media::tracker::{TemplateMatcherConfig, TemplateTracker, VisualTracker};
use tracklock_media::{CoordinateMapper, Frame, FramePipeline, TrackingConfig};
use tracklock_models::{Extent, FrameRect, InputEvent, OverlayRect, TrackerVariant};

/// Textured 240x320 frame with a distinctive block at (bx, by).
fn scene(bx: u32, by: u32, size: u32, sequence: u64) -> Frame {
    let gray = GrayImage::from_fn(240, 320, |x, y| {
        let inside = x >= bx && x < bx + size && y >= by && y < by + size;
        if inside {
            Luma([if (x - bx + y - by) % 6 < 3 { 240 } else { 170 }])
        } else {
            Luma([((x * 7 + y * 3) % 50) as u8 + 10])
        }
    });
    Frame::from_luma(&gray, sequence)
}

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");
    let mapper = CoordinateMapper::new(Extent::new(1080, 1920), Extent::new(240, 320))
        .expect("valid extents");
    let rect = OverlayRect::new(100.0, 200.0, 500.0, 900.0);

    group.throughput(Throughput::Elements(1));
    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let frame_rect = mapper.to_frame_space(black_box(&rect));
            black_box(mapper.to_overlay_space(&frame_rect))
        })
    });

    group.finish();
}

fn bench_template_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_update");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    for size in [16u32, 32, 64] {
        let first = scene(80, 100, size, 0);
        let shifted = scene(84, 102, size, 1);
        let seed = FrameRect::from_xywh(80.0, 100.0, size as f64, size as f64);

        group.bench_with_input(BenchmarkId::new("box", size), &size, |b, _| {
            b.iter(|| {
                let mut tracker =
                    TemplateTracker::new(TrackerVariant::Kcf, TemplateMatcherConfig::default());
                tracker.init(&first, &seed).expect("textured seed");
                black_box(tracker.update(&shifted).ok())
            })
        });
    }

    group.finish();
}

fn bench_pipeline_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.measurement_time(Duration::from_secs(5));

    let frames: Vec<Frame> = (0..8u32).map(|i| scene(60 + i * 2, 120, 32, i as u64)).collect();

    group.bench_function("lock_and_track_8_frames", |b| {
        b.iter(|| {
            let pipeline =
                FramePipeline::with_defaults(TrackingConfig::default(), Extent::new(240, 320))
                    .expect("valid overlay");
            pipeline.handle_input(InputEvent::select_start(60.0, 120.0));
            pipeline.handle_input(InputEvent::select_drag(92.0, 152.0));
            pipeline.handle_input(InputEvent::ToggleLock);
            for frame in &frames {
                black_box(pipeline.on_frame(frame));
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mapping,
    bench_template_update,
    bench_pipeline_cycle
);
criterion_main!(benches);
