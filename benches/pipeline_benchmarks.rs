//! Batch planning benchmarks
//!
//! Measures the pure planning paths that run once per batch over the whole
//! catalog (sharding, slot assignment) and the text parsers that run once
//! per clip.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --bench pipeline_benchmarks
//! ```

use std::time::Duration;

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

use clipmill_cli::catalog::FolderMap;
use clipmill_cli::partition::{assign_slots, shard_videos, ShardConfig};
use clipmill_cli::timing::ClipSpec;

/// Synthetic video ids shaped like production catalog keys.
fn video_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("video_{:06}", i)).collect()
}

/// Timestamp log text with the given number of samples at ~30 fps.
fn log_text(samples: usize) -> String {
    let mut text = String::from("timestamp_us frame_id\n");
    for i in 0..samples {
        text.push_str(&format!("{} {:06}\n", i as i64 * 33_333, i));
    }
    text
}

/// Folder-map text with one `folder/clip` entry per line.
fn folder_map_text(entries: usize) -> String {
    let mut text = String::new();
    for i in 0..entries {
        text.push_str(&format!("frames/clip_{:06}\n", i));
    }
    text
}

/// Benchmark shard selection over catalogs of increasing size.
fn bench_shard_videos(c: &mut Criterion) {
    let mut group = c.benchmark_group("shard_videos");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for count in [1_000, 10_000, 100_000] {
        let ids = video_ids(count);
        let view: Vec<&str> = ids.iter().map(String::as_str).collect();
        let config = ShardConfig {
            num_shards: 8,
            shard_rank: 3,
            ..ShardConfig::default()
        };

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rank_of_8", count), &view, |b, view| {
            b.iter(|| {
                let shard = shard_videos(black_box(view), black_box(&config));
                black_box(shard)
            })
        });
    }

    group.finish();
}

/// Benchmark round-robin slot assignment for one shard's videos.
fn bench_assign_slots(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_slots");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for count in [1_000, 10_000] {
        let ids = video_ids(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("four_slots", count), &ids, |b, ids| {
            b.iter_batched(
                || ids.clone(),
                |batch| assign_slots(black_box(batch), 4),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Benchmark timing derivation from timestamp logs of increasing length.
fn bench_clip_spec_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip_spec_parse");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for samples in [100, 1_000, 10_000] {
        let text = log_text(samples);

        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(
            BenchmarkId::new("from_log_text", samples),
            &text,
            |b, text| {
                b.iter(|| {
                    let spec = ClipSpec::from_log_text(black_box(text));
                    black_box(spec)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark folder-map parsing over maps of increasing size.
fn bench_folder_map_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("folder_map_parse");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for entries in [1_000, 10_000] {
        let text = folder_map_text(entries);

        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::new("parse", entries), &text, |b, text| {
            b.iter(|| {
                let map = FolderMap::parse(black_box(text));
                black_box(map)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_shard_videos,
    bench_assign_slots,
    bench_clip_spec_parse,
    bench_folder_map_parse,
);
criterion_main!(benches);
