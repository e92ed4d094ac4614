//! Criterion benchmarks for rust_async_logger

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_async_logger::core::plugins::Plugins;
use rust_async_logger::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Discards everything so only pipeline overhead is measured
struct NullExporter;

impl Exporter for NullExporter {
    fn export(&self, event: &LogEvent) -> Result<()> {
        black_box(event);
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

fn logger(capacity: usize, policy: BackpressurePolicy) -> AsyncLogger {
    let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
    AsyncLogger::builder()
        .plugins(Arc::new(plugins))
        .capacity(capacity)
        .backpressure(policy)
        .exporter(NullExporter)
        .build()
        .expect("Failed to build logger")
}

// ============================================================================
// Logger Creation Benchmarks
// ============================================================================

fn bench_logger_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_lifecycle");
    group.throughput(Throughput::Elements(1));

    for capacity in [64, 1024, 16384] {
        group.bench_with_input(BenchmarkId::new("build_shutdown", capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let logger = logger(cap, BackpressurePolicy::Block);
                black_box(&logger);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Producer Benchmarks
// ============================================================================

fn bench_single_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_producer");
    group.throughput(Throughput::Elements(1));

    let logger = logger(8192, BackpressurePolicy::Block);

    group.bench_function("text", |b| {
        b.iter(|| logger.info(black_box("Info message")).unwrap());
    });

    group.bench_function("bytes", |b| {
        b.iter(|| logger.log_bytes(LogLevel::Info, black_box(b"raw payload bytes")).unwrap());
    });

    group.bench_function("typed_value", |b| {
        let value = json!({"user_id": 42, "action": "login", "ok": true});
        b.iter(|| logger.log_value(LogLevel::Info, black_box(&value)).unwrap());
    });

    group.bench_function("filtered", |b| {
        let producer = AsyncLogger::builder()
            .plugins(Arc::new(Plugins::new(
                SystemProperties::isolated(),
                FileProperties::empty(),
            )))
            .min_level(LogLevel::Error)
            .exporter(NullExporter)
            .build()
            .unwrap();
        b.iter(|| producer.debug(black_box("filtered out")).unwrap());
    });

    group.finish();
}

fn bench_drop_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop_policy");
    group.throughput(Throughput::Elements(1));

    // A tiny ring keeps most claims on the overflow path
    let logger = logger(2, BackpressurePolicy::Drop);
    group.bench_function("tiny_ring", |b| {
        b.iter(|| logger.log_bytes(LogLevel::Info, black_box(b"maybe dropped")).unwrap());
    });

    group.finish();
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers");
    const PER_THREAD: usize = 1_000;

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements((threads * PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let logger = logger(4096, BackpressurePolicy::Block);
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let producer = logger.producer();
                        thread::spawn(move || {
                            for i in 0..PER_THREAD {
                                producer.log_value(LogLevel::Info, &i).unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Round Trip Benchmarks
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Elements(1));

    let logger = logger(1024, BackpressurePolicy::Block);

    // Publish one event and wait until the consumer has exported it
    group.bench_function("publish_to_export", |b| {
        b.iter(|| {
            logger.log_bytes(LogLevel::Info, black_box(b"round trip")).unwrap();
            logger.wait_for_drain(Duration::from_secs(1))
        });
    });

    group.finish();
}

// ============================================================================
// Event Formatting Benchmarks
// ============================================================================

fn bench_event_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_formatting");

    let event = LogEvent::value(LogLevel::Warn, "multi\nline\tmessage").unwrap();

    group.bench_function("display", |b| {
        b.iter(|| black_box(&event).to_string());
    });

    group.bench_function("json", |b| {
        b.iter(|| serde_json::to_string(black_box(&event)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_logger_lifecycle,
    bench_single_producer,
    bench_drop_policy,
    bench_concurrent_producers,
    bench_round_trip,
    bench_event_formatting,
);

criterion_main!(benches);
