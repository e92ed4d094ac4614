//! Multi-producer logging example
//!
//! Several threads log through cloned producers while a single consumer
//! thread exports in publication order. Ends with the pipeline metrics.
//!
//! Run with: cargo run --example async_logging

use rust_async_logger::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Async Logger - Multi-Producer Example ===\n");

    let mut logger = AsyncLogger::builder()
        .capacity(256)
        .backpressure(BackpressurePolicy::Block)
        .exporter(ConsoleExporter::new())
        .build()?;

    println!("1. Five producer threads, 20 events each:");

    let handles: Vec<_> = (0..5)
        .map(|thread_id| {
            let producer = logger.producer();
            thread::Builder::new()
                .name(format!("worker-{}", thread_id))
                .spawn(move || -> Result<()> {
                    for i in 0..20 {
                        producer.log_value(
                            LogLevel::Info,
                            &serde_json::json!({"worker": thread_id, "step": i}),
                        )?;
                        thread::sleep(Duration::from_millis(2));
                    }
                    Ok(())
                })
        })
        .collect::<std::io::Result<_>>()?;

    for handle in handles {
        if let Ok(result) = handle.join() {
            result?;
        }
    }

    println!("\n2. A tiny ring with the drop policy:");

    let mut lossy = AsyncLogger::builder()
        .capacity(4)
        .backpressure(BackpressurePolicy::Drop)
        .exporter(ConsoleExporter::new())
        .on_overflow(Arc::new(|dropped: u64| {
            eprintln!("   overflow callback: {} dropped so far", dropped);
        }))
        .build()?;
    for i in 0..50 {
        lossy.log_bytes(LogLevel::Debug, format!("burst {}", i).as_bytes())?;
    }
    lossy.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    println!(
        "   published {} dropped {}",
        lossy.metrics().published(),
        lossy.metrics().dropped_count()
    );

    let clean = logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    let metrics = logger.metrics();
    println!("\n3. Metrics:");
    println!("   published: {}", metrics.published());
    println!("   exported:  {}", metrics.exported());
    println!("   blocked:   {}", metrics.block_events());
    println!("   clean shutdown: {}", clean);

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
