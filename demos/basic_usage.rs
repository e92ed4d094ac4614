//! Basic logger usage example
//!
//! Demonstrates the console exporter, the different log levels and the
//! minimum level filter.
//!
//! Run with: cargo run --example basic_usage

use rust_async_logger::prelude::*;
use rust_async_logger::{debug, info, warn};
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Async Logger - Basic Usage Example ===\n");

    let mut logger = AsyncLogger::builder()
        .exporter(ConsoleExporter::new())
        .min_level(LogLevel::Trace)
        .build()?;

    // Log messages at different levels
    println!("1. Logging at different levels:");
    logger.trace("This is a trace message")?;
    logger.debug("This is a debug message")?;
    logger.info("This is an info message")?;
    logger.warn("This is a warning message")?;
    logger.error("This is an error message")?;
    logger.fatal("This is a fatal message")?;
    logger.wait_for_drain(Duration::from_secs(1));

    println!("\n2. Formatting macros:");
    let user = "alice";
    info!(logger, "User {} logged in", user)?;
    warn!(logger, "Disk usage at {}%", 91)?;
    logger.wait_for_drain(Duration::from_secs(1));

    println!("\n3. Minimum level INFO - trace and debug are filtered:");
    let mut filtered = AsyncLogger::builder()
        .exporter(ConsoleExporter::new())
        .min_level(LogLevel::Info)
        .build()?;
    let outcome = debug!(filtered, "Debug message (hidden)")?;
    assert_eq!(outcome, LogOutcome::Filtered);
    filtered.info("Info message (visible)")?;
    filtered.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
