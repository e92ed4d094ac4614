//! File logging example
//!
//! Demonstrates logging to the console, a plain-text file and a JSON lines
//! file simultaneously.
//!
//! Run with: cargo run --example file_logging

use rust_async_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust Async Logger - File Logging Example ===\n");

    let mut logger = AsyncLogger::builder()
        .exporter(ConsoleExporter::new())
        .exporter(FileExporter::new("application.log")?)
        .exporter(JsonExporter::new("application.jsonl")?)
        .build()?;

    println!("1. Logging to console, text file and JSON file:");

    logger.info("Application started")?;
    logger.debug("Loading configuration...")?;
    logger.info("Configuration loaded successfully")?;
    logger.warn("Using default settings for some options")?;
    logger.log_value(
        LogLevel::Info,
        &serde_json::json!({"event": "db_connect", "pool_size": 8}),
    )?;
    logger.error("Failed to load optional plugin")?;

    println!("\n2. Performing some operations:");

    for i in 1..=5 {
        logger.info(format!("Processing item {}/5", i))?;
        if i == 3 {
            logger.warn("Item 3 took longer than expected")?;
        }
    }

    logger.info("All operations completed")?;

    // Drains the ring and flushes every exporter
    logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log' and 'application.jsonl' for the output");

    Ok(())
}
