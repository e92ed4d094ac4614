//! Plugin resolution example
//!
//! Shows how the exporter set is chosen: a system property override beats
//! a configuration file override, which beats registered service providers,
//! which beat the built-in console exporter.
//!
//! Run with: cargo run --example plugin_resolution

use rust_async_logger::core::plugins::{implementation_key, Plugins};
use rust_async_logger::prelude::*;
use std::sync::Arc;

struct Tagged(&'static str);

impl Exporter for Tagged {
    fn export(&self, event: &LogEvent) -> Result<()> {
        println!("   <{}> {}", self.0, event);
        Ok(())
    }

    fn name(&self) -> &str {
        self.0
    }
}

fn plugins(system: Option<&str>, file: Option<&str>) -> Result<Plugins> {
    let key = implementation_key::<dyn Exporter>();

    let system_props = SystemProperties::isolated();
    if let Some(name) = system {
        system_props.set(key.clone(), name);
    }
    let file_props = match file {
        Some(name) => FileProperties::from_json_str(&format!(r#"{{"{}": "{}"}}"#, key, name))?,
        None => FileProperties::empty(),
    };

    let mut plugins = Plugins::new(system_props, file_props);
    let catalog = plugins.exporter_catalog_mut();
    catalog.register("x", || Ok(Arc::new(Tagged("x")) as Arc<dyn Exporter>));
    catalog.register("y", || Ok(Arc::new(Tagged("y")) as Arc<dyn Exporter>));
    catalog.register_service("z", || Ok(Arc::new(Tagged("z")) as Arc<dyn Exporter>));
    Ok(plugins)
}

fn run(label: &str, plugins: Plugins) -> Result<()> {
    let resolution = plugins.exporter_resolution()?;
    println!("{} -> {:?}", label, resolution.source);

    let mut logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
    logger.info(label.to_string())?;
    logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    Ok(())
}

fn main() -> Result<()> {
    println!("=== Rust Async Logger - Plugin Resolution Example ===\n");

    run("system=x file=y", plugins(Some("x"), Some("y"))?)?;
    run("file=y", plugins(None, Some("y"))?)?;
    run("services only", plugins(None, None)?)?;
    run(
        "nothing registered",
        Plugins::new(SystemProperties::isolated(), FileProperties::empty()),
    )?;

    println!("\nRegistration after resolution is refused:");
    let plugins = plugins(None, None)?;
    plugins.exporters()?;
    match plugins.register_exporters(vec![Arc::new(Tagged("late")) as Arc<dyn Exporter>]) {
        Err(e) => println!("   {}", e),
        Ok(()) => println!("   unexpectedly accepted"),
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
