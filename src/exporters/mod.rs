//! Built-in exporter implementations

pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod json;
pub mod network;

#[cfg(feature = "async-exporters")]
pub mod async_file;

pub use console::ConsoleExporter;
#[cfg(feature = "file")]
pub use file::FileExporter;
pub use json::JsonExporter;
pub use network::NetworkExporter;

#[cfg(feature = "async-exporters")]
pub use async_file::{AsyncExporter, AsyncFileExporter, BlockingExporter};

pub use crate::core::Exporter;
