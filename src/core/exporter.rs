//! Exporter capability: where consumed events end up

use super::plugins::Capability;
use super::{error::Result, log_event::LogEvent};

/// Sink driven by the consumer thread
///
/// Exporters are shared through the plugin registry, so they take `&self`
/// and keep any mutable state behind their own lock. The consumer calls them
/// from one thread only, in registration order, strictly in sequence order.
pub trait Exporter: Send + Sync {
    fn export(&self, event: &LogEvent) -> Result<()>;

    /// Called after every drained batch
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Called once by the consumer before the first event
    fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Called once by the consumer after the final drain
    fn shutdown(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}

impl Capability for dyn Exporter {
    const NAME: &'static str = "Exporter";
    const DEFAULT_IMPLEMENTATION: &'static str = "console";
}
