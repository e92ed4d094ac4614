//! Console exporter implementation

use crate::core::{log_event::TIMESTAMP_FORMAT, Exporter, LogEvent, LogLevel, Result};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

/// Writes one line per event; `Error` and `Fatal` go to stderr, the rest to stdout
pub struct ConsoleExporter {
    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    use_colors: bool,
}

impl ConsoleExporter {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "console"),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn level_label(&self, level: LogLevel) -> String {
        let label = format!("{:5}", level.to_str());

        #[cfg(feature = "console")]
        if self.use_colors {
            return label.color(level.color_code()).to_string();
        }

        label
    }

    /// Format as text with optional colors
    pub fn format_line(&self, event: &LogEvent) -> String {
        format!(
            "[{}] [{}] #{} {} - {}",
            event.timestamp.format(TIMESTAMP_FORMAT),
            self.level_label(event.level),
            event.sequence,
            event.thread_label(),
            event.sanitized_message()
        )
    }
}

impl Default for ConsoleExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for ConsoleExporter {
    fn export(&self, event: &LogEvent) -> Result<()> {
        let line = self.format_line(event);

        match event.level {
            LogLevel::Error | LogLevel::Fatal => writeln!(std::io::stderr().lock(), "{}", line)?,
            _ => writeln!(std::io::stdout().lock(), "{}", line)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Flush both stdout and stderr since we write to both
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
