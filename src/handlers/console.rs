//! Console handler implementation

use crate::core::{Handler, Level, Record, Result, ThresholdCell};
use colored::Colorize;
use std::io::Write;

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct ConsoleHandler {
    name: String,
    use_colors: bool,
    time_format: String,
    threshold: ThresholdCell,
}

impl ConsoleHandler {
    pub fn new() -> Self {
        Self {
            name: "console".to_string(),
            use_colors: true,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            threshold: ThresholdCell::default(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_threshold(self, level: Level) -> Self {
        self.threshold.set(level);
        self
    }

    /// Set a strftime-compatible format for the local timestamp
    ///
    /// # Examples
    ///
    /// ```
    /// use fuxlogger::handlers::ConsoleHandler;
    ///
    /// let handler = ConsoleHandler::new().with_time_format("%d/%b/%Y:%H:%M:%S %z");
    /// ```
    #[must_use]
    pub fn with_time_format(mut self, format: &str) -> Self {
        self.time_format = format.to_string();
        self
    }

    fn format_text(&self, record: &Record) -> String {
        let level_str = format!("{:5}", record.level_name());
        let level_str = if self.use_colors {
            level_str.color(record.level().color_code()).to_string()
        } else {
            level_str
        };

        let base = format!(
            "[{}] [{}] {} {}:{} - {}",
            record.timestamp().format(&self.time_format),
            level_str,
            record.thread_name().unwrap_or(record.thread_id()),
            record.file(),
            record.line(),
            record.message()
        );

        match record.stack_trace() {
            Some(trace) => format!("{}\n{}", base, trace),
            None => base,
        }
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn handle(&self, record: &Record) -> Result<()> {
        let output = self.format_text(record);

        // Route ERROR and above to stderr, others to stdout
        if record.level().meets(&Level::ERROR) {
            writeln!(std::io::stderr().lock(), "{}", output)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", output)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> Level {
        self.threshold.get()
    }

    fn set_threshold(&self, level: Level) {
        self.threshold.set(level)
    }

    fn flush(&self) -> Result<()> {
        // Flush both stdout and stderr since we write to both
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}
