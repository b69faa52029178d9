//! JSON lines handler for structured logging

use crate::core::{Handler, Level, Record, Result, ThresholdCell};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes each record as a single-line JSON object (JSONL format)
///
/// Works over any writer; [`JsonLinesHandler::open`] appends to a file.
pub struct JsonLinesHandler<W: Write + Send> {
    name: String,
    writer: Mutex<W>,
    threshold: ThresholdCell,
}

impl<W: Write + Send> JsonLinesHandler<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
            threshold: ThresholdCell::default(),
        }
    }

    #[must_use]
    pub fn with_threshold(self, level: Level) -> Self {
        self.threshold.set(level);
        self
    }

    /// Take the writer back, e.g. to inspect an in-memory buffer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesHandler<BufWriter<File>> {
    /// Append to the file at `path`, creating it if needed
    pub fn open<P: AsRef<Path>>(name: impl Into<String>, path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(name, BufWriter::new(file)))
    }
}

impl<W: Write + Send> Handler for JsonLinesHandler<W> {
    fn handle(&self, record: &Record) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
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
        self.writer.lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallSite, DefaultRecordBuilder, RecordBuilder};

    #[test]
    fn test_one_object_per_line() {
        let handler = JsonLinesHandler::new("json", Vec::new());
        let builder = DefaultRecordBuilder::new(0);
        for text in ["first", "second\nline"] {
            let record = builder.build("svc", Level::WARN, text.into(), CallSite::caller());
            handler.handle(&record).unwrap();
        }

        let output = String::from_utf8(handler.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["message"], "second\nline");
        assert_eq!(second["level"]["name"], "WARN");
        assert_eq!(second["logger_name"], "svc");
    }
}
