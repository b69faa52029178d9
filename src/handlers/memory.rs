//! In-memory handler that keeps every record it receives

use crate::core::{Handler, Level, Record, Result, ThresholdCell};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

#[derive(Default)]
struct Captured {
    records: Vec<Record>,
    threads: Vec<(ThreadId, Option<String>)>,
}

/// Captures records for inspection.
///
/// Also remembers which thread delivered each record, which makes it handy for
/// checking where a dispatcher ran its handlers.
pub struct MemoryHandler {
    name: String,
    captured: Mutex<Captured>,
    flushes: AtomicUsize,
    threshold: ThresholdCell,
}

impl MemoryHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_threshold(name, Level::TRACE)
    }

    pub fn with_threshold(name: impl Into<String>, threshold: Level) -> Self {
        Self {
            name: name.into(),
            captured: Mutex::new(Captured::default()),
            flushes: AtomicUsize::new(0),
            threshold: ThresholdCell::new(threshold),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.captured.lock().records.clone()
    }

    /// Messages rendered as text, in arrival order
    pub fn messages(&self) -> Vec<String> {
        self.captured
            .lock()
            .records
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.captured.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut captured = self.captured.lock();
        captured.records.clear();
        captured.threads.clear();
    }

    /// Name of the thread that delivered each record (`<unnamed>` if none)
    pub fn handled_on(&self) -> Vec<String> {
        self.captured
            .lock()
            .threads
            .iter()
            .map(|(_, name)| name.clone().unwrap_or_else(|| "<unnamed>".to_string()))
            .collect()
    }

    pub fn handled_on_ids(&self) -> Vec<ThreadId> {
        self.captured.lock().threads.iter().map(|(id, _)| *id).collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl Handler for MemoryHandler {
    fn handle(&self, record: &Record) -> Result<()> {
        let current = thread::current();
        let mut captured = self.captured.lock();
        captured.records.push(record.clone());
        captured
            .threads
            .push((current.id(), current.name().map(String::from)));
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
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
