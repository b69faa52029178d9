//! Handler trait for log output destinations

use super::{error::Result, log_level::Level, record::Record};
use parking_lot::RwLock;

/// An output sink.
///
/// Handlers are shared between the caller and background workers, so every
/// method takes `&self`; implementations keep their mutable state behind a
/// lock. The dispatcher only calls [`Handler::handle`] for records whose level
/// meets [`Handler::threshold`].
pub trait Handler: Send + Sync {
    fn handle(&self, record: &Record) -> Result<()>;

    fn name(&self) -> &str;

    fn threshold(&self) -> Level;

    fn set_threshold(&self, level: Level);

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Mutable threshold shared by the bundled handlers
#[derive(Debug)]
pub struct ThresholdCell(RwLock<Level>);

impl ThresholdCell {
    pub fn new(level: Level) -> Self {
        Self(RwLock::new(level))
    }

    pub fn get(&self) -> Level {
        self.0.read().clone()
    }

    pub fn set(&self, level: Level) {
        *self.0.write() = level;
    }
}

impl Default for ThresholdCell {
    fn default() -> Self {
        Self::new(Level::TRACE)
    }
}
