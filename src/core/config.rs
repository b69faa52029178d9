//! Construction-time configuration
//!
//! The dispatch strategy is a single [`DispatchMode`] value, so a logger can
//! never be both thread-queued and loop-queued. The legacy `enqueue` /
//! `is_async` flag pair is still accepted through [`DispatchMode::from_flags`]
//! and [`LoggerConfig`], and the conflicting combination is rejected there.

use super::{
    error::{LoggerError, Result},
    overflow_policy::{duration_millis, OverflowPolicy},
    record::DEFAULT_STACK_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default bounded wait of the drain loops
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

/// Queue settings shared by both queued modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// `None` means unbounded
    #[serde(default)]
    pub capacity: Option<usize>,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// How long a drain loop waits for a record before re-checking its state
    #[serde(
        rename = "poll_interval_ms",
        with = "duration_millis",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,
}

impl QueueConfig {
    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            overflow,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            return Err(LoggerError::config("QueueConfig", "capacity must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(LoggerError::config(
                "QueueConfig",
                "poll interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            overflow: OverflowPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a logger routes records to its handlers, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Handlers run on the calling thread
    #[default]
    Sync,
    /// One dedicated worker thread drains a queue
    ThreadQueued(QueueConfig),
    /// One task on the caller's tokio runtime drains a queue
    LoopQueued(QueueConfig),
}

impl DispatchMode {
    /// Map the `enqueue` / `is_async` flag pair onto a mode.
    ///
    /// Both flags set is a configuration error, never a silent downgrade.
    pub fn from_flags(enqueue: bool, is_async: bool, queue: QueueConfig) -> Result<Self> {
        match (enqueue, is_async) {
            (true, true) => Err(LoggerError::config(
                "Logger",
                "Cannot use enqueue and is_async at the same time",
            )),
            (true, false) => Ok(DispatchMode::ThreadQueued(queue)),
            (false, true) => Ok(DispatchMode::LoopQueued(queue)),
            (false, false) => Ok(DispatchMode::Sync),
        }
    }

    pub fn queue_config(&self) -> Option<&QueueConfig> {
        match self {
            DispatchMode::Sync => None,
            DispatchMode::ThreadQueued(queue) | DispatchMode::LoopQueued(queue) => Some(queue),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            DispatchMode::Sync => Ok(()),
            DispatchMode::ThreadQueued(queue) => queue.validate(),
            DispatchMode::LoopQueued(queue) => {
                queue.validate()?;
                if queue.capacity.is_some() && queue.overflow.blocks_producer() {
                    return Err(LoggerError::config(
                        "LoopQueued",
                        format!(
                            "overflow policy {} would block the event loop; \
                             use DropOldest, DropNewest or Reject",
                            queue.overflow
                        ),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Sync => write!(f, "sync"),
            DispatchMode::ThreadQueued(_) => write!(f, "thread-queued"),
            DispatchMode::LoopQueued(_) => write!(f, "loop-queued"),
        }
    }
}

/// Serializable logger options
///
/// # Example
///
/// ```
/// use fuxlogger::{DispatchMode, LoggerConfig};
///
/// let config = LoggerConfig::from_json(r#"{
///     "name": "ingest",
///     "enqueue": true,
///     "queue": { "capacity": 1024, "overflow": "drop_oldest" }
/// }"#).unwrap();
///
/// assert!(matches!(config.dispatch_mode().unwrap(), DispatchMode::ThreadQueued(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub name: String,
    pub enqueue: bool,
    pub is_async: bool,
    pub only_handler: bool,
    /// Frames kept in each record's stack trace; zero disables capture
    pub stack_depth: usize,
    pub queue: QueueConfig,
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn dispatch_mode(&self) -> Result<DispatchMode> {
        DispatchMode::from_flags(self.enqueue, self.is_async, self.queue.clone())
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            enqueue: false,
            is_async: false,
            only_handler: false,
            stack_depth: DEFAULT_STACK_DEPTH,
            queue: QueueConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(
            DispatchMode::from_flags(false, false, QueueConfig::default()).unwrap(),
            DispatchMode::Sync
        );
        assert!(matches!(
            DispatchMode::from_flags(true, false, QueueConfig::default()).unwrap(),
            DispatchMode::ThreadQueued(_)
        ));
        assert!(matches!(
            DispatchMode::from_flags(false, true, QueueConfig::default()).unwrap(),
            DispatchMode::LoopQueued(_)
        ));
        assert!(matches!(
            DispatchMode::from_flags(true, true, QueueConfig::default()),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_loop_mode_rejects_blocking_overflow() {
        let mode = DispatchMode::LoopQueued(QueueConfig::bounded(8, OverflowPolicy::Block));
        assert!(mode.validate().is_err());

        let mode = DispatchMode::LoopQueued(QueueConfig::bounded(8, OverflowPolicy::DropOldest));
        assert!(mode.validate().is_ok());

        // Unbounded queues never overflow, so the policy is irrelevant
        let mode = DispatchMode::LoopQueued(QueueConfig::default());
        assert!(mode.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mode = DispatchMode::ThreadQueued(QueueConfig::bounded(0, OverflowPolicy::Block));
        assert!(matches!(
            mode.validate(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config = LoggerConfig::from_json("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.queue.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.stack_depth, DEFAULT_STACK_DEPTH);
    }

    #[test]
    fn test_config_conflicting_flags() {
        let config =
            LoggerConfig::from_json(r#"{"name": "x", "enqueue": true, "is_async": true}"#).unwrap();
        assert!(config.dispatch_mode().is_err());
    }

    #[test]
    fn test_config_queue_settings() {
        let config = LoggerConfig::from_json(
            r#"{"enqueue": true, "queue": {"capacity": 16, "overflow": "reject", "poll_interval_ms": 25}}"#,
        )
        .unwrap();
        let mode = config.dispatch_mode().unwrap();
        let queue = mode.queue_config().unwrap();
        assert_eq!(queue.capacity, Some(16));
        assert_eq!(queue.overflow, OverflowPolicy::Reject);
        assert_eq!(queue.poll_interval, Duration::from_millis(25));
    }
}
