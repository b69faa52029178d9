//! Core logger types and traits

mod async_dispatcher;
pub mod callsite;
pub mod config;
mod dispatch;
pub mod error;
pub mod handler;
pub mod handler_set;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
mod queue;
mod queue_dispatcher;
pub mod record;

pub use callsite::CallSite;
pub use config::{DispatchMode, LoggerConfig, QueueConfig, DEFAULT_POLL_INTERVAL};
pub use dispatch::HandlerErrorCallback;
pub use error::{LoggerError, Result};
pub use handler::{Handler, ThresholdCell};
pub use handler_set::{HandlerSelector, HandlerSet, SharedHandler, Threshold};
pub use log_level::{
    add_level, get_level, registered_levels, IntoLevel, Level, CUSTOM_LEVEL_NAME,
};
pub use logger::{Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use record::{DefaultRecordBuilder, Message, Record, RecordBuilder, DEFAULT_STACK_DEPTH};
