//! # fuxlogger
//!
//! Structured logging core with three interchangeable dispatch strategies.
//!
//! Each [`Logger`] owns an ordered set of handlers and routes every record to
//! them in one of three ways, fixed at construction:
//!
//! - **Sync**: handlers run inline on the calling thread
//! - **Thread-queued**: records go through a channel to one worker thread
//! - **Loop-queued**: a task on the current tokio runtime drains the queue and
//!   runs handlers on the blocking pool
//!
//! Records are always built on the calling thread, so the call site and thread
//! identity describe the application code that logged.
//!
//! ```
//! use fuxlogger::prelude::*;
//! use std::sync::Arc;
//!
//! let memory = Arc::new(MemoryHandler::new("memory"));
//! let logger = Logger::new("app", vec![memory.clone() as SharedHandler]);
//!
//! fuxlogger::info!(logger, "listening on {}", 8080).unwrap();
//! assert_eq!(memory.messages(), vec!["listening on 8080"]);
//! ```

pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::handlers::ConsoleHandler;
    pub use crate::handlers::{JsonLinesHandler, MemoryHandler};
    pub use crate::core::{
        CallSite, DispatchMode, Handler, HandlerSelector, IntoLevel, Level, Logger,
        LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Message, OverflowPolicy,
        QueueConfig, Record, Result, SharedHandler, Threshold,
    };
}

#[cfg(feature = "console")]
pub use handlers::ConsoleHandler;
pub use handlers::{JsonLinesHandler, MemoryHandler};
pub use core::{
    add_level, get_level, registered_levels, CallSite, DefaultRecordBuilder, DispatchMode,
    Handler, HandlerErrorCallback, HandlerSelector, HandlerSet, IntoLevel, Level, Logger,
    LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Message, OverflowCallback,
    OverflowPolicy, QueueConfig, Record, RecordBuilder, Result, SharedHandler, Threshold,
    ThresholdCell,
};
