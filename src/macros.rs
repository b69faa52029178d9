//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. Unlike the plain
//! methods they also record the enclosing module and function.
//!
//! # Examples
//!
//! ```
//! use fuxlogger::prelude::*;
//! use fuxlogger::info;
//!
//! let logger = Logger::new("app", vec![std::sync::Arc::new(MemoryHandler::new("m")) as SharedHandler]);
//!
//! // Basic logging
//! info!(logger, "Server started").unwrap();
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//! ```

/// Capture the current file, line, module and enclosing function.
///
/// # Examples
///
/// ```
/// fn handshake() -> fuxlogger::CallSite {
///     fuxlogger::callsite!()
/// }
///
/// assert_eq!(handshake().function, Some("handshake"));
/// ```
#[macro_export]
macro_rules! callsite {
    () => {{
        fn __callsite_marker() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::core::CallSite::new(
            file!(),
            line!(),
            module_path!(),
            $crate::core::callsite::function_name(__type_name_of(__callsite_marker)),
        )
    }};
}

/// Log a message with automatic formatting.
///
/// The level may be anything that converts into a level, including a
/// registered name.
///
/// # Examples
///
/// ```
/// # use fuxlogger::prelude::*;
/// # let logger = Logger::new("app", vec![std::sync::Arc::new(MemoryHandler::new("m")) as SharedHandler]);
/// use fuxlogger::log;
/// log!(logger, Level::INFO, "Simple message").unwrap();
/// log!(logger, "error", "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at($crate::callsite!(), $level, format!($($arg)+))
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::TRACE, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use fuxlogger::prelude::*;
/// # let logger = Logger::new("app", vec![std::sync::Arc::new(MemoryHandler::new("m")) as SharedHandler]);
/// use fuxlogger::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5).unwrap();
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::FATAL, $($arg)+)
    };
}
