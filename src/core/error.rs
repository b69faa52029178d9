//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Conflicting or unusable construction options
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// The runtime environment cannot host the requested dispatch mode
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// A log call was made while the handler set was empty
    #[error("Logger '{logger}' needs at least one handler")]
    NoHandlers { logger: String },

    /// Handler lookup by name failed
    #[error("Handler \"{name}\" does not exist")]
    HandlerNotFound { name: String },

    /// Handler lookup by position failed
    #[error("Handler index {index} out of range for {len} handlers")]
    HandlerIndexOutOfRange { index: usize, len: usize },

    /// A dynamically typed selector or threshold had the wrong shape
    #[error("Arg \"{argument}\" must be {expected}, not {found}")]
    InvalidArgumentType {
        argument: String,
        expected: String,
        found: String,
    },

    /// Level name unknown to the registry
    #[error("Level \"{name}\" is not registered")]
    LevelNotFound { name: String },

    /// Registry already holds the name with another severity
    #[error("Level \"{name}\" already registered with severity {existing}, cannot re-register as {requested}")]
    LevelConflict {
        name: String,
        existing: u32,
        requested: u32,
    },

    /// Queue full with buffer details
    #[error("Log queue full: {current}/{max} records buffered")]
    QueueFull { current: usize, max: usize },

    /// Logger already closed or stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// A handler rejected a record
    #[error("Handler '{handler}' failed: {message}")]
    HandlerFailed { handler: String, message: String },

    /// A background worker or task died from a panic
    #[error("Dispatch worker panicked: {0}")]
    WorkerPanicked(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an invalid environment error
    pub fn environment(message: impl Into<String>) -> Self {
        LoggerError::InvalidEnvironment(message.into())
    }

    pub fn no_handlers(logger: impl Into<String>) -> Self {
        LoggerError::NoHandlers {
            logger: logger.into(),
        }
    }

    pub fn handler_not_found(name: impl Into<String>) -> Self {
        LoggerError::HandlerNotFound { name: name.into() }
    }

    /// Create an argument type mismatch error
    pub fn invalid_type(
        argument: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        LoggerError::InvalidArgumentType {
            argument: argument.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn level_not_found(name: impl Into<String>) -> Self {
        LoggerError::LevelNotFound { name: name.into() }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create a handler failure error
    pub fn handler_failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::HandlerFailed {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::queue_full(100, 1000);
        assert!(matches!(err, LoggerError::QueueFull { .. }));

        let err = LoggerError::config("Logger", "enqueue and is_async are exclusive");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::handler_not_found("file");
        assert!(matches!(err, LoggerError::HandlerNotFound { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::queue_full(100, 1000);
        assert_eq!(err.to_string(), "Log queue full: 100/1000 records buffered");

        let err = LoggerError::handler_not_found("console");
        assert_eq!(err.to_string(), "Handler \"console\" does not exist");

        let err = LoggerError::invalid_type("handler", "an index or a name", "bool");
        assert_eq!(
            err.to_string(),
            "Arg \"handler\" must be an index or a name, not bool"
        );

        let err = LoggerError::no_handlers("app");
        assert_eq!(err.to_string(), "Logger 'app' needs at least one handler");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: LoggerError = io_err.into();
        assert!(matches!(err, LoggerError::IoError(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
