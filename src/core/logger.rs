//! Main logger implementation

use super::{
    async_dispatcher::AsyncDispatcher,
    callsite::CallSite,
    config::{DispatchMode, LoggerConfig, QueueConfig},
    dispatch::{FailureReporter, HandlerErrorCallback},
    error::{LoggerError, Result},
    handler::Handler,
    handler_set::{HandlerSelector, HandlerSet, SharedHandler, Threshold},
    log_level::{add_level, IntoLevel, Level},
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    queue_dispatcher::QueueDispatcher,
    record::{DefaultRecordBuilder, Message, RecordBuilder, DEFAULT_STACK_DEPTH},
};
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;
use uuid::Uuid;

enum Dispatcher {
    Sync,
    Thread(QueueDispatcher),
    Loop(AsyncDispatcher),
}

/// Logging façade for one named subsystem.
///
/// The dispatch strategy is fixed at construction. Records are always built on
/// the calling thread, so call-site and thread fields describe the caller even
/// when a background worker runs the handlers.
pub struct Logger {
    name: String,
    id: Uuid,
    mode: DispatchMode,
    only_handler: bool,
    handlers: Arc<RwLock<HandlerSet>>,
    record_builder: Arc<dyn RecordBuilder>,
    dispatcher: Dispatcher,
    metrics: Arc<LoggerMetrics>,
    closed: bool,
}

impl Logger {
    /// Synchronous logger over the given handlers
    #[must_use]
    pub fn new(name: impl Into<String>, handlers: Vec<SharedHandler>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
            mode: DispatchMode::Sync,
            only_handler: false,
            handlers: Arc::new(RwLock::new(HandlerSet::from_handlers(handlers))),
            record_builder: Arc::new(DefaultRecordBuilder::default()),
            dispatcher: Dispatcher::Sync,
            metrics: Arc::new(LoggerMetrics::new()),
            closed: false,
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use fuxlogger::prelude::*;
    ///
    /// let mut logger = Logger::builder("app")
    ///     .handler(MemoryHandler::new("memory"))
    ///     .enqueue(true)
    ///     .build()
    ///     .unwrap();
    ///
    /// logger.info("started").unwrap();
    /// logger.close().unwrap();
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    /// Build from serializable options
    pub fn from_config(config: &LoggerConfig, handlers: Vec<SharedHandler>) -> Result<Self> {
        Logger::builder(config.name.clone())
            .handlers(handlers)
            .mode(config.dispatch_mode()?)
            .only_handler(config.only_handler)
            .stack_depth(config.stack_depth)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique per logger instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> &DispatchMode {
        &self.mode
    }

    /// Carried from construction options; it does not alter dispatch
    pub fn only_handler(&self) -> bool {
        self.only_handler
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Records waiting in the dispatch queue; always zero in sync mode
    pub fn pending(&self) -> usize {
        match &self.dispatcher {
            Dispatcher::Sync => 0,
            Dispatcher::Thread(dispatcher) => dispatcher.pending(),
            Dispatcher::Loop(dispatcher) => dispatcher.pending(),
        }
    }

    /// Register a level process-wide
    pub fn add_level(level: Level) -> Result<()> {
        add_level(level)
    }

    #[track_caller]
    pub fn log(&self, level: impl IntoLevel, message: impl Into<Message>) -> Result<()> {
        self.log_at(CallSite::caller(), level, message)
    }

    /// Log with an explicit call site, as the macros do
    pub fn log_at(
        &self,
        site: CallSite,
        level: impl IntoLevel,
        message: impl Into<Message>,
    ) -> Result<()> {
        if self.closed {
            return Err(LoggerError::LoggerStopped);
        }

        self.ensure_handlers()?;
        let record = self
            .record_builder
            .build(&self.name, level.into_level()?, message.into(), site);

        match &self.dispatcher {
            Dispatcher::Sync => {
                // Handlers run on a copy of the set, with no lock held, so they
                // may log or manage handlers through this same logger
                let handlers = self.handlers.read().clone();
                handlers.dispatch(&record)?;
                self.metrics.record_dispatched();
                Ok(())
            }
            Dispatcher::Thread(dispatcher) => dispatcher.submit(Arc::new(record)),
            Dispatcher::Loop(dispatcher) => dispatcher.submit(Arc::new(record)),
        }
    }

    fn ensure_handlers(&self) -> Result<()> {
        if self.handlers.read().is_empty() {
            return Err(LoggerError::no_handlers(&self.name));
        }
        Ok(())
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::TRACE, message)
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::DEBUG, message)
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::INFO, message)
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::WARN, message)
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::ERROR, message)
    }

    #[inline]
    #[track_caller]
    pub fn fatal(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::FATAL, message)
    }

    /// Log `message` followed by the error and its `source()` chain.
    ///
    /// Logs at FATAL when `is_fatal`, else ERROR. With no error the message is
    /// logged on its own; that is not an error path.
    #[track_caller]
    pub fn exception(
        &self,
        message: &str,
        error: Option<&(dyn StdError + 'static)>,
        is_fatal: bool,
    ) -> Result<()> {
        let level = if is_fatal { Level::FATAL } else { Level::ERROR };
        let text = match error {
            Some(error) => format!("{}\n{}", message, format_error_chain(error)),
            None => message.to_string(),
        };
        self.log(level, text)
    }

    /// Append a handler and return the shared instance, usable for removal
    pub fn add_handler<H: Handler + 'static>(&self, handler: H) -> SharedHandler {
        let shared: SharedHandler = Arc::new(handler);
        self.add_shared_handler(Arc::clone(&shared));
        shared
    }

    pub fn add_shared_handler(&self, handler: SharedHandler) {
        self.handlers.write().add(handler);
    }

    /// Remove by instance, index or name
    pub fn remove_handler(&self, selector: impl Into<HandlerSelector>) -> Result<SharedHandler> {
        self.handlers.write().remove(selector)
    }

    /// Set a handler's threshold by instance, index or name.
    ///
    /// A bare number becomes a `CUSTOM` level with that severity.
    pub fn set_level_threshold(
        &self,
        selector: impl Into<HandlerSelector>,
        threshold: impl Into<Threshold>,
    ) -> Result<()> {
        self.handlers.write().set_threshold(selector, threshold)
    }

    pub fn handler(&self, selector: impl Into<HandlerSelector>) -> Result<SharedHandler> {
        self.handlers.read().get(selector).cloned()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.read().names()
    }

    pub fn flush(&self) -> Result<()> {
        let handlers = self.handlers.read().clone();
        handlers.flush()
    }

    /// Tear down background dispatch exactly once.
    ///
    /// - sync: flushes the handlers
    /// - thread-queued: disconnects the queue and joins the worker after it
    ///   has drained every queued record
    /// - loop-queued: requests cooperative cancellation without waiting; use
    ///   [`Logger::stop`] from async code to wait for the task
    ///
    /// Later log calls fail with [`LoggerError::LoggerStopped`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match &mut self.dispatcher {
            Dispatcher::Sync => {}
            Dispatcher::Thread(dispatcher) => return dispatcher.close(),
            Dispatcher::Loop(dispatcher) => {
                dispatcher.request_stop();
                return Ok(());
            }
        }
        self.flush()
    }

    /// Stop the background task and wait for it to finish.
    ///
    /// The expected cancellation is swallowed. In the other modes this is
    /// [`Logger::close`], which may block while a worker thread drains.
    pub async fn stop(&mut self) -> Result<()> {
        if let Dispatcher::Loop(dispatcher) = &mut self.dispatcher {
            self.closed = true;
            return dispatcher.stop().await;
        }
        self.close()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Queued dispatchers detach on drop: their worker or task drains
        // what is queued and exits once the queue disconnects.
        if !self.closed {
            if let Dispatcher::Sync = self.dispatcher {
                if let Err(e) = self.flush() {
                    eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
                }
            }
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} dropped records (drop rate: {:.2}%)",
                self.name,
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("handlers", &self.handler_names())
            .field("closed", &self.closed)
            .finish()
    }
}

fn format_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut out = format!("Error: {}", error);
    let mut source = error.source();
    if source.is_some() {
        out.push_str("\n\nCaused by:");
    }
    let mut depth = 0;
    while let Some(cause) = source {
        let _ = write!(out, "\n    {}: {}", depth, cause);
        depth += 1;
        source = cause.source();
    }
    out
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use fuxlogger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("ingest")
///     .handler(MemoryHandler::new("memory"))
///     .enqueue(true)
///     .capacity(1000)
///     .overflow_policy(OverflowPolicy::DropOldest)
///     .on_overflow(Arc::new(|count: u64| {
///         eprintln!("ALERT: {} records dropped", count);
///     }))
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    name: String,
    handlers: Vec<SharedHandler>,
    mode: Option<DispatchMode>,
    enqueue: bool,
    is_async: bool,
    queue: QueueConfig,
    only_handler: bool,
    record_builder: Option<Arc<dyn RecordBuilder>>,
    stack_depth: usize,
    on_overflow: Option<OverflowCallback>,
    on_handler_error: Option<HandlerErrorCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
            mode: None,
            enqueue: false,
            is_async: false,
            queue: QueueConfig::default(),
            only_handler: false,
            record_builder: None,
            stack_depth: DEFAULT_STACK_DEPTH,
            on_overflow: None,
            on_handler_error: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a handler
    #[must_use = "builder methods return a new value"]
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_handler(mut self, handler: SharedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = SharedHandler>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Select the dispatch mode directly; exclusive with the flag setters
    #[must_use = "builder methods return a new value"]
    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Dispatch through a dedicated worker thread
    #[must_use = "builder methods return a new value"]
    pub fn enqueue(mut self, enqueue: bool) -> Self {
        self.enqueue = enqueue;
        self
    }

    /// Dispatch through a task on the current tokio runtime
    #[must_use = "builder methods return a new value"]
    pub fn is_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    /// Queue settings used with the flag setters
    #[must_use = "builder methods return a new value"]
    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.queue.capacity = Some(capacity);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.queue.overflow = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn only_handler(mut self, only_handler: bool) -> Self {
        self.only_handler = only_handler;
        self
    }

    /// Replace the default record builder
    #[must_use = "builder methods return a new value"]
    pub fn record_builder(mut self, builder: Arc<dyn RecordBuilder>) -> Self {
        self.record_builder = Some(builder);
        self
    }

    /// Frames kept by the default record builder; zero disables capture
    #[must_use = "builder methods return a new value"]
    pub fn stack_depth(mut self, depth: usize) -> Self {
        self.stack_depth = depth;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The parameter is the total count of dropped records.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Set a callback for handler failures on a background worker
    #[must_use = "builder methods return a new value"]
    pub fn on_handler_error(mut self, callback: HandlerErrorCallback) -> Self {
        self.on_handler_error = Some(callback);
        self
    }

    /// Build the Logger.
    ///
    /// Fails on conflicting options, or with `InvalidEnvironment` when
    /// loop-queued dispatch is requested outside a tokio runtime. Nothing is
    /// spawned unless the whole configuration is valid.
    pub fn build(self) -> Result<Logger> {
        let mode = match self.mode {
            Some(_) if self.enqueue || self.is_async => {
                return Err(LoggerError::config(
                    "LoggerBuilder",
                    "mode() cannot be combined with enqueue() or is_async()",
                ))
            }
            Some(mode) => mode,
            None => DispatchMode::from_flags(self.enqueue, self.is_async, self.queue)?,
        };
        mode.validate()?;

        let metrics = Arc::new(LoggerMetrics::new());
        let handlers = Arc::new(RwLock::new(HandlerSet::from_handlers(self.handlers)));
        let reporter = FailureReporter::new(Arc::clone(&metrics), self.on_handler_error);

        let dispatcher = match &mode {
            DispatchMode::Sync => Dispatcher::Sync,
            DispatchMode::ThreadQueued(queue) => Dispatcher::Thread(QueueDispatcher::spawn(
                &self.name,
                queue,
                Arc::clone(&handlers),
                reporter,
                self.on_overflow,
            )?),
            DispatchMode::LoopQueued(queue) => Dispatcher::Loop(AsyncDispatcher::spawn(
                queue,
                Arc::clone(&handlers),
                reporter,
                self.on_overflow,
            )?),
        };

        let record_builder = self
            .record_builder
            .unwrap_or_else(|| Arc::new(DefaultRecordBuilder::new(self.stack_depth)));

        Ok(Logger {
            name: self.name,
            id: Uuid::new_v4(),
            mode,
            only_handler: self.only_handler,
            handlers,
            record_builder,
            dispatcher,
            metrics,
            closed: false,
        })
    }
}
