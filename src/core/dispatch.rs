//! Fan-out used by the background drain loops
//!
//! **Per-handler isolation**: on a worker, each handler call is wrapped in
//! `catch_unwind`, and an error or panic from one handler never keeps the
//! record from the remaining handlers and never stops the drain loop. Failures
//! are counted, written to stderr and passed to the optional error callback.

use super::{
    error::LoggerError,
    handler_set::{HandlerSet, SharedHandler},
    metrics::LoggerMetrics,
    record::Record,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Callback for handler failures on a background worker.
///
/// Receives the handler name and the error it produced.
pub type HandlerErrorCallback = Arc<dyn Fn(&str, &LoggerError) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct FailureReporter {
    pub(crate) metrics: Arc<LoggerMetrics>,
    on_error: Option<HandlerErrorCallback>,
}

impl FailureReporter {
    pub(crate) fn new(metrics: Arc<LoggerMetrics>, on_error: Option<HandlerErrorCallback>) -> Self {
        Self { metrics, on_error }
    }

    pub(crate) fn report(&self, handler: &str, error: &LoggerError) {
        self.metrics.record_handler_failure();
        eprintln!("[LOGGER ERROR] Handler '{}' failed: {}", handler, error);
        if let Some(ref callback) = self.on_error {
            callback(handler, error);
        }
    }

    pub(crate) fn report_panic(&self, handler: &str, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        eprintln!(
            "[LOGGER CRITICAL] Handler '{}' panicked: {}. Other handlers continue to function.",
            handler, message
        );
        let error = LoggerError::handler_failed(handler, format!("panicked: {}", message));
        self.metrics.record_handler_failure();
        if let Some(ref callback) = self.on_error {
            callback(handler, &error);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Handlers whose threshold admits the record, in registration order
pub(crate) fn eligible(handlers: &HandlerSet, record: &Record) -> Vec<SharedHandler> {
    handlers
        .iter()
        .filter(|handler| record.level().meets(&handler.threshold()))
        .cloned()
        .collect()
}

/// Hand one record to every eligible handler on the current thread
pub(crate) fn fan_out_isolated(handlers: &HandlerSet, record: &Record, reporter: &FailureReporter) {
    for handler in handlers.iter() {
        if !record.level().meets(&handler.threshold()) {
            continue;
        }
        match catch_unwind(AssertUnwindSafe(|| handler.handle(record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => reporter.report(handler.name(), &e),
            Err(payload) => reporter.report_panic(handler.name(), payload.as_ref()),
        }
    }
    reporter.metrics.record_dispatched();
}

pub(crate) fn flush_isolated(handlers: &HandlerSet, reporter: &FailureReporter) {
    for handler in handlers.iter() {
        match catch_unwind(AssertUnwindSafe(|| handler.flush())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => reporter.report(handler.name(), &e),
            Err(payload) => reporter.report_panic(handler.name(), payload.as_ref()),
        }
    }
}
