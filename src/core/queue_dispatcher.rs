//! Thread-backed queued dispatch
//!
//! One dedicated worker thread per logger drains a crossbeam channel. The
//! worker waits with a bounded timeout; an idle timeout only triggers a flush
//! of the handlers and is never surfaced. The loop ends when every producer
//! handle is gone: either [`QueueDispatcher::close`] or the owning logger being
//! dropped disconnects the channel, after which the worker drains what is
//! already queued and exits.

use super::{
    config::QueueConfig,
    dispatch::{fan_out_isolated, flush_isolated, panic_message, FailureReporter},
    error::{LoggerError, Result},
    handler_set::HandlerSet,
    overflow_policy::OverflowCallback,
    queue::RecordQueue,
    record::Record,
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub(crate) struct QueueDispatcher {
    queue: Option<RecordQueue>,
    worker: Option<thread::JoinHandle<()>>,
}

impl QueueDispatcher {
    pub(crate) fn spawn(
        logger_name: &str,
        config: &QueueConfig,
        handlers: Arc<RwLock<HandlerSet>>,
        reporter: FailureReporter,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        let (queue, receiver) =
            RecordQueue::new(config, Arc::clone(&reporter.metrics), on_overflow, None);
        let poll_interval = config.poll_interval;

        let worker = thread::Builder::new()
            .name(format!("{}-log-worker", logger_name))
            .spawn(move || drain(receiver, handlers, reporter, poll_interval))?;

        Ok(Self {
            queue: Some(queue),
            worker: Some(worker),
        })
    }

    /// Non-blocking except for backpressure from a full bounded queue
    pub(crate) fn submit(&self, record: Arc<Record>) -> Result<()> {
        self.queue
            .as_ref()
            .ok_or(LoggerError::LoggerStopped)?
            .push(record)
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, RecordQueue::len)
    }

    /// Disconnect the queue and join the worker once it has drained.
    ///
    /// Idempotent: the second call finds nothing to join.
    pub(crate) fn close(&mut self) -> Result<()> {
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|payload| LoggerError::WorkerPanicked(panic_message(payload.as_ref())))?;
        }
        Ok(())
    }
}

fn drain(
    receiver: Receiver<Arc<Record>>,
    handlers: Arc<RwLock<HandlerSet>>,
    reporter: FailureReporter,
    poll_interval: Duration,
) {
    let mut unflushed = false;
    loop {
        match receiver.recv_timeout(poll_interval) {
            Ok(record) => {
                let snapshot = handlers.read().clone();
                fan_out_isolated(&snapshot, &record, &reporter);
                unflushed = true;
            }
            Err(RecvTimeoutError::Timeout) => {
                if unflushed {
                    let snapshot = handlers.read().clone();
                    flush_isolated(&snapshot, &reporter);
                    unflushed = false;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let snapshot = handlers.read().clone();
    flush_isolated(&snapshot, &reporter);
}
