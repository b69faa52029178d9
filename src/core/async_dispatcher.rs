//! Event-loop-backed queued dispatch
//!
//! One long-lived task on the caller's tokio runtime drains the queue. Handler
//! calls are offloaded with `spawn_blocking` so handler I/O never stalls the
//! loop; for each record every eligible handler is started, then each is
//! awaited in registration order before the next record is taken.
//!
//! Cancellation is cooperative. The task only observes the stop flag at its
//! bounded wait, so an offloaded handler call already in flight always runs to
//! completion. Records queued before the stop request are still dispatched.

use super::{
    config::QueueConfig,
    dispatch::{eligible, panic_message, FailureReporter},
    error::{LoggerError, Result},
    handler_set::HandlerSet,
    overflow_policy::OverflowCallback,
    queue::RecordQueue,
    record::Record,
};
use crossbeam_channel::{Receiver, TryRecvError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub(crate) struct AsyncDispatcher {
    queue: Option<RecordQueue>,
    cancel: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl AsyncDispatcher {
    /// Fails with `InvalidEnvironment` outside a tokio runtime
    pub(crate) fn spawn(
        config: &QueueConfig,
        handlers: Arc<RwLock<HandlerSet>>,
        reporter: FailureReporter,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            LoggerError::environment(format!(
                "Cannot use loop-queued dispatch outside of a tokio runtime ({})",
                e
            ))
        })?;
        ensure_timers()?;

        let wake = Arc::new(Notify::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let (queue, receiver) = RecordQueue::new(
            config,
            Arc::clone(&reporter.metrics),
            on_overflow,
            Some(Arc::clone(&wake)),
        );

        let task = runtime.spawn(drain(
            receiver,
            handlers,
            reporter,
            Arc::clone(&wake),
            Arc::clone(&cancel),
            config.poll_interval,
        ));

        Ok(Self {
            queue: Some(queue),
            cancel,
            wake,
            task: Some(task),
        })
    }

    /// Never blocks: loop mode only admits non-blocking overflow policies.
    ///
    /// Fails with `LoggerStopped` once the drain task has exited, whether by
    /// a stop request or because its runtime went away.
    pub(crate) fn submit(&self, record: Arc<Record>) -> Result<()> {
        if self.task.as_ref().is_some_and(JoinHandle::is_finished) {
            return Err(LoggerError::LoggerStopped);
        }
        self.queue
            .as_ref()
            .ok_or(LoggerError::LoggerStopped)?
            .push(record)
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, RecordQueue::len)
    }

    /// Close the queue and raise the stop flag without waiting
    pub(crate) fn request_stop(&mut self) {
        drop(self.queue.take());
        self.cancel.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Request a stop and wait for the task to unwind.
    ///
    /// A task already torn down by its runtime reports as cancelled; that is
    /// the expected shutdown outcome and is swallowed.
    pub(crate) async fn stop(&mut self) -> Result<()> {
        self.request_stop();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    return Err(LoggerError::WorkerPanicked(panic_message(
                        e.into_panic().as_ref(),
                    )))
                }
            }
        }
        Ok(())
    }
}

impl Drop for AsyncDispatcher {
    fn drop(&mut self) {
        // The detached task finishes what is queued and exits on its own
        self.request_stop();
    }
}

/// The drain loop waits on a tokio timer; a runtime built without
/// `enable_time()` would panic inside the task instead of here.
fn ensure_timers() -> Result<()> {
    std::panic::catch_unwind(|| drop(tokio::time::sleep(Duration::ZERO))).map_err(|_| {
        LoggerError::environment(
            "Cannot use loop-queued dispatch: the tokio runtime has timers disabled \
             (build it with enable_time())",
        )
    })
}

async fn drain(
    receiver: Receiver<Arc<Record>>,
    handlers: Arc<RwLock<HandlerSet>>,
    reporter: FailureReporter,
    wake: Arc<Notify>,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    loop {
        loop {
            match receiver.try_recv() {
                Ok(record) => fan_out_offloaded(&handlers, record, &reporter).await,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        if cancel.load(Ordering::Acquire) {
            return;
        }

        // Bounded wait: yields to the scheduler and re-checks the stop flag on timeout
        let _ = tokio::time::timeout(poll_interval, wake.notified()).await;
    }
}

async fn fan_out_offloaded(
    handlers: &RwLock<HandlerSet>,
    record: Arc<Record>,
    reporter: &FailureReporter,
) {
    let targets = eligible(&handlers.read(), &record);

    let jobs: Vec<_> = targets
        .into_iter()
        .map(|handler| {
            let record = Arc::clone(&record);
            let name = handler.name().to_string();
            let job = tokio::task::spawn_blocking(move || handler.handle(&record));
            (name, job)
        })
        .collect();

    for (name, job) in jobs {
        match job.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => reporter.report(&name, &e),
            Err(e) if e.is_panic() => reporter.report_panic(&name, e.into_panic().as_ref()),
            Err(e) => reporter.report(&name, &LoggerError::handler_failed(&name, e.to_string())),
        }
    }
    reporter.metrics.record_dispatched();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        callsite::CallSite,
        handler_set::SharedHandler,
        log_level::Level,
        metrics::LoggerMetrics,
        record::{DefaultRecordBuilder, RecordBuilder},
    };
    use crate::handlers::MemoryHandler;

    fn record(text: &str) -> Arc<Record> {
        Arc::new(DefaultRecordBuilder::new(0).build(
            "task",
            Level::INFO,
            text.into(),
            CallSite::caller(),
        ))
    }

    fn spawn_with(memory: &Arc<MemoryHandler>) -> Result<(AsyncDispatcher, Arc<LoggerMetrics>)> {
        let metrics = Arc::new(LoggerMetrics::new());
        let handlers = Arc::new(RwLock::new(HandlerSet::from_handlers(vec![
            memory.clone() as SharedHandler,
        ])));
        let dispatcher = AsyncDispatcher::spawn(
            &QueueConfig {
                poll_interval: Duration::from_millis(10),
                ..QueueConfig::default()
            },
            handlers,
            FailureReporter::new(Arc::clone(&metrics), None),
            None,
        )?;
        Ok((dispatcher, metrics))
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let memory = Arc::new(MemoryHandler::new("memory"));
        assert!(matches!(
            spawn_with(&memory),
            Err(LoggerError::InvalidEnvironment(_))
        ));
    }

    #[test]
    fn test_spawn_without_timers_fails() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let memory = Arc::new(MemoryHandler::new("memory"));
        let result = runtime.block_on(async { spawn_with(&memory).map(|_| ()) });
        assert!(matches!(result, Err(LoggerError::InvalidEnvironment(_))));
    }

    #[test]
    fn test_submit_after_runtime_shutdown_fails() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let memory = Arc::new(MemoryHandler::new("memory"));
        let (dispatcher, _) = {
            let _guard = runtime.enter();
            spawn_with(&memory).unwrap()
        };
        drop(runtime);

        assert!(matches!(
            dispatcher.submit(record("orphan")),
            Err(LoggerError::LoggerStopped)
        ));
    }

    #[tokio::test]
    async fn test_stop_drains_queued_records() {
        let memory = Arc::new(MemoryHandler::new("memory"));
        let (mut dispatcher, metrics) = spawn_with(&memory).unwrap();

        for i in 0..20 {
            dispatcher.submit(record(&i.to_string())).unwrap();
        }
        dispatcher.stop().await.unwrap();

        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(memory.messages(), expected);
        assert_eq!(metrics.dispatched(), 20);
        assert!(matches!(
            dispatcher.submit(record("late")),
            Err(LoggerError::LoggerStopped)
        ));
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_handlers_run_off_the_loop() {
        let memory = Arc::new(MemoryHandler::new("memory"));
        let (mut dispatcher, _) = spawn_with(&memory).unwrap();
        dispatcher.submit(record("x")).unwrap();
        dispatcher.stop().await.unwrap();

        let caller = std::thread::current().id();
        assert_eq!(memory.len(), 1);
        assert!(memory.handled_on_ids().iter().all(|id| *id != caller));
    }

    #[tokio::test]
    async fn test_stop_twice_is_quiet() {
        let memory = Arc::new(MemoryHandler::new("memory"));
        let (mut dispatcher, _) = spawn_with(&memory).unwrap();
        dispatcher.stop().await.unwrap();
        dispatcher.stop().await.unwrap();
    }
}
