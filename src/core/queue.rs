//! Producer side of the dispatch queues
//!
//! Both queued modes share one MPMC channel wrapper. The producer keeps its own
//! receiver clone so `DropOldest` can evict from the head of the queue without
//! involving the consumer.

use super::{
    config::QueueConfig,
    error::{LoggerError, Result},
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    record::Record,
};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use tokio::sync::Notify;

const ALERT_EVERY: u64 = 1000;

pub(crate) struct RecordQueue {
    sender: Sender<Arc<Record>>,
    evictor: Receiver<Arc<Record>>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    metrics: Arc<LoggerMetrics>,
    on_overflow: Option<OverflowCallback>,
    /// Wakes an event-loop consumer after each admission
    waker: Option<Arc<Notify>>,
}

impl RecordQueue {
    pub(crate) fn new(
        config: &QueueConfig,
        metrics: Arc<LoggerMetrics>,
        on_overflow: Option<OverflowCallback>,
        waker: Option<Arc<Notify>>,
    ) -> (Self, Receiver<Arc<Record>>) {
        let (sender, receiver) = match config.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let queue = Self {
            sender,
            evictor: receiver.clone(),
            capacity: config.capacity,
            policy: config.overflow.clone(),
            metrics,
            on_overflow,
            waker,
        };
        (queue, receiver)
    }

    pub(crate) fn len(&self) -> usize {
        self.sender.len()
    }

    pub(crate) fn push(&self, record: Arc<Record>) -> Result<()> {
        match self.sender.try_send(record) {
            Ok(()) => {
                self.admitted();
                Ok(())
            }
            Err(TrySendError::Full(record)) => self.handle_overflow(record),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
        }
    }

    fn admitted(&self) {
        self.metrics.record_enqueued();
        if let Some(ref waker) = self.waker {
            waker.notify_one();
        }
    }

    /// Only reachable for bounded queues
    fn handle_overflow(&self, record: Arc<Record>) -> Result<()> {
        self.metrics.record_queue_full();
        let max = self.capacity.unwrap_or_default();

        match &self.policy {
            OverflowPolicy::Block => {
                self.metrics.record_block();
                self.sender
                    .send(record)
                    .map_err(|_| LoggerError::LoggerStopped)?;
                self.admitted();
                Ok(())
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match self.sender.send_timeout(record, *timeout) {
                    Ok(()) => {
                        self.admitted();
                        Ok(())
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.alert_dropped(false);
                        Ok(())
                    }
                    Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
                }
            }

            OverflowPolicy::DropOldest => {
                let mut record = record;
                loop {
                    if self.evictor.try_recv().is_ok() {
                        self.alert_dropped(true);
                    }
                    match self.sender.try_send(record) {
                        Ok(()) => {
                            self.admitted();
                            return Ok(());
                        }
                        // Another producer took the freed slot
                        Err(TrySendError::Full(back)) => record = back,
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(LoggerError::LoggerStopped)
                        }
                    }
                }
            }

            OverflowPolicy::DropNewest => {
                self.alert_dropped(false);
                Ok(())
            }

            OverflowPolicy::Reject => {
                self.metrics.record_dropped();
                Err(LoggerError::queue_full(self.len(), max))
            }
        }
    }

    /// Count a lost record; alert on the first loss and periodically thereafter
    fn alert_dropped(&self, evicted: bool) {
        let previous = if evicted {
            self.metrics.record_evicted()
        } else {
            self.metrics.record_dropped()
        };
        let total = previous + 1;

        if previous == 0 || total % ALERT_EVERY == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full ({} policy), {} records dropped. \
                 Consider a larger capacity or a blocking policy.",
                self.policy, total
            );
            if let Some(ref callback) = self.on_overflow {
                callback(total);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{callsite::CallSite, log_level::Level, record::{DefaultRecordBuilder, RecordBuilder}};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn record(text: &str) -> Arc<Record> {
        Arc::new(DefaultRecordBuilder::new(0).build(
            "queue",
            Level::INFO,
            text.into(),
            CallSite::caller(),
        ))
    }

    fn bounded_config(capacity: usize, overflow: OverflowPolicy) -> QueueConfig {
        QueueConfig {
            capacity: Some(capacity),
            overflow,
            ..QueueConfig::default()
        }
    }

    fn drain(receiver: &Receiver<Arc<Record>>) -> Vec<String> {
        receiver
            .try_iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    #[test]
    fn test_unbounded_preserves_order() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = RecordQueue::new(&QueueConfig::default(), metrics.clone(), None, None);
        for i in 0..5 {
            queue.push(record(&i.to_string())).unwrap();
        }
        assert_eq!(drain(&receiver), vec!["0", "1", "2", "3", "4"]);
        assert_eq!(metrics.enqueued(), 5);
    }

    #[test]
    fn test_drop_oldest_evicts_head() {
        let metrics = Arc::new(LoggerMetrics::new());
        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = Arc::clone(&calls);
        let callback: OverflowCallback = Arc::new(move |_: u64| {
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });
        let (queue, receiver) = RecordQueue::new(
            &bounded_config(2, OverflowPolicy::DropOldest),
            metrics.clone(),
            Some(callback),
            None,
        );

        for text in ["a", "b", "c", "d"] {
            queue.push(record(text)).unwrap();
        }

        assert_eq!(drain(&receiver), vec!["c", "d"]);
        assert_eq!(metrics.evicted(), 2);
        assert_eq!(metrics.dropped_count(), 2);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_drop_newest_keeps_head() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = RecordQueue::new(
            &bounded_config(1, OverflowPolicy::DropNewest),
            metrics.clone(),
            None,
            None,
        );
        queue.push(record("first")).unwrap();
        queue.push(record("second")).unwrap();
        assert_eq!(drain(&receiver), vec!["first"]);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.queue_full_events(), 1);
    }

    #[test]
    fn test_reject_reports_queue_full() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, _receiver) = RecordQueue::new(
            &bounded_config(1, OverflowPolicy::Reject),
            metrics.clone(),
            None,
            None,
        );
        queue.push(record("first")).unwrap();
        let err = queue.push(record("second")).unwrap_err();
        assert!(matches!(err, LoggerError::QueueFull { current: 1, max: 1 }));
    }

    #[test]
    fn test_block_with_timeout_drops_after_wait() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = RecordQueue::new(
            &bounded_config(1, OverflowPolicy::BlockWithTimeout(Duration::from_millis(20))),
            metrics.clone(),
            None,
            None,
        );
        queue.push(record("first")).unwrap();
        queue.push(record("second")).unwrap();
        assert_eq!(metrics.block_events(), 1);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(drain(&receiver), vec!["first"]);
    }

    #[test]
    fn test_block_waits_for_consumer() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = RecordQueue::new(
            &bounded_config(1, OverflowPolicy::Block),
            metrics.clone(),
            None,
            None,
        );
        queue.push(record("first")).unwrap();

        let consumer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            let mut seen = Vec::new();
            while let Ok(r) = receiver.recv_timeout(Duration::from_millis(200)) {
                seen.push(r.message().to_string());
            }
            seen
        });

        queue.push(record("second")).unwrap();
        drop(queue);
        assert_eq!(consumer.join().unwrap(), vec!["first", "second"]);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.block_events(), 1);
    }

    #[test]
    fn test_consumer_drop_keeps_queue_open() {
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = RecordQueue::new(&QueueConfig::default(), metrics, None, None);
        drop(receiver);
        // The evictor clone keeps the channel alive; only the producer side closes it
        assert!(queue.push(record("still accepted")).is_ok());
        assert_eq!(queue.len(), 1);
    }
}
