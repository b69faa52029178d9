//! Tests for loop-queued dispatch on a tokio runtime
//!
//! These tests verify:
//! - Construction requires a running runtime with timers enabled
//! - A logger outliving its runtime stops cleanly and refuses new records
//! - Records queued before stop are still dispatched, in order
//! - Handlers never run on the runtime's async worker threads
//! - Blocking overflow policies are refused for bounded loop queues

use fuxlogger::handlers::MemoryHandler;
use fuxlogger::{
    DispatchMode, Logger, LoggerConfig, LoggerError, OverflowPolicy, QueueConfig, SharedHandler,
};
use std::sync::Arc;
use std::time::Duration;

fn memory(name: &str) -> Arc<MemoryHandler> {
    Arc::new(MemoryHandler::new(name))
}

#[test]
fn test_loop_mode_requires_runtime() {
    let result = Logger::builder("app")
        .handler(MemoryHandler::new("m"))
        .is_async(true)
        .build();
    assert!(matches!(result, Err(LoggerError::InvalidEnvironment(_))));
}

#[test]
fn test_loop_mode_requires_timers() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let _guard = runtime.enter();
    let result = Logger::builder("app")
        .handler(MemoryHandler::new("m"))
        .is_async(true)
        .build();
    assert!(matches!(result, Err(LoggerError::InvalidEnvironment(_))));
}

#[test]
fn test_stop_after_runtime_dropped() {
    let sink = memory("m");
    let first = tokio::runtime::Runtime::new().unwrap();
    let mut logger = {
        let _guard = first.enter();
        Logger::builder("orphan")
            .shared_handler(sink.clone())
            .is_async(true)
            .build()
            .unwrap()
    };
    drop(first);

    assert!(matches!(logger.info("lost"), Err(LoggerError::LoggerStopped)));

    let second = tokio::runtime::Runtime::new().unwrap();
    assert!(second.block_on(logger.stop()).is_ok());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_stop_dispatches_everything_queued() {
    let sink = memory("m");
    let mut logger = Logger::builder("loop")
        .shared_handler(sink.clone())
        .is_async(true)
        .build()
        .unwrap();

    for i in 0..50 {
        logger.info(format!("{}", i)).unwrap();
    }
    logger.stop().await.unwrap();

    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(sink.messages(), expected);
    assert_eq!(logger.metrics().dispatched(), 50);
    assert!(matches!(logger.info("late"), Err(LoggerError::LoggerStopped)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_records_flow_while_running() {
    let sink = memory("m");
    let mut logger = Logger::builder("live")
        .shared_handler(sink.clone())
        .mode(DispatchMode::LoopQueued(QueueConfig {
            poll_interval: Duration::from_millis(10),
            ..QueueConfig::default()
        }))
        .build()
        .unwrap();

    logger.warning("first").unwrap();
    for _ in 0..100 {
        if !sink.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sink.messages(), vec!["first"]);

    logger.stop().await.unwrap();
}

#[tokio::test]
async fn test_handlers_run_on_blocking_pool() {
    let sink = memory("m");
    let mut logger = Logger::builder("offload")
        .shared_handler(sink.clone())
        .is_async(true)
        .build()
        .unwrap();

    logger.info("x").unwrap();
    logger.stop().await.unwrap();

    let caller = std::thread::current().id();
    assert_eq!(sink.len(), 1);
    assert_ne!(sink.handled_on_ids()[0], caller);

    // The record still describes the caller
    assert_eq!(sink.records()[0].file(), "async_tests.rs");
}

#[tokio::test]
async fn test_stop_is_idempotent_and_close_does_not_wait() {
    let sink = memory("m");
    let mut logger = Logger::builder("twice")
        .shared_handler(sink.clone())
        .is_async(true)
        .build()
        .unwrap();

    logger.close().unwrap();
    assert!(logger.is_closed());
    logger.stop().await.unwrap();
    logger.stop().await.unwrap();
}

#[tokio::test]
async fn test_bounded_loop_queue_rejects_blocking_policy() {
    let result = Logger::builder("blocking")
        .handler(MemoryHandler::new("m"))
        .is_async(true)
        .capacity(8)
        .overflow_policy(OverflowPolicy::Block)
        .build();
    assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));

    let mut logger = Logger::builder("lossy")
        .handler(MemoryHandler::new("m"))
        .is_async(true)
        .capacity(8)
        .overflow_policy(OverflowPolicy::DropOldest)
        .build()
        .unwrap();
    logger.info("ok").unwrap();
    logger.stop().await.unwrap();
}

#[tokio::test]
async fn test_from_config_in_loop_mode() {
    let config = LoggerConfig::from_json(
        r#"{"name": "cfg", "is_async": true, "queue": {"poll_interval_ms": 5}}"#,
    )
    .unwrap();
    let sink = memory("m");
    let mut logger = Logger::from_config(&config, vec![sink.clone() as SharedHandler]).unwrap();

    assert!(matches!(logger.mode(), DispatchMode::LoopQueued(q) if q.poll_interval == Duration::from_millis(5)));
    logger.debug("configured").unwrap();
    logger.stop().await.unwrap();
    assert_eq!(sink.messages(), vec!["configured"]);
}
