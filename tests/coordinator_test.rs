use order_warehouse::lifecycle::{Coordinator, RunMode, WarehouseConfig};
use order_warehouse::model::OrderId;
use order_warehouse::tasks::TaskOutcome;
use order_warehouse::warehouse::{WakePolicy, WarehouseError};
use std::time::Duration;

fn fast_config() -> WarehouseConfig {
    WarehouseConfig {
        produce_delay_ms: 0,
        process_delay_ms: 0,
        join_timeout_ms: 5_000,
        ..WarehouseConfig::default()
    }
}

fn ids(range: std::ops::RangeInclusive<u64>) -> Vec<OrderId> {
    range.map(OrderId).collect()
}

/// The classic run: one producer of 20, four consumers of 5, queue of 10.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_default_run_delivers_every_order() {
    let report = Coordinator::new(fast_config())
        .expect("valid config")
        .run()
        .await
        .expect("run should succeed");

    assert!(!report.forced_stop);
    assert!(report.all_completed());
    assert_eq!(report.accepted(), 20);
    assert_eq!(report.taken(), 20);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.taken_ids(), ids(1..=20));
    for consumer in &report.consumers {
        assert_eq!(consumer.fulfilled.len(), 5);
    }
}

/// Consumers without a quota are stopped once producers are done and the
/// queue has drained.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_until_stopped_consumers_drain_and_exit() {
    let config = WarehouseConfig {
        capacity: 1,
        producers: 2,
        orders_per_producer: 10,
        consumers: 3,
        consumer_quota: None,
        wake_policy: WakePolicy::All,
        ..fast_config()
    };

    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(!report.forced_stop);
    assert!(report.all_completed());
    assert_eq!(report.taken_ids(), ids(1..=20));
    assert_eq!(report.remaining, 0);
}

/// Quotas that outnumber the produced orders would block forever; the bounded
/// join forces a stop and the numbers still add up.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_starved_consumers_are_forced_to_stop() {
    let config = WarehouseConfig {
        orders_per_producer: 6,
        consumers: 2,
        consumer_quota: Some(5),
        join_timeout_ms: 200,
        ..fast_config()
    };

    let started = std::time::Instant::now();
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(report.forced_stop);
    assert_eq!(report.accepted(), 6);
    assert_eq!(report.accepted() - report.taken(), report.remaining);
    assert!(report
        .consumers
        .iter()
        .any(|c| c.outcome == TaskOutcome::Cancelled));
}

/// An external shutdown request stops a run that would otherwise take minutes.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_handle_stops_the_run() {
    let config = WarehouseConfig {
        capacity: 2,
        orders_per_producer: 1_000,
        consumer_quota: None,
        produce_delay_ms: 50,
        join_timeout_ms: 60_000,
        ..WarehouseConfig::default()
    };
    let coordinator = Coordinator::new(config).unwrap();
    let shutdown = coordinator.shutdown_handle();
    assert!(!shutdown.is_shutdown());

    let requester = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        requester.shutdown();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), coordinator.run())
        .await
        .expect("run should stop promptly")
        .unwrap();

    assert!(shutdown.is_shutdown());
    assert_eq!(report.producers[0].outcome, TaskOutcome::Cancelled);
    assert!(report.accepted() < 1_000);
    assert_eq!(report.accepted() - report.taken(), report.remaining);
}

/// Executor mode returns one fulfillment per submitted order.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_executor_mode_fulfills_every_order() {
    let config = WarehouseConfig {
        mode: RunMode::Executor,
        consumers: 3,
        ..fast_config()
    };

    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(!report.forced_stop);
    assert!(report.consumers.is_empty());
    assert_eq!(report.fulfillments.len(), 20);
    assert_eq!(report.taken_ids(), ids(1..=20));
    assert_eq!(report.remaining, 0);
}

#[test]
fn test_invalid_configuration_creates_nothing() {
    let result = Coordinator::new(WarehouseConfig {
        capacity: 0,
        ..WarehouseConfig::default()
    });
    assert!(matches!(result, Err(WarehouseError::Configuration(_))));
}
