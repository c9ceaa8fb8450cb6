use order_warehouse::model::{Catalog, Order, OrderId};
use order_warehouse::tasks::{Consumer, ConsumerQuota, Producer, TaskOutcome};
use order_warehouse::warehouse::{BoundedOrderQueue, StopSignal, WakePolicy, WarehouseError};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn ids(orders: &[Order]) -> Vec<u64> {
    orders.iter().map(|o| o.id().0).collect()
}

fn run_producer(queue: &Arc<BoundedOrderQueue>, name: &str, count: usize) -> thread::JoinHandle<Vec<Order>> {
    let producer = Producer::new(name, queue.clone(), Catalog::default(), count, StopSignal::new());
    thread::spawn(move || producer.run().accepted)
}

fn run_consumer(queue: &Arc<BoundedOrderQueue>, name: &str, quota: usize) -> thread::JoinHandle<Vec<Order>> {
    let consumer = Consumer::new(name, queue.clone(), ConsumerQuota::Fixed(quota), StopSignal::new());
    thread::spawn(move || consumer.run().fulfilled)
}

/// Size sampled from another thread never leaves `0..=capacity`.
#[test]
fn test_capacity_invariant_under_contention() {
    let queue = Arc::new(BoundedOrderQueue::new(3).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let sampler = {
        let queue = queue.clone();
        let done = done.clone();
        let max_seen = max_seen.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                max_seen.fetch_max(queue.size(), Ordering::Relaxed);
            }
        })
    };

    let producers: Vec<_> = (0..3).map(|i| run_producer(&queue, &format!("p{i}"), 30)).collect();
    let consumers: Vec<_> = (0..2).map(|i| run_consumer(&queue, &format!("c{i}"), 45)).collect();

    for handle in producers {
        handle.join().unwrap();
    }
    for handle in consumers {
        handle.join().unwrap();
    }
    done.store(true, Ordering::Release);
    sampler.join().unwrap();

    assert!(max_seen.load(Ordering::Relaxed) <= 3);
    assert_eq!(queue.size(), 0);
}

/// A single consumer sees exactly the accepted sequence; with several consumers
/// each one still sees strictly increasing ids.
#[test]
fn test_fifo_order_is_preserved() {
    let queue = Arc::new(BoundedOrderQueue::new(4).unwrap());
    let producer = run_producer(&queue, "p", 25);
    let consumer = run_consumer(&queue, "c", 25);

    let accepted = producer.join().unwrap();
    let taken = consumer.join().unwrap();
    assert_eq!(ids(&taken), ids(&accepted));

    let queue = Arc::new(BoundedOrderQueue::new(4).unwrap());
    let producer = run_producer(&queue, "p", 40);
    let consumers: Vec<_> = (0..4).map(|i| run_consumer(&queue, &format!("c{i}"), 10)).collect();
    producer.join().unwrap();
    for handle in consumers {
        let seen = ids(&handle.join().unwrap());
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "out of order: {seen:?}");
    }
}

/// Orders put minus orders taken equals the final size.
#[test]
fn test_conservation() {
    let queue = Arc::new(BoundedOrderQueue::new(10).unwrap());
    let accepted = run_producer(&queue, "p", 9).join().unwrap();
    let taken = run_consumer(&queue, "c", 4).join().unwrap();

    assert_eq!(accepted.len() - taken.len(), queue.size());
    assert_eq!(queue.size(), 5);
}

/// Capacity 1, five puts and five takes: both sides finish.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_deadlock_under_saturation() {
    for policy in [WakePolicy::One, WakePolicy::All] {
        let queue = Arc::new(BoundedOrderQueue::with_wake_policy(1, policy).unwrap());
        let producer = Producer::new("p", queue.clone(), Catalog::default(), 5, StopSignal::new());
        let consumer = Consumer::new("c", queue.clone(), ConsumerQuota::Fixed(5), StopSignal::new());

        let both = async move {
            let p = tokio::task::spawn_blocking(move || producer.run());
            let c = tokio::task::spawn_blocking(move || consumer.run());
            (p.await.unwrap(), c.await.unwrap())
        };
        let (produced, consumed) = tokio::time::timeout(Duration::from_secs(5), both)
            .await
            .expect("producer and consumer should not deadlock");

        assert_eq!(produced.outcome, TaskOutcome::Completed);
        assert_eq!(consumed.outcome, TaskOutcome::Completed);
        assert_eq!(ids(&consumed.fulfilled), vec![1, 2, 3, 4, 5]);
        assert_eq!(queue.size(), 0);
    }
}

/// Capacity 10, 20 orders, four consumers taking five each: every id is
/// delivered exactly once.
#[test]
fn test_concurrent_consumers_exclusivity() {
    let queue = Arc::new(BoundedOrderQueue::new(10).unwrap());
    let consumers: Vec<_> = (0..4).map(|i| run_consumer(&queue, &format!("c{i}"), 5)).collect();
    let producer = run_producer(&queue, "p", 20);

    producer.join().unwrap();
    let mut delivered: Vec<u64> = Vec::new();
    for handle in consumers {
        let taken = handle.join().unwrap();
        assert_eq!(taken.len(), 5);
        delivered.extend(ids(&taken));
    }
    delivered.sort_unstable();
    assert_eq!(delivered, (1..=20).collect::<Vec<u64>>());
}

/// A take blocked on an empty queue can be cancelled; the queue keeps working.
#[test]
fn test_cancellation_safety() {
    let queue = Arc::new(BoundedOrderQueue::new(2).unwrap());
    let stop = StopSignal::new();
    let blocked = {
        let queue = queue.clone();
        let stop = stop.clone();
        thread::spawn(move || queue.take(&stop))
    };

    thread::sleep(Duration::from_millis(30));
    stop.stop();
    assert_eq!(blocked.join().unwrap().unwrap_err(), WarehouseError::Cancelled);
    assert_eq!(queue.size(), 0);

    let live = StopSignal::new();
    let order = queue.put("Boots", NonZeroU32::MIN, &live).expect("put after cancellation");
    assert_eq!(order.id(), OrderId(1));
    assert_eq!(queue.take(&live).unwrap().id(), OrderId(1));
}

/// Two producers sharing a queue of 10 get exactly the ids 1..=20.
#[test]
fn test_id_monotonicity_across_producers() {
    let queue = Arc::new(BoundedOrderQueue::new(10).unwrap());
    let consumer = run_consumer(&queue, "c", 20);
    let first = run_producer(&queue, "p1", 10);
    let second = run_producer(&queue, "p2", 10);

    let a = ids(&first.join().unwrap());
    let b = ids(&second.join().unwrap());
    assert!(a.windows(2).all(|w| w[0] < w[1]));
    assert!(b.windows(2).all(|w| w[0] < w[1]));

    let mut all: Vec<u64> = a.into_iter().chain(b).collect();
    all.sort_unstable();
    assert_eq!(all, (1..=20).collect::<Vec<u64>>());

    let taken = ids(&consumer.join().unwrap());
    assert_eq!(taken.len(), 20);
    assert!(taken.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(queue.size(), 0);
}

/// Stopping one consumer leaves the other one running.
#[test]
fn test_task_cancellation_is_local() {
    let queue = Arc::new(BoundedOrderQueue::new(5).unwrap());
    let run = StopSignal::new();
    let first_stop = run.child();

    let first = Consumer::new("c1", queue.clone(), ConsumerQuota::UntilStopped, first_stop.clone());
    let second = Consumer::new("c2", queue.clone(), ConsumerQuota::Fixed(3), run.child());
    let first = thread::spawn(move || first.run());
    let second = thread::spawn(move || second.run());

    first_stop.stop();
    let first = first.join().unwrap();
    assert_eq!(first.outcome, TaskOutcome::Completed);

    let live = StopSignal::new();
    for _ in 0..3 {
        queue.put("Sandals", NonZeroU32::MIN, &live).unwrap();
    }
    let second = second.join().unwrap();
    assert_eq!(second.outcome, TaskOutcome::Completed);
    assert_eq!(second.fulfilled.len() + first.fulfilled.len(), 3);
}
