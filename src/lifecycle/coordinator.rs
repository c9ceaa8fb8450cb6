use crate::lifecycle::{RunMode, WarehouseConfig};
use crate::model::{Catalog, OrderId};
use crate::tasks::{
    BatchReport, Consumer, ConsumerQuota, ConsumerReport, Fulfillment, FulfillmentService,
    Producer, ProducerReport, TaskOutcome,
};
use crate::warehouse::{BoundedOrderQueue, StopSignal, WarehouseError};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

/// How long tasks get to exit after a forced stop before they are abandoned.
pub const FORCED_STOP_GRACE: Duration = Duration::from_secs(1);

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The driver for one warehouse run.
///
/// `Coordinator` is responsible for:
/// - **Construction**: validating the config and building the shared queue
/// - **Task Startup**: spawning producers and consumers on the blocking pool
/// - **Bounded Join**: waiting for every task, forcing a stop at the deadline
/// - **Reporting**: collecting task reports and the final queue size
///
/// # Example
///
/// ```ignore
/// let coordinator = Coordinator::new(WarehouseConfig::default())?;
/// let shutdown = coordinator.shutdown_handle();
///
/// let report = coordinator.run().await?;
/// info!(remaining = report.remaining, "Done");
/// ```
pub struct Coordinator {
    config: WarehouseConfig,
    catalog: Catalog,
    queue: Arc<BoundedOrderQueue>,

    /// Run-level signal; every task holds a child of it.
    stop: StopSignal,
}

/// Requests a broadcast stop of a running [`Coordinator`] from outside the run.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    stop: StopSignal,
    queue: Arc<BoundedOrderQueue>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        warn!("Shutdown requested");
        self.stop.stop();
        self.queue.interrupt_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.is_stopped()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
    /// Executor mode only: one entry per completed fulfillment job.
    pub fulfillments: Vec<Fulfillment>,
    /// Queue size after every task has been joined.
    pub remaining: usize,
    /// True when the join deadline passed and the coordinator had to stop tasks.
    pub forced_stop: bool,
}

impl RunReport {
    pub fn accepted(&self) -> usize {
        self.producers.iter().map(|p| p.accepted.len()).sum()
    }

    pub fn taken(&self) -> usize {
        self.consumers.iter().map(|c| c.fulfilled.len()).sum::<usize>() + self.fulfillments.len()
    }

    /// Ids of every order removed from the queue, sorted.
    pub fn taken_ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .consumers
            .iter()
            .flat_map(|c| c.fulfilled.iter().map(|o| o.id()))
            .chain(self.fulfillments.iter().map(|f| f.fulfilled.id()))
            .collect();
        ids.sort();
        ids
    }

    pub fn all_completed(&self) -> bool {
        self.producers.iter().all(|p| p.outcome.is_completed())
            && self.consumers.iter().all(|c| c.outcome.is_completed())
    }
}

impl Coordinator {
    /// Validates `config` and builds the queue. Nothing is started yet.
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        config.validate()?;
        let catalog = config.catalog()?;
        let queue = Arc::new(BoundedOrderQueue::with_wake_policy(
            config.capacity,
            config.wake_policy,
        )?);

        Ok(Self {
            config,
            catalog,
            queue,
            stop: StopSignal::new(),
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn queue(&self) -> Arc<BoundedOrderQueue> {
        self.queue.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: self.stop.clone(),
            queue: self.queue.clone(),
        }
    }

    /// Starts every task, waits for them and reports the final queue state.
    ///
    /// The wait is bounded by `join_timeout`. Tasks still running at the
    /// deadline are stopped, given [`FORCED_STOP_GRACE`] to exit, and reported
    /// as failed if they still have not.
    pub async fn run(self) -> Result<RunReport, WarehouseError> {
        let mode = self.config.mode;
        let report = match mode {
            RunMode::Tasks => self.run_tasks().await,
            RunMode::Executor => self.run_executor().await?,
        };

        info!(
            accepted = report.accepted(),
            taken = report.taken(),
            forced_stop = report.forced_stop,
            remaining = report.remaining,
            "Remaining orders in warehouse"
        );
        Ok(report)
    }

    async fn run_tasks(self) -> RunReport {
        let config = &self.config;
        info!(
            capacity = config.capacity,
            producers = config.producers,
            consumers = config.consumers,
            orders = config.total_orders(),
            categories = self.catalog.len(),
            wake_policy = ?self.queue.wake_policy(),
            "Starting warehouse run"
        );

        let mut producers: Vec<Tracked<ProducerReport>> = (1..=config.producers)
            .map(|i| {
                let producer = Producer::new(
                    format!("producer-{i}"),
                    self.queue.clone(),
                    self.catalog.clone(),
                    config.orders_per_producer,
                    self.stop.child(),
                )
                .with_delay(config.produce_delay());
                Tracked::spawn(producer.name().to_string(), move || producer.run())
            })
            .collect();

        // Separate branch so draining can stop consumers without touching producers.
        let consumer_stop = self.stop.child();
        let quota = config.consumer_quota();
        let mut consumers: Vec<Tracked<ConsumerReport>> = (1..=config.consumers)
            .map(|i| {
                let consumer = Consumer::new(
                    format!("consumer-{i}"),
                    self.queue.clone(),
                    quota,
                    consumer_stop.child(),
                )
                .with_delay(config.process_delay());
                Tracked::spawn(consumer.name().to_string(), move || consumer.run())
            })
            .collect();

        let deadline = Instant::now() + config.join_timeout();
        let mut finished = join_all(&mut producers, deadline).await;

        if finished && quota == ConsumerQuota::UntilStopped {
            self.drain(deadline).await;
            consumer_stop.stop();
            self.queue.interrupt_waiters();
        }
        finished &= join_all(&mut consumers, deadline).await;

        let forced_stop = !finished;
        if forced_stop {
            self.force_stop();
            let grace = Instant::now() + FORCED_STOP_GRACE;
            join_all(&mut producers, grace).await;
            join_all(&mut consumers, grace).await;
        }

        RunReport {
            producers: producers
                .into_iter()
                .map(|t| t.settle(ProducerReport::unfinished))
                .collect(),
            consumers: consumers
                .into_iter()
                .map(|t| t.settle(ConsumerReport::unfinished))
                .collect(),
            fulfillments: Vec::new(),
            remaining: self.queue.size(),
            forced_stop,
        }
    }

    async fn run_executor(self) -> Result<RunReport, WarehouseError> {
        let config = &self.config;
        info!(
            capacity = config.capacity,
            producers = config.producers,
            workers = config.consumers,
            orders = config.total_orders(),
            categories = self.catalog.len(),
            "Starting warehouse run with fulfillment pool"
        );

        let service = Arc::new(FulfillmentService::new(
            self.queue.clone(),
            config.consumers,
            config.process_delay(),
            Handle::current(),
            self.stop.child(),
        )?);

        let mut submitters: Vec<Tracked<BatchReport>> = (1..=config.producers)
            .map(|i| {
                let name = format!("submitter-{i}");
                let service = service.clone();
                let catalog = self.catalog.clone();
                let count = config.orders_per_producer;
                let delay = config.produce_delay();
                Tracked::spawn(name.clone(), move || {
                    service.submit_all(name, &catalog, count, delay)
                })
            })
            .collect();

        let deadline = Instant::now() + config.join_timeout();
        let forced_stop = !join_all(&mut submitters, deadline).await;
        if forced_stop {
            self.force_stop();
            service.shutdown();
            join_all(&mut submitters, Instant::now() + FORCED_STOP_GRACE).await;
        }

        let mut producers = Vec::with_capacity(submitters.len());
        let mut fulfillments = Vec::new();
        for batch in submitters
            .into_iter()
            .map(|t| t.settle(BatchReport::unfinished))
        {
            producers.push(batch.producer);
            fulfillments.extend(batch.fulfilled);
        }

        Ok(RunReport {
            producers,
            consumers: Vec::new(),
            fulfillments,
            remaining: self.queue.size(),
            forced_stop,
        })
    }

    /// Waits until consumers have emptied the queue or the deadline passes.
    async fn drain(&self, deadline: Instant) {
        while !self.queue.is_empty() && !self.stop.is_stopped() {
            if Instant::now() >= deadline {
                warn!(size = self.queue.size(), "Queue did not drain before join deadline");
                return;
            }
            time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    fn force_stop(&self) {
        warn!(
            grace_ms = FORCED_STOP_GRACE.as_millis() as u64,
            "Join deadline passed, forcing stop"
        );
        self.stop.stop();
        self.queue.interrupt_waiters();
    }
}

/// A blocking task plus whatever it has returned so far.
struct Tracked<R> {
    name: String,
    handle: JoinHandle<R>,
    result: Option<Result<R, JoinError>>,
}

impl<R: Send + 'static> Tracked<R> {
    fn spawn(name: String, task: impl FnOnce() -> R + Send + 'static) -> Self {
        Self {
            name,
            handle: tokio::task::spawn_blocking(task),
            result: None,
        }
    }

    async fn join_until(&mut self, deadline: Instant) -> bool {
        if self.result.is_none() {
            match time::timeout_at(deadline, &mut self.handle).await {
                Ok(result) => self.result = Some(result),
                Err(_) => warn!(task = %self.name, "Task still running at join deadline"),
            }
        }
        self.result.is_some()
    }

    fn settle(self, unfinished: impl FnOnce(String, TaskOutcome) -> R) -> R {
        match self.result {
            Some(Ok(report)) => report,
            Some(Err(e)) => {
                error!(task = %self.name, error = %e, "Task failed");
                unfinished(self.name, TaskOutcome::Failed(e.to_string()))
            }
            None => {
                error!(task = %self.name, "Task did not stop, abandoning it");
                unfinished(
                    self.name,
                    TaskOutcome::Failed("did not stop within the grace period".to_string()),
                )
            }
        }
    }
}

async fn join_all<R: Send + 'static>(tasks: &mut [Tracked<R>], deadline: Instant) -> bool {
    let mut finished = true;
    for task in tasks.iter_mut() {
        finished &= task.join_until(deadline).await;
    }
    finished
}
