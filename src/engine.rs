//! The producer/consumer engine and its builder.
//!
//! A run has two phases. In the produce phase every consumer and every
//! producer is spawned onto the engine's own task sets, and the engine waits
//! for the producer set to empty. In the drain phase it puts one terminator
//! on the channel per consumer while it waits for the consumer set to empty.
//! A task that fails or panics is logged and tallied as a fault, so one bad
//! task never stalls the rest of the run.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::channel::{Channel, UNBOUNDED};
use crate::consumables::Consumables;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::metrics;
use crate::production::Production;
use crate::traits::{Consumer, Producer};

type BoxedProducer<T> = Box<dyn Producer<Item = T>>;
type BoxedConsumer<T> = Box<dyn Consumer<Item = T>>;

/// Configuration for an engine run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Maximum number of items buffered between producers and consumers
    pub buffer_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: UNBOUNDED,
        }
    }
}

/// What happened to the tasks of a finished run.
///
/// Faults never turn into an `Err` from [`ProducerConsumer::begin`]; they
/// are logged and tallied here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Number of producer tasks that ran
    pub producers: usize,
    /// Number of consumer tasks that ran
    pub consumers: usize,
    /// Producers that returned an error or panicked
    pub producer_faults: usize,
    /// Consumers that returned an error or panicked
    pub consumer_faults: usize,
    /// Producers that stopped with [`Error::Cancelled`]
    pub producers_cancelled: usize,
    /// Consumers that stopped with [`Error::Cancelled`]
    pub consumers_cancelled: usize,
}

impl RunReport {
    /// Whether every task finished without a fault
    pub fn is_clean(&self) -> bool {
        self.producer_faults == 0 && self.consumer_faults == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Producer,
    Consumer,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Finished,
    Cancelled,
    Faulted,
}

#[derive(Debug, Default)]
struct Tally {
    faults: usize,
    cancelled: usize,
}

/// Runs any number of producers and consumers over one bounded buffer.
///
/// Built once with [`ProducerConsumer::builder`], run once with
/// [`begin`](ProducerConsumer::begin).
///
/// # Examples
///
/// ```rust
/// use handoff::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let counter = CountConsumer::new();
///     let counter_ref = counter.clone();
///
///     ProducerConsumer::builder()
///         .add_producer(IterProducer::new(0..100))
///         .add_consumer(counter)
///         .buffer_capacity(10)
///         .build()?
///         .begin()
///         .await?;
///
///     assert_eq!(counter_ref.count().await, 100);
///     Ok(())
/// }
/// ```
pub struct ProducerConsumer<T> {
    channel: Arc<Channel<T>>,
    producers: Vec<BoxedProducer<T>>,
    consumers: Vec<BoxedConsumer<T>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> ProducerConsumer<T> {
    /// Create a new builder
    pub fn builder() -> Builder<T> {
        Builder::new()
    }

    /// Number of configured producers
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Number of configured consumers
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Capacity of the shared buffer
    pub fn buffer_capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Run every producer and consumer to completion.
    ///
    /// Returns once all producers have finished and every consumer has
    /// drained up to its terminator. Returns [`Error::Cancelled`] if the
    /// cancellation token fires first; every task is then aborted before
    /// this returns. Dropping the returned future aborts them as well.
    ///
    /// With a bounded buffer and no consumers this never returns once the
    /// buffer fills.
    pub async fn begin(self) -> Result<RunReport> {
        let ProducerConsumer {
            channel,
            producers,
            consumers,
            cancel,
        } = self;

        let mut report = RunReport {
            producers: producers.len(),
            consumers: consumers.len(),
            ..RunReport::default()
        };
        tracing::debug!(
            producers = report.producers,
            consumers = report.consumers,
            capacity = channel.capacity(),
            "starting run"
        );

        let mut consumer_tasks = JoinSet::new();
        for (index, mut consumer) in consumers.into_iter().enumerate() {
            let view = Consumables::new(Arc::clone(&channel));
            consumer_tasks.spawn(contain(Role::Consumer, index, async move {
                consumer.consume(view).await
            }));
        }

        let mut producer_tasks = JoinSet::new();
        for (index, mut producer) in producers.into_iter().enumerate() {
            let production = Production::new(Arc::clone(&channel));
            producer_tasks.spawn(contain(Role::Producer, index, async move {
                producer.produce(production).await
            }));
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = drive(&channel, &mut producer_tasks, &mut consumer_tasks, &mut report) => result,
        };

        if let Err(e) = outcome {
            tracing::debug!(error = %e, "run stopped early, tearing down tasks");
            channel.close();
            producer_tasks.shutdown().await;
            consumer_tasks.shutdown().await;
            return Err(e);
        }

        metrics::record_run();
        tracing::debug!(
            producer_faults = report.producer_faults,
            consumer_faults = report.consumer_faults,
            producers_cancelled = report.producers_cancelled,
            consumers_cancelled = report.consumers_cancelled,
            leftover = channel.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Run to completion on a dedicated multi-threaded runtime.
    ///
    /// The runtime is the run's worker pool: it is created with
    /// `worker_threads` threads and shut down before this returns. Must not
    /// be called from within an async context.
    pub fn begin_blocking(self, worker_threads: usize) -> Result<RunReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("handoff-worker")
            .enable_all()
            .build()
            .map_err(|e| Error::custom(format!("failed to start worker pool: {}", e)))?;
        let result = runtime.block_on(self.begin());
        runtime.shutdown_background();
        result
    }
}

impl<T> std::fmt::Debug for ProducerConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerConsumer")
            .field("producers", &self.producers.len())
            .field("consumers", &self.consumers.len())
            .field("channel", &self.channel)
            .finish()
    }
}

/// Both phases of a run, minus cancellation.
///
/// Terminators are sent while the consumer set is being joined. A consumer
/// that quit early never takes its terminator, and with a bounded buffer the
/// surplus could otherwise fill every slot and block the drain forever. Once
/// the last consumer is gone any unsent terminators are dropped.
async fn drive<T: Send + 'static>(
    channel: &Channel<T>,
    producer_tasks: &mut JoinSet<TaskOutcome>,
    consumer_tasks: &mut JoinSet<TaskOutcome>,
    report: &mut RunReport,
) -> Result<()> {
    let producers = join_all(producer_tasks, Role::Producer).await;
    report.producer_faults = producers.faults;
    report.producers_cancelled = producers.cancelled;

    tracing::debug!(
        terminators = report.consumers,
        "producers finished, draining"
    );
    let terminators = report.consumers;
    let send_terminators = async move {
        for _ in 0..terminators {
            channel.put(Item::Terminator).await?;
        }
        Ok::<_, Error>(())
    };
    let consumers_done = join_all(consumer_tasks, Role::Consumer);
    tokio::pin!(send_terminators, consumers_done);

    let mut sent = false;
    let consumers = loop {
        tokio::select! {
            tally = &mut consumers_done => break tally,
            result = &mut send_terminators, if !sent => {
                result?;
                sent = true;
            }
        }
    };
    if !sent {
        tracing::debug!("consumers finished before every terminator was sent");
    }

    report.consumer_faults = consumers.faults;
    report.consumers_cancelled = consumers.cancelled;
    Ok(())
}

/// Wait for every task in `tasks`, tallying faults and cancellations.
async fn join_all(tasks: &mut JoinSet<TaskOutcome>, role: Role) -> Tally {
    let mut tally = Tally::default();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(Error::from).unwrap_or_else(|e| {
            if e.is_cancelled() {
                tracing::debug!(role = role.as_str(), "task aborted");
                TaskOutcome::Cancelled
            } else {
                tracing::error!(role = role.as_str(), error = %e, "task did not run to completion");
                TaskOutcome::Faulted
            }
        });
        match outcome {
            TaskOutcome::Finished => {}
            TaskOutcome::Cancelled => tally.cancelled += 1,
            TaskOutcome::Faulted => tally.faults += 1,
        }
    }
    tally
}

/// Run one task body, turning errors and panics into a logged fault.
///
/// A task stopping with [`Error::Cancelled`] is tallied as cancelled, not
/// as a fault.
async fn contain<F>(role: Role, index: usize, body: F) -> TaskOutcome
where
    F: Future<Output = Result<()>> + Send,
{
    let result = AssertUnwindSafe(body)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(Error::from_panic(panic)));
    match result {
        Ok(()) => {
            tracing::trace!(role = role.as_str(), index, "task finished");
            TaskOutcome::Finished
        }
        Err(e) if e.is_cancelled() => {
            tracing::debug!(role = role.as_str(), index, "task cancelled");
            TaskOutcome::Cancelled
        }
        Err(e) => {
            metrics::record_fault(role.as_str());
            tracing::error!(role = role.as_str(), index, error = %e, "task failed");
            TaskOutcome::Faulted
        }
    }
}

/// Builder for [`ProducerConsumer`]
pub struct Builder<T> {
    producers: Vec<BoxedProducer<T>>,
    consumers: Vec<BoxedConsumer<T>>,
    config: EngineConfig,
    cancel: Option<CancellationToken>,
}

impl<T: Send + 'static> Builder<T> {
    /// Create a new builder with an unbounded buffer
    pub fn new() -> Self {
        Self {
            producers: Vec::new(),
            consumers: Vec::new(),
            config: EngineConfig::default(),
            cancel: None,
        }
    }

    /// Add a producer
    pub fn add_producer<P>(mut self, producer: P) -> Self
    where
        P: Producer<Item = T> + 'static,
    {
        self.producers.push(Box::new(producer));
        self
    }

    /// Add several producers
    pub fn add_producers<I, P>(mut self, producers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Producer<Item = T> + 'static,
    {
        for producer in producers {
            self = self.add_producer(producer);
        }
        self
    }

    /// Add a consumer
    pub fn add_consumer<C>(mut self, consumer: C) -> Self
    where
        C: Consumer<Item = T> + 'static,
    {
        self.consumers.push(Box::new(consumer));
        self
    }

    /// Add several consumers
    pub fn add_consumers<I, C>(mut self, consumers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Consumer<Item = T> + 'static,
    {
        for consumer in consumers {
            self = self.add_consumer(consumer);
        }
        self
    }

    /// Set the maximum number of buffered items. Defaults to [`UNBOUNDED`].
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Replace the whole run configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancel the run when `token` is cancelled
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Freeze the configuration into an engine.
    ///
    /// Fails with [`Error::InvalidCapacity`] if the buffer capacity is zero.
    pub fn build(self) -> Result<ProducerConsumer<T>> {
        let channel = Channel::new(self.config.buffer_capacity)?;
        Ok(ProducerConsumer {
            channel: Arc::new(channel),
            producers: self.producers,
            consumers: self.consumers,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl<T: Send + 'static> Default for Builder<T> {
    fn default() -> Self {
        Self::new()
    }
}
