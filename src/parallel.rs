//! A parallel for-each built on the producer/consumer engine.
//!
//! One producer walks the collection; `min(workers, len)` consumers each
//! apply the operation to whatever items they win from the shared buffer.
//! Slow workers simply end up with fewer items.

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::channel::UNBOUNDED;
use crate::engine::ProducerConsumer;
use crate::error::{Error, Result};
use crate::impls::{IterProducer, OperationConsumer};
use crate::traits::Operation;

/// The host's available parallelism, or 1 if it cannot be determined.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Configuration for a parallel for-each
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParallelConfig {
    /// Requested number of workers; capped at the collection size, and 0 means 1
    pub workers: usize,
    /// Maximum number of items buffered ahead of the workers
    pub buffer_capacity: usize,
    /// Cancels the traversal when fired
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel: Option<CancellationToken>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: available_parallelism(),
            buffer_capacity: UNBOUNDED,
            cancel: None,
        }
    }
}

impl ParallelConfig {
    /// Set the requested number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Cancel the traversal when `token` is cancelled
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of consumers to start for a collection of `len` items
    pub fn effective_workers(&self, len: usize) -> usize {
        self.workers.max(1).min(len)
    }
}

/// Apply `operation` to every element, using the host's available parallelism.
///
/// # Examples
///
/// ```rust
/// use handoff::parallel;
/// use handoff::util::operation_from_fn;
///
/// #[tokio::main]
/// async fn main() -> handoff::Result<()> {
///     let op = operation_from_fn(|n: u64| async move {
///         assert!(n < 100);
///         Ok::<_, handoff::Error>(())
///     });
///     parallel::for_each((0..100u64).collect::<Vec<_>>(), op).await
/// }
/// ```
pub async fn for_each<I, O>(elements: I, operation: O) -> Result<()>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator + Send + 'static,
    I::Item: Send + 'static,
    O: Operation<Item = I::Item> + 'static,
{
    for_each_with_config(elements, operation, &ParallelConfig::default()).await
}

/// Apply `operation` to every element using at most `workers` workers.
pub async fn for_each_with<I, O>(elements: I, operation: O, workers: usize) -> Result<()>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator + Send + 'static,
    I::Item: Send + 'static,
    O: Operation<Item = I::Item> + 'static,
{
    let config = ParallelConfig::default().workers(workers);
    for_each_with_config(elements, operation, &config).await
}

/// Apply `operation` to every element as configured by `config`.
///
/// Every element is handed to exactly one application of the operation.
/// Failures and panics of the operation are logged and skipped. An empty
/// collection returns immediately without starting any task. The only
/// error returned is [`Error::Cancelled`] (or [`Error::InvalidCapacity`]
/// for a zero buffer capacity).
pub async fn for_each_with_config<I, O>(
    elements: I,
    operation: O,
    config: &ParallelConfig,
) -> Result<()>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator + Send + 'static,
    I::Item: Send + 'static,
    O: Operation<Item = I::Item> + 'static,
{
    let elements = elements.into_iter();
    let len = elements.len();
    if len == 0 {
        return Ok(());
    }

    let workers = config.effective_workers(len);
    let operation = Arc::new(operation);
    tracing::debug!(len, workers, "starting parallel for-each");

    let mut builder = ProducerConsumer::builder()
        .add_producer(IterProducer::new(elements))
        .add_consumers((0..workers).map(|_| OperationConsumer::shared(Arc::clone(&operation))))
        .buffer_capacity(config.buffer_capacity);
    if let Some(token) = &config.cancel {
        builder = builder.cancellation_token(token.clone());
    }

    builder.build()?.begin().await?;
    Ok(())
}

/// Blocking form of [`for_each_with`].
///
/// Runs on a dedicated runtime with one thread per worker, which is torn
/// down before this returns. Must not be called from within an async
/// context.
pub fn for_each_blocking<I, O>(elements: I, operation: O, workers: usize) -> Result<()>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator + Send + 'static,
    I::Item: Send + 'static,
    O: Operation<Item = I::Item> + 'static,
{
    let elements = elements.into_iter();
    if elements.len() == 0 {
        return Ok(());
    }
    let config = ParallelConfig::default().workers(workers);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.effective_workers(elements.len()))
        .thread_name("handoff-parallel")
        .enable_all()
        .build()
        .map_err(|e| Error::custom(format!("failed to start worker pool: {}", e)))?;
    let result = runtime.block_on(for_each_with_config(elements, operation, &config));
    runtime.shutdown_background();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::operation_from_fn;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn tally() -> (
        Arc<Mutex<HashMap<u32, usize>>>,
        impl Operation<Item = u32> + 'static,
    ) {
        let counts = Arc::new(Mutex::new(HashMap::new()));
        let op = {
            let counts = Arc::clone(&counts);
            operation_from_fn(move |n: u32| {
                let counts = Arc::clone(&counts);
                async move {
                    *counts.lock().unwrap().entry(n).or_insert(0) += 1;
                    Ok::<_, Error>(())
                }
            })
        };
        (counts, op)
    }

    fn assert_each_once(counts: &Mutex<HashMap<u32, usize>>, len: u32) {
        let counts = counts.lock().unwrap();
        assert_eq!(counts.len(), len as usize);
        for n in 0..len {
            assert_eq!(counts.get(&n), Some(&1), "element {} not visited once", n);
        }
    }

    #[test]
    fn test_effective_workers() {
        let config = ParallelConfig::default().workers(8);
        assert_eq!(config.effective_workers(3), 3);
        assert_eq!(config.effective_workers(100), 8);
        assert_eq!(ParallelConfig::default().workers(0).effective_workers(5), 1);
    }

    #[test]
    fn test_default_workers_match_host() {
        assert_eq!(ParallelConfig::default().workers, available_parallelism());
        assert!(available_parallelism() >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_element_once_for_any_worker_count() {
        const LEN: u32 = 500;
        for workers in [1, 4, LEN as usize, LEN as usize * 2] {
            let (counts, op) = tally();
            for_each_with((0..LEN).collect::<Vec<_>>(), op, workers)
                .await
                .unwrap();
            assert_each_once(&counts, LEN);
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let op = {
            let calls = Arc::clone(&calls);
            operation_from_fn(move |_: u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>(()) }
            })
        };
        for_each(Vec::<u32>::new(), op).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_element_is_visited() {
        let (counts, op) = tally();
        for_each_with(vec![0u32], op, 16).await.unwrap();
        assert_each_once(&counts, 1);
    }

    #[tokio::test]
    async fn test_failing_operation_does_not_abort_traversal() {
        let visited = Arc::new(AtomicUsize::new(0));
        let op = {
            let visited = Arc::clone(&visited);
            operation_from_fn(move |n: u32| {
                let visited = Arc::clone(&visited);
                async move {
                    visited.fetch_add(1, Ordering::SeqCst);
                    if n % 10 == 0 {
                        return Err(Error::custom("multiple of ten"));
                    }
                    if n % 10 == 5 {
                        panic!("ends in five");
                    }
                    Ok(())
                }
            })
        };
        for_each_with((0..100u32).collect::<Vec<_>>(), op, 4)
            .await
            .unwrap();
        assert_eq!(visited.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_rejected() {
        let (_, op) = tally();
        let config = ParallelConfig::default().buffer_capacity(0);
        let err = for_each_with_config(vec![1u32], op, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCapacity));
    }

    #[test]
    fn test_for_each_blocking() {
        let (counts, op) = tally();
        for_each_blocking((0..200u32).collect::<Vec<_>>(), op, 3).unwrap();
        assert_each_once(&counts, 200);
    }
}
