//! Helpers for building producers, consumers and operations from closures.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

use crate::consumables::Consumables;
use crate::error::Result;
use crate::production::Production;
use crate::traits::{Consumer, Operation, Producer};

/// Helper function to create a producer from a function
///
/// ```rust
/// use handoff::util::producer_from_fn;
/// use handoff::Production;
///
/// let producer = producer_from_fn(|production: Production<u32>| async move {
///     for n in 0..3 {
///         production.put(n).await?;
///     }
///     Ok::<_, handoff::Error>(())
/// });
/// # let _ = producer;
/// ```
pub fn producer_from_fn<F, Fut, T>(f: F) -> FnProducer<F, Fut, T>
where
    F: FnMut(Production<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    FnProducer {
        f,
        _phantom: PhantomData,
    }
}

/// A producer created from a function
pub struct FnProducer<F, Fut, T> {
    pub f: F,
    _phantom: PhantomData<fn(Production<T>) -> Fut>,
}

#[async_trait]
impl<F, Fut, T> Producer for FnProducer<F, Fut, T>
where
    F: FnMut(Production<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn produce(&mut self, production: Production<T>) -> Result<()> {
        (self.f)(production).await
    }
}

/// Helper function to create a consumer from a function
pub fn consumer_from_fn<F, Fut, T>(f: F) -> FnConsumer<F, Fut, T>
where
    F: FnMut(Consumables<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    FnConsumer {
        f,
        _phantom: PhantomData,
    }
}

/// A consumer created from a function
pub struct FnConsumer<F, Fut, T> {
    pub f: F,
    _phantom: PhantomData<fn(Consumables<T>) -> Fut>,
}

#[async_trait]
impl<F, Fut, T> Consumer for FnConsumer<F, Fut, T>
where
    F: FnMut(Consumables<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn consume(&mut self, consumables: Consumables<T>) -> Result<()> {
        (self.f)(consumables).await
    }
}

/// Helper function to create an operation from a function
pub fn operation_from_fn<F, Fut, T>(f: F) -> FnOperation<F, Fut, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    FnOperation {
        f,
        _phantom: PhantomData,
    }
}

/// An operation created from a function
pub struct FnOperation<F, Fut, T> {
    pub f: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

#[async_trait]
impl<F, Fut, T> Operation for FnOperation<F, Fut, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn perform(&self, item: T) -> Result<()> {
        (self.f)(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProducerConsumer;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fn_adapters_run_through_the_engine() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_ref = Arc::clone(&seen);

        ProducerConsumer::builder()
            .add_producer(producer_from_fn(|production: Production<usize>| async move {
                for n in 1..=4 {
                    production.put(n).await?;
                }
                Ok::<_, Error>(())
            }))
            .add_consumer(consumer_from_fn(move |mut consumables: Consumables<usize>| {
                let seen = Arc::clone(&seen_ref);
                async move {
                    while let Some(n) = consumables.next().await {
                        seen.fetch_add(n, Ordering::SeqCst);
                    }
                    Ok::<_, Error>(())
                }
            }))
            .build()
            .unwrap()
            .begin()
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_operation_from_fn() {
        let hits = Arc::new(AtomicUsize::new(0));
        let op = {
            let hits = Arc::clone(&hits);
            operation_from_fn(move |n: usize| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(n, Ordering::SeqCst);
                    Ok::<_, Error>(())
                }
            })
        };

        op.perform(2).await.unwrap();
        op.perform(3).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}
