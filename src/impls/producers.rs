//! Concrete producer implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::production::Production;
use crate::traits::Producer;

/// A producer that emits every element of an iterator, in order.
///
/// This is the producer behind the parallel for-each. The iterator is
/// consumed by the first call to `produce`; later calls emit nothing.
pub struct IterProducer<I> {
    items: Option<I>,
}

impl<I> IterProducer<I>
where
    I: Iterator,
{
    /// Create a new iterator producer
    pub fn new<C>(items: C) -> Self
    where
        C: IntoIterator<IntoIter = I>,
    {
        Self {
            items: Some(items.into_iter()),
        }
    }
}

#[async_trait]
impl<I> Producer for IterProducer<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    async fn produce(&mut self, production: Production<Self::Item>) -> Result<()> {
        let Some(items) = self.items.take() else {
            return Ok(());
        };
        let mut emitted = 0usize;
        for item in items {
            production.put(item).await?;
            emitted += 1;
        }
        tracing::debug!(emitted, "iterator producer exhausted");
        Ok(())
    }
}

/// A producer that emits the same value a fixed number of times
pub struct RepeatProducer<T> {
    value: T,
    times: usize,
}

impl<T: Clone> RepeatProducer<T> {
    /// Create a producer that emits `value` `times` times
    pub fn times(value: T, times: usize) -> Self {
        Self { value, times }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Producer for RepeatProducer<T> {
    type Item = T;

    async fn produce(&mut self, production: Production<Self::Item>) -> Result<()> {
        while self.times > 0 {
            production.put(self.value.clone()).await?;
            self.times -= 1;
        }
        Ok(())
    }
}
