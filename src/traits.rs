//! Capability traits for the producer/consumer engine.
//!
//! A producer writes into a [`Production`] handle, a consumer drains a
//! [`Consumables`] view, and an operation is the per-item work that the
//! parallel for-each fans out. Each has one required method.

use std::sync::Arc;

use async_trait::async_trait;

use crate::consumables::Consumables;
use crate::error::Result;
use crate::production::Production;

/// A producer emits items into the shared work queue.
///
/// The engine calls [`produce`](Producer::produce) exactly once, on its own
/// task. When it returns (successfully or not) the producer counts as
/// finished. An `Err` or a panic is logged and otherwise ignored.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use handoff::{Producer, Production, Result};
///
/// struct CounterProducer {
///     max: u64,
/// }
///
/// #[async_trait]
/// impl Producer for CounterProducer {
///     type Item = u64;
///
///     async fn produce(&mut self, production: Production<u64>) -> Result<()> {
///         for n in 0..self.max {
///             production.put(n).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Producer: Send {
    /// The type of items this producer emits
    type Item: Send + 'static;

    /// Emit items into `production` until there is nothing left to emit.
    ///
    /// `put` only fails when the run has been cancelled, so returning its
    /// error with `?` is the expected way to stop early.
    async fn produce(&mut self, production: Production<Self::Item>) -> Result<()>;
}

/// A consumer drains items from the shared work queue.
///
/// The engine calls [`consume`](Consumer::consume) exactly once, on its own
/// task, with a view that ends when this consumer's terminator arrives.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use handoff::{Consumables, Consumer, Result};
///
/// struct SumConsumer {
///     total: u64,
/// }
///
/// #[async_trait]
/// impl Consumer for SumConsumer {
///     type Item = u64;
///
///     async fn consume(&mut self, mut consumables: Consumables<u64>) -> Result<()> {
///         while let Some(n) = consumables.next().await {
///             self.total += n;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Consumer: Send {
    /// The type of items this consumer accepts
    type Item: Send + 'static;

    /// Drain `consumables` until it ends.
    async fn consume(&mut self, consumables: Consumables<Self::Item>) -> Result<()>;
}

/// A unit of work applied to one item by the parallel for-each.
///
/// The same operation is shared by every worker, hence `&self`. Errors and
/// panics are logged and the item is skipped; they never abort the rest
/// of the traversal.
#[async_trait]
pub trait Operation: Send + Sync {
    /// The type of items this operation accepts
    type Item: Send + 'static;

    /// Perform the operation on a single item.
    async fn perform(&self, item: Self::Item) -> Result<()>;
}

#[async_trait]
impl<P: Producer + ?Sized> Producer for Box<P> {
    type Item = P::Item;

    async fn produce(&mut self, production: Production<Self::Item>) -> Result<()> {
        (**self).produce(production).await
    }
}

#[async_trait]
impl<C: Consumer + ?Sized> Consumer for Box<C> {
    type Item = C::Item;

    async fn consume(&mut self, consumables: Consumables<Self::Item>) -> Result<()> {
        (**self).consume(consumables).await
    }
}

#[async_trait]
impl<O: Operation + ?Sized> Operation for Arc<O> {
    type Item = O::Item;

    async fn perform(&self, item: Self::Item) -> Result<()> {
        (**self).perform(item).await
    }
}
