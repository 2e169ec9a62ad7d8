//! Concrete consumer implementations.

use async_trait::async_trait;
use futures::FutureExt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::consumables::Consumables;
use crate::error::{Error, Result};
use crate::metrics;
use crate::traits::{Consumer, Operation};

/// A consumer that applies an [`Operation`] to every item it receives.
///
/// Failures of the operation, including panics, are logged and the item is
/// skipped; the consumer keeps draining. This is the worker behind the
/// parallel for-each.
pub struct OperationConsumer<O> {
    operation: Arc<O>,
    performed: usize,
    failed: usize,
}

impl<O: Operation> OperationConsumer<O> {
    /// Create a new operation consumer
    pub fn new(operation: O) -> Self {
        Self::shared(Arc::new(operation))
    }

    /// Create an operation consumer that shares `operation` with other workers
    pub fn shared(operation: Arc<O>) -> Self {
        Self {
            operation,
            performed: 0,
            failed: 0,
        }
    }

    /// Number of items the operation completed successfully
    pub fn performed(&self) -> usize {
        self.performed
    }

    /// Number of items on which the operation failed or panicked
    pub fn failed(&self) -> usize {
        self.failed
    }
}

#[async_trait]
impl<O: Operation> Consumer for OperationConsumer<O> {
    type Item = O::Item;

    async fn consume(&mut self, mut consumables: Consumables<Self::Item>) -> Result<()> {
        while let Some(item) = consumables.next().await {
            let outcome = AssertUnwindSafe(self.operation.perform(item))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::from_panic(panic)));
            match outcome {
                Ok(()) => self.performed += 1,
                Err(e) => {
                    self.failed += 1;
                    metrics::record_fault("operation");
                    tracing::warn!(error = %e, "operation failed, skipping item");
                }
            }
        }
        Ok(())
    }
}

/// A consumer that collects items into a vector
pub struct CollectConsumer<T> {
    items: Arc<TokioMutex<Vec<T>>>,
}

impl<T: Send + 'static + Clone> CollectConsumer<T> {
    /// Create a new collect consumer
    pub fn new() -> Self {
        Self {
            items: Arc::new(TokioMutex::new(Vec::new())),
        }
    }

    /// Get the collected items
    pub async fn into_items(self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Get a clone of the items Arc for external access
    pub fn items(&self) -> Arc<TokioMutex<Vec<T>>> {
        self.items.clone()
    }
}

#[async_trait]
impl<T: Send + 'static + Clone> Consumer for CollectConsumer<T> {
    type Item = T;

    async fn consume(&mut self, mut consumables: Consumables<Self::Item>) -> Result<()> {
        while let Some(item) = consumables.next().await {
            self.items.lock().await.push(item);
        }
        Ok(())
    }
}

impl<T: Send + 'static + Clone> Default for CollectConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CollectConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// A consumer that counts items
pub struct CountConsumer<T> {
    count: Arc<TokioMutex<usize>>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> CountConsumer<T> {
    /// Create a new count consumer
    pub fn new() -> Self {
        Self {
            count: Arc::new(TokioMutex::new(0)),
            _phantom: PhantomData,
        }
    }

    /// Get the current count
    pub async fn count(&self) -> usize {
        *self.count.lock().await
    }
}

#[async_trait]
impl<T: Send + 'static> Consumer for CountConsumer<T> {
    type Item = T;

    async fn consume(&mut self, mut consumables: Consumables<Self::Item>) -> Result<()> {
        while consumables.next().await.is_some() {
            *self.count.lock().await += 1;
        }
        Ok(())
    }
}

impl<T> Default for CountConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CountConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            count: self.count.clone(),
            _phantom: PhantomData,
        }
    }
}
