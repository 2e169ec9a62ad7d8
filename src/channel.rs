//! The bounded, multi-producer multi-consumer buffer shared by every task.
//!
//! Two counting semaphores guard a `VecDeque`: `slots` counts free capacity
//! and `items` counts buffered items. A `put` waits for a slot, a `take`
//! waits for an item. Both waits are cancellation-safe, since a permit is
//! only forgotten once it has been acquired and the queue is then touched
//! without any further suspension.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::item::Item;

/// Capacity used when the caller does not bound the buffer.
pub const UNBOUNDED: usize = Semaphore::MAX_PERMITS;

pub(crate) struct Channel<T> {
    queue: Mutex<VecDeque<Item<T>>>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
}

impl<T> Channel<T> {
    /// Create a channel holding at most `capacity` items.
    ///
    /// Capacities above [`UNBOUNDED`] are clamped to it.
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        let capacity = capacity.min(UNBOUNDED);
        Ok(Self {
            queue: Mutex::new(VecDeque::new()),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
        })
    }

    /// Enqueue an item, waiting while the buffer is full.
    ///
    /// Returns [`Error::Cancelled`] if the channel is closed while waiting.
    pub(crate) async fn put(&self, item: Item<T>) -> Result<()> {
        self.slots.acquire().await?.forget();
        self.lock().push_back(item);
        self.items.add_permits(1);
        Ok(())
    }

    /// Dequeue the oldest item, waiting while the buffer is empty.
    ///
    /// Returns [`Error::Cancelled`] if the channel is closed while waiting.
    pub(crate) async fn take(&self) -> Result<Item<T>> {
        self.items.acquire().await?.forget();
        let item = self.lock().pop_front();
        self.slots.add_permits(1);
        item.ok_or_else(|| Error::custom("item permit acquired on an empty queue"))
    }

    /// Wake every waiter with a cancellation and refuse further traffic.
    pub(crate) fn close(&self) {
        self.slots.close();
        self.items.close();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Item<T>>> {
        // The queue is only ever pushed to or popped from while locked, so
        // a poisoned guard still holds a consistent deque.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
