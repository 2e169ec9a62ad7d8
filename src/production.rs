//! The producers' write-only view of the shared channel.

use std::sync::Arc;

use crate::channel::Channel;
use crate::error::Result;
use crate::item::Item;
use crate::metrics;

/// A write-only handle onto the engine's work queue.
///
/// Every producer task receives its own clone; all clones feed the same
/// channel. There is deliberately no way to read from it, so a producer
/// can never consume its own output.
pub struct Production<T> {
    channel: Arc<Channel<T>>,
}

impl<T: Send + 'static> Production<T> {
    pub(crate) fn new(channel: Arc<Channel<T>>) -> Self {
        Self { channel }
    }

    /// Place an item on the work queue for some consumer to pick up.
    ///
    /// Waits while the buffer is at capacity. Returns
    /// [`Error::Cancelled`](crate::Error::Cancelled) if the run is cancelled
    /// while waiting; producers should simply propagate it with `?`.
    pub async fn put(&self, payload: T) -> Result<()> {
        self.channel.put(Item::Payload(payload)).await?;
        tracing::trace!("payload enqueued");
        metrics::record_produced();
        Ok(())
    }

    /// Whether the run this handle belongs to has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Production<T> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<T> std::fmt::Debug for Production<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Production")
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_put_wraps_payloads() {
        let channel = Arc::new(Channel::new(4).unwrap());
        let production = Production::new(Arc::clone(&channel));

        production.put("a").await.unwrap();
        production.clone().put("b").await.unwrap();

        assert_eq!(channel.take().await.unwrap(), Item::Payload("a"));
        assert_eq!(channel.take().await.unwrap(), Item::Payload("b"));
    }

    #[tokio::test]
    async fn test_put_after_cancel() {
        let channel = Arc::new(Channel::new(4).unwrap());
        let production = Production::new(Arc::clone(&channel));
        channel.close();

        assert!(production.is_cancelled());
        assert!(matches!(production.put(1u32).await, Err(Error::Cancelled)));
    }
}
