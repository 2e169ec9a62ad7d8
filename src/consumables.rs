//! The consumers' read-only, single-pass view of the shared channel.

use std::sync::Arc;

use futures_core::Stream;

use crate::channel::Channel;
use crate::item::Item;
use crate::metrics;

/// A blocking, single-pass sequence of the items produced for consumption.
///
/// Each consumer task gets its own view over the same channel. Views
/// compete for items: every payload is handed to exactly one of them.
/// A view ends when it takes a terminator. From then on it is exhausted
/// and never touches the channel again, so it cannot swallow a second
/// terminator meant for another consumer.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use handoff::{Consumables, Consumer, Result};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Consumer for Printer {
///     type Item = String;
///
///     async fn consume(&mut self, mut consumables: Consumables<String>) -> Result<()> {
///         while let Some(line) = consumables.next().await {
///             println!("{}", line);
///         }
///         Ok(())
///     }
/// }
/// ```
pub struct Consumables<T> {
    channel: Arc<Channel<T>>,
    exhausted: bool,
}

impl<T: Send + 'static> Consumables<T> {
    pub(crate) fn new(channel: Arc<Channel<T>>) -> Self {
        Self {
            channel,
            exhausted: false,
        }
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once this view has seen its terminator, or if the run
    /// was cancelled while waiting. Cancellation is not an error here: the
    /// consumer just sees the end of the sequence.
    pub async fn next(&mut self) -> Option<T> {
        if self.exhausted {
            return None;
        }
        match self.channel.take().await.map(Item::into_payload) {
            Ok(Some(payload)) => {
                metrics::record_consumed();
                Some(payload)
            }
            Ok(None) => {
                tracing::trace!("terminator received");
                self.exhausted = true;
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "consumable view stopped early");
                self.exhausted = true;
                None
            }
        }
    }

    /// Whether this view has already reached its end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Adapt this view into a [`Stream`] of payloads.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send {
        futures::stream::unfold(self, |mut view| async move {
            let item = view.next().await?;
            Some((item, view))
        })
    }
}

impl<T> std::fmt::Debug for Consumables<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumables")
            .field("channel", &self.channel)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    async fn filled(items: Vec<u32>, terminators: usize) -> Arc<Channel<u32>> {
        let channel = Arc::new(Channel::new(64).unwrap());
        for item in items {
            channel.put(Item::Payload(item)).await.unwrap();
        }
        for _ in 0..terminators {
            channel.put(Item::Terminator).await.unwrap();
        }
        channel
    }

    #[tokio::test]
    async fn test_view_ends_at_terminator() {
        let channel = filled(vec![1, 2, 3], 1).await;
        let mut view = Consumables::new(Arc::clone(&channel));

        assert_eq!(view.next().await, Some(1));
        assert_eq!(view.next().await, Some(2));
        assert_eq!(view.next().await, Some(3));
        assert_eq!(view.next().await, None);
        assert!(view.is_exhausted());
    }

    #[tokio::test]
    async fn test_exhausted_view_leaves_other_terminators_alone() {
        let channel = filled(vec![], 2).await;
        let mut first = Consumables::new(Arc::clone(&channel));

        assert_eq!(first.next().await, None);
        assert_eq!(first.next().await, None);
        assert_eq!(channel.len(), 1);

        let mut second = Consumables::new(Arc::clone(&channel));
        assert_eq!(second.next().await, None);
        assert_eq!(channel.len(), 0);
    }

    #[tokio::test]
    async fn test_views_compete_for_items() {
        let channel = filled((0..10).collect(), 2).await;
        let mut a = Consumables::new(Arc::clone(&channel));
        let mut b = Consumables::new(Arc::clone(&channel));

        let mut seen = Vec::new();
        seen.push(a.next().await.unwrap());
        seen.push(b.next().await.unwrap());
        while let Some(item) = a.next().await {
            seen.push(item);
        }
        while let Some(item) = b.next().await {
            seen.push(item);
        }
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_cancellation_ends_iteration() {
        let channel = Arc::new(Channel::<u32>::new(4).unwrap());
        let mut view = Consumables::new(Arc::clone(&channel));
        channel.close();
        assert_eq!(view.next().await, None);
        assert!(view.is_exhausted());
    }

    #[tokio::test]
    async fn test_into_stream() {
        let channel = filled(vec![5, 6], 1).await;
        let stream = Consumables::new(channel).into_stream();
        let collected: Vec<u32> = stream.collect().await;
        assert_eq!(collected, vec![5, 6]);
    }
}
