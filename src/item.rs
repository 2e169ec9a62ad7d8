//! The unit of traffic on the shared channel.

/// One slot's worth of channel traffic: a producer's payload, or the
/// end-of-stream marker the engine sends once per consumer.
///
/// The terminator is its own variant, so no payload value (including
/// `None` for an `Option` payload) can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item<T> {
    Payload(T),
    Terminator,
}

impl<T> Item<T> {
    /// Unwrap the payload, or `None` for the terminator.
    pub(crate) fn into_payload(self) -> Option<T> {
        match self {
            Item::Payload(payload) => Some(payload),
            Item::Terminator => None,
        }
    }
}
