use uf_common::{Producer, ProducerDownReason};

/// Receives producer status transitions and connection-level events.
///
/// Callbacks are invoked synchronously from inside the per-producer state
/// machine so that notifications observe transition order. Implementations
/// must return quickly and must not call back into the feed.
pub trait FeedStatusListener: Send + Sync {
    fn on_producer_down(&self, producer: &Producer, reason: ProducerDownReason);

    fn on_producer_up(&self, producer: &Producer);

    /// The broker connection was lost. Producer-level down callbacks follow
    /// separately with [`ProducerDownReason::ConnectionDown`].
    fn on_disconnected(&self);
}
