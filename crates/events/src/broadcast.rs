//! Lossy broadcast channel for update events.

use tokio::sync::broadcast;

use crate::update::UpdateEvent;

/// Default buffer per subscriber before the slowest one starts losing
/// events. Polling covers anything dropped here.
const DEFAULT_CAPACITY: usize = 256;

/// Shared fan-out handle. Cheap to clone; all clones publish into the same
/// channel.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<UpdateEvent>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all currently-connected subscribers.
    ///
    /// Fire-and-forget: a send with zero subscribers is not an error, and
    /// broadcast failures never affect ticket state.
    pub fn publish(&self, event: UpdateEvent) {
        match self.tx.send(event) {
            Ok(n) => tracing::trace!(subscribers = n, "update event published"),
            Err(_) => tracing::trace!("update event dropped (no subscribers)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateKind;
    use triagedesk_core::TicketId;

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = Broadcaster::new();
        bus.publish(UpdateEvent::new(TicketId::new(), UpdateKind::Created));
    }

    #[tokio::test]
    async fn all_subscribers_receive_each_event() {
        let bus = Broadcaster::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let ev = UpdateEvent::new(TicketId::new(), UpdateKind::Updated);
        bus.publish(ev.clone());

        assert_eq!(a.recv().await.unwrap(), ev);
        assert_eq!(b.recv().await.unwrap(), ev);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = Broadcaster::new();
        bus.publish(UpdateEvent::new(TicketId::new(), UpdateKind::Created));

        let mut late = bus.subscribe();
        let ev = UpdateEvent::new(TicketId::new(), UpdateKind::Processed);
        bus.publish(ev.clone());

        // Only the event published after subscribing arrives.
        assert_eq!(late.recv().await.unwrap(), ev);
        assert!(matches!(
            late.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
