//! Fan-out of newly discovered events to subscribers

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{trace, warn};

use crate::domain::Event;

/// Broadcasts events to every subscriber registered at the time of publishing.
///
/// Each subscriber owns a ring of `capacity` events. A subscriber that falls
/// further behind than that skips its oldest undelivered events; the publisher
/// itself never blocks and never buffers for absent subscribers. Late
/// subscribers see nothing that was published before they joined.
///
/// Cloning yields another handle onto the same set of subscribers.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<Event>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe() }
    }

    /// Deliver `event` to the current subscribers, returning how many were reached
    pub fn publish(&self, event: Event) -> usize {
        let event_id = event.id.clone();
        match self.sender.send(event) {
            Ok(delivered) => {
                trace!(event_id = %event_id, delivered, "Event published");
                delivered
            },
            Err(_) => {
                trace!(event_id = %event_id, "Event published with no subscribers");
                0
            },
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of a subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait for the next event; `None` once every publisher handle is gone
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber fell behind, oldest events skipped");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber fell behind, oldest events skipped");
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every event delivered so far
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EventId;

    #[test]
    fn delivers_to_every_subscriber_in_order() {
        let publisher = EventPublisher::new(16);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        assert_eq!(publisher.publish(Event::new(1u64)), 2);
        assert_eq!(publisher.publish(Event::new(2u64)), 2);

        for subscription in [&mut first, &mut second] {
            let ids: Vec<_> = subscription.drain().into_iter().map(|e| e.id).collect();
            assert_eq!(ids, vec![EventId::from(1u64), EventId::from(2u64)]);
        }
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let publisher = EventPublisher::new(4);
        assert_eq!(publisher.publish(Event::new(1u64)), 0);
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let publisher = EventPublisher::new(4);
        let _early = publisher.subscribe();
        publisher.publish(Event::new(1u64));

        let mut late = publisher.subscribe();
        assert!(late.try_recv().is_none());

        publisher.publish(Event::new(2u64));
        assert_eq!(late.try_recv().map(|e| e.id), Some(2u64.into()));
    }

    #[test]
    fn slow_subscriber_skips_oldest() {
        let publisher = EventPublisher::new(2);
        let mut slow = publisher.subscribe();
        for id in 1..=5u64 {
            publisher.publish(Event::new(id));
        }

        let ids: Vec<_> = slow.drain().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EventId::from(4u64), EventId::from(5u64)]);
    }

    #[test]
    fn dropped_subscription_is_forgotten() {
        let publisher = EventPublisher::new(4);
        let subscription = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_ends_when_publisher_dropped() {
        let publisher = EventPublisher::new(4);
        let mut subscription = publisher.subscribe();
        publisher.publish(Event::new(1u64));
        drop(publisher);

        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_none());
    }
}
