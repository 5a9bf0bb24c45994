//! Process-local bus backing the client cache and the service tests.

use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned by a panicking publisher.
    Poisoned,
}

/// Fan-out over std channels. Subscriptions whose receiver was dropped are
/// forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut senders = self.senders.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        let live_before = senders.len();
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        let closed = live_before - senders.len();
        if closed > 0 {
            tracing::debug!(closed, "forgot closed subscriptions");
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            Err(_) => tracing::warn!("notice bus poisoned; subscription will stay empty"),
        }
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_subscription_gets_its_own_copy() {
        let bus = InMemoryEventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(7u32).unwrap();

        assert_eq!(first.try_recv().unwrap(), 7);
        assert_eq!(second.drain(), vec![7]);
    }

    #[test]
    fn closed_subscriptions_are_forgotten() {
        let bus = InMemoryEventBus::new();
        drop(bus.subscribe());
        let live = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish("x".to_string()).unwrap();

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(live.drain(), vec!["x".to_string()]);
    }

    #[test]
    fn messages_before_subscribing_are_not_replayed() {
        let bus = InMemoryEventBus::new();
        bus.publish(1u8).unwrap();
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }
}
