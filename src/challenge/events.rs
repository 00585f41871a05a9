use std::sync::mpsc;

use crate::models::{DayKey, DayStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    DayMarked { key: DayKey, status: DayStatus },
    Cleared,
}

/// Fan-out of events to any number of receivers.
///
/// Delivery is synchronous and in subscription order. Dropping a receiver
/// unsubscribes it; the dead sender is pruned on the next publish.
#[derive(Debug)]
pub struct EventBus<T> {
    subscribers: Vec<mpsc::Sender<T>>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: T) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_events_in_order() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(1);
        bus.publish(2);
        assert_eq!(a.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.try_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        let gone = bus.subscribe();
        drop(gone);
        bus.publish("x");
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), "x");
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(LedgerEvent::Cleared);
        let rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
