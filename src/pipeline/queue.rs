//! Bounded queues with drop-oldest backpressure.
//!
//! Producers never block and never fail on a full queue: the oldest
//! waiting item is discarded to make room, keeping latency bounded at the
//! cost of completeness. Every discard bumps a shared counter.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Create a bounded drop-oldest channel.
///
/// `dropped` is bumped once per discarded item; share the counter with the
/// session to surface drops in snapshots.
pub fn bounded_drop_oldest<T>(
    capacity: usize,
    dropped: Arc<AtomicU64>,
) -> (DropOldestSender<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let sender = DropOldestSender {
        tx,
        rx: rx.clone(),
        dropped,
    };
    (sender, rx)
}

/// Sending half of a drop-oldest queue.
///
/// Holds its own receiver clone; crossbeam channels are multi-consumer, so
/// the sender can pull the oldest item out when the queue is full.
pub struct DropOldestSender<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for DropOldestSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl<T> DropOldestSender<T> {
    /// Send an item, discarding the oldest queued item if full.
    ///
    /// Returns false only when every receiver is gone.
    pub fn send(&self, mut item: T) -> bool {
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    // Evict the head and retry. Another consumer may race
                    // us to it, which is fine: room either way.
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    item = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(capacity: usize) -> (DropOldestSender<u32>, Receiver<u32>) {
        bounded_drop_oldest(capacity, Arc::new(AtomicU64::new(0)))
    }

    #[test]
    fn test_send_and_receive_in_order() {
        let (tx, rx) = channel(4);
        for i in 0..3 {
            assert!(tx.send(i));
        }
        assert_eq!(rx.try_recv().unwrap(), 0);
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
        assert_eq!(tx.dropped(), 0);
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let (tx, rx) = channel(2);
        assert!(tx.send(1));
        assert!(tx.send(2));
        assert!(tx.send(3));
        assert_eq!(tx.dropped(), 1);
        // 1 was evicted; newest item survived.
        assert_eq!(rx.try_recv().unwrap(), 2);
        assert_eq!(rx.try_recv().unwrap(), 3);
    }

    #[test]
    fn test_sender_keeps_channel_alive_after_consumer_drop() {
        // The sender holds its own receiver clone, so sends keep working
        // even after the consumer is gone. Shutdown is signalled out of
        // band, not through disconnects.
        let (tx, rx) = channel(2);
        drop(rx);
        assert!(tx.send(1));
    }

    #[test]
    fn test_drop_counter_is_shared() {
        let dropped = Arc::new(AtomicU64::new(0));
        let (tx, _rx) = bounded_drop_oldest::<u32>(1, Arc::clone(&dropped));
        tx.send(1);
        tx.send(2);
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }
}
