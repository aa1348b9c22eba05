//! Single-slot rendezvous
//!
//! One value may be offered; the receiver awaits it. Later offers, and offers
//! made after the receiver stopped waiting, are handed back to the caller so
//! it can undo whatever the value represents.
//!
//! ## Lock Usage
//!
//! The sender sits in a `parking_lot::Mutex<Option<_>>`; the lock is held only
//! to take it out.

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Offering side of a single-slot rendezvous
#[derive(Debug)]
pub struct RendezvousSlot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

/// Create a slot and the receiver awaiting it
pub fn rendezvous<T>() -> (RendezvousSlot<T>, oneshot::Receiver<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        RendezvousSlot {
            sender: Mutex::new(Some(sender)),
        },
        receiver,
    )
}

impl<T> RendezvousSlot<T> {
    /// Deliver `value`.
    ///
    /// Returns it back when the slot was already used or the receiver is
    /// gone.
    pub fn offer(&self, value: T) -> Result<(), T> {
        let sender = self.sender.lock().take();
        match sender {
            Some(sender) => sender.send(value),
            None => Err(value),
        }
    }

    /// Whether a value was already offered
    pub fn is_used(&self) -> bool {
        self.sender.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_offer_wins() {
        let (slot, receiver) = rendezvous();
        assert_eq!(slot.offer(1), Ok(()));
        assert_eq!(slot.offer(2), Err(2));
        assert!(slot.is_used());
        assert_eq!(receiver.await.unwrap(), 1);
    }

    #[test]
    fn offers_after_the_receiver_left_come_back() {
        let (slot, receiver) = rendezvous();
        drop(receiver);
        assert_eq!(slot.offer("late"), Err("late"));
    }
}
