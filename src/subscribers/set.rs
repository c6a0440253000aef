//! # Subscriber registry with terminal-fault fan-out.
//!
//! [`SubscriberSet`] tracks which consumers are currently attached to a
//! stream and broadcasts terminal failures to all of them.
//!
//! ## What it guarantees
//! - Unique membership: ids come from a process-wide counter, so every
//!   inserted subscriber is distinct by construction.
//! - `fault_all` delivers, per subscriber, exactly one [`Notice::Fault`]
//!   followed by exactly one [`Notice::Closed`]`(true)`, without awaiting
//!   any of them.
//! - Removal is idempotent.
//!
//! ## What it does **not** guarantee
//! - Delivery on overflow: a subscriber whose notice queue is full loses the
//!   notice (warn), the fan-out moves on to the next subscriber.

use std::sync::Arc;

use crate::error::{MuxError, StreamFault};

use super::{Notice, Subscriber, SubscriberId};

/// Set of currently-attached subscribers for one stream.
pub(crate) struct SubscriberSet {
    members: Vec<Subscriber>,
    /// Membership cap (0 = unlimited).
    cap: usize,
}

impl SubscriberSet {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            members: Vec::new(),
            cap,
        }
    }

    /// Adds a subscriber; fails when the membership cap is reached.
    pub(crate) fn insert(&mut self, subscriber: Subscriber) -> Result<(), MuxError> {
        if self.cap != 0 && self.members.len() >= self.cap {
            return Err(MuxError::ResourceExhausted);
        }
        self.members.push(subscriber);
        Ok(())
    }

    /// Removes a subscriber if present; returns whether anything was removed.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id() != id);
        self.members.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// Fans one terminal fault out to every attached subscriber.
    ///
    /// Per subscriber: the fault notice, then the closed signal. The
    /// strerror text is built once and shared across all deliveries.
    pub(crate) fn fault_all(&self, fault: &StreamFault) {
        let message: Arc<str> = fault.message().into();
        for member in &self.members {
            member.notify(Notice::Fault {
                code: fault.code(),
                message: Arc::clone(&message),
            });
            member.notify(Notice::Closed(true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamFault;

    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn test_remove_is_idempotent() {
        let mut set = SubscriberSet::new(0);
        let (sub, _rx) = Subscriber::channel(1);
        let id = sub.id();

        set.insert(sub).unwrap();
        assert_eq!(set.len(), 1);

        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_keeps_notice_channel_open() {
        let mut set = SubscriberSet::new(0);
        let (sub, mut rx) = Subscriber::channel(2);
        set.insert(sub).unwrap();

        // The registry now owns the sender half; the consumer side must
        // stay connected until the subscriber is removed.
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        set.fault_all(&StreamFault::Descriptor);
        assert!(matches!(rx.try_recv(), Ok(Notice::Fault { .. })));
        assert_eq!(rx.try_recv(), Ok(Notice::Closed(true)));
    }

    #[test]
    fn test_cap_reached_returns_resource_exhausted() {
        let mut set = SubscriberSet::new(1);
        let (first, _rx1) = Subscriber::channel(1);
        let (second, _rx2) = Subscriber::channel(1);

        set.insert(first).unwrap();
        assert!(matches!(
            set.insert(second),
            Err(MuxError::ResourceExhausted)
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_fault_all_delivers_one_fault_and_one_closed_each() {
        let mut set = SubscriberSet::new(0);
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (sub, rx) = Subscriber::channel(4);
            set.insert(sub).unwrap();
            receivers.push(rx);
        }

        set.fault_all(&StreamFault::Write { code: libc::EPIPE });

        for rx in &mut receivers {
            match rx.try_recv() {
                Ok(Notice::Fault { code, message }) => {
                    assert_eq!(code, libc::EPIPE);
                    assert!(!message.is_empty());
                }
                other => panic!("expected fault notice, got {other:?}"),
            }
            assert_eq!(rx.try_recv(), Ok(Notice::Closed(true)));
            assert!(rx.try_recv().is_err(), "no extra notices expected");
        }
    }
}
