//! # Subscriber identity and notification channel.
//!
//! A [`Subscriber`] is the multiplexer's view of one attached consumer: an
//! opaque comparable [`SubscriberId`] plus a bounded queue over which the
//! stream delivers [`Notice`]s. Delivery is fire-and-forget — there is no
//! return channel back into the stream, and a full or abandoned queue drops
//! the notice with a warning instead of blocking the drain path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Global counter for subscriber identities.
static SUBSCRIBER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque token identifying one attached subscriber.
///
/// Ids are unique for the lifetime of the process; the stream needs only
/// equality and iteration over the attached set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Notification delivered to an attached subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The stream hit a terminal failure.
    ///
    /// Carries the OS error code and its human-readable description. Each
    /// subscriber receives exactly one fault notice per failure, followed by
    /// a `Closed(true)` signal.
    Fault {
        /// Raw OS error code.
        code: i32,
        /// strerror-style description of `code`.
        message: Arc<str>,
    },

    /// Boolean signal on the stream's closed port.
    ///
    /// `Closed(true)` follows every fault fan-out.
    Closed(bool),
}

/// One attached consumer: identity plus its notice queue.
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Notice>,
}

impl Subscriber {
    /// Creates a subscriber delivering notices to the given sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Notice>) -> Self {
        Self {
            id: SubscriberId(SUBSCRIBER_SEQ.fetch_add(1, Ordering::Relaxed)),
            tx,
        }
    }

    /// Creates a subscriber together with its receiving half.
    ///
    /// The queue capacity is clamped to a minimum of 1.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// This subscriber's identity token.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Delivers one notice without blocking.
    ///
    /// If the queue is **full** or the receiver is gone, the notice is
    /// dropped for this subscriber and a warning is printed.
    pub(crate) fn notify(&self, notice: Notice) {
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                eprintln!("[outmux] subscriber {:?} dropped notice: queue full", self.id);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                eprintln!(
                    "[outmux] subscriber {:?} dropped notice: receiver closed",
                    self.id
                );
            }
        }
    }
}
