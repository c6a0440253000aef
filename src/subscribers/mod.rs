//! Subscriber identities, notices, and the per-stream registry.
//!
//! Consumers attach to a stream with a [`Subscriber`] (an opaque
//! [`SubscriberId`] plus a bounded notice queue) and receive [`Notice`]s
//! when the stream fails terminally. The registry itself (`SubscriberSet`)
//! is internal; the facade manages membership.

mod set;
mod subscriber;

pub use subscriber::{Notice, Subscriber, SubscriberId};

pub(crate) use set::SubscriberSet;
