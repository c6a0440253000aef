//! Stream core: queue, drain scheduler, readiness watch, and facade.
//!
//! Internal modules:
//! - [`queue`]: FIFO of pending writes, one blob reference per entry;
//! - [`drain`]: the budgeted non-blocking write loop;
//! - [`sink`]: raw descriptor writes and flag probes;
//! - [`watch`]: the readiness watch task and its registration handle;
//! - [`stream`]: the public [`OutputMux`] facade tying it all together.

mod drain;
mod queue;
mod sink;
mod stream;
mod watch;

pub use stream::OutputMux;
