//! # outmux
//!
//! **outmux** is a non-blocking, back-pressured output multiplexer: a
//! shared, single-instance writer that accepts ordered byte chunks from one
//! or more producers, queues them FIFO, and drains the queue to one OS
//! output stream (typically stdout or stderr) without ever blocking the
//! caller.
//!
//! ## Architecture
//! ```text
//!  producer A ──┐
//!  producer B ──┼─ enqueue(Blob) ──► WriteQueue (strict FIFO)
//!  producer N ──┘                        │
//!                         first entry arms the watch
//!                                        ▼
//!                        watch task: AsyncFd ready(WRITABLE)
//!                                        │
//!                          drain loop (budgeted, non-blocking)
//!                          ├─ EAGAIN  → wait for next signal
//!                          ├─ EINTR   → retry immediately
//!                          ├─ budget  → yield, re-poll
//!                          └─ fatal   → fan-out + discard
//!                                        ▼
//!                                   write(2) → descriptor
//!
//!  fatal error fan-out (once per subscriber, then queue discarded):
//!      Notice::Fault { code, message } → Notice::Closed(true)
//! ```
//!
//! ## Guarantees
//! | Property          | Description                                                           |
//! |-------------------|-----------------------------------------------------------------------|
//! | **FIFO**          | Bytes reach the descriptor in exact enqueue order.                    |
//! | **Non-blocking**  | No entry point and no drain step ever performs a blocking call.       |
//! | **Fairness**      | One drain invocation writes for at most [`MuxConfig::write_budget`].  |
//! | **Exactly-once**  | Each queued blob is released exactly once: on completion or discard.  |
//! | **Fan-out**       | A terminal fault reaches every attached subscriber exactly once.      |
//! | **Clean teardown**| Last detach leaves no armed watch and no queued data behind.          |
//!
//! ## Example
//! ```no_run
//! use outmux::{Blob, MuxConfig, OutputMux, Subscriber};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mux = OutputMux::stdout(MuxConfig::default());
//!
//!     let (sub, mut notices) = Subscriber::channel(16);
//!     let id = mux.attach(sub).expect("attach");
//!
//!     // Hosts usually probe closed-ness once, on first connection.
//!     assert!(!mux.query_closed());
//!
//!     mux.enqueue(Blob::from("hello, flow\n")).expect("enqueue");
//!
//!     // Faults, if any, arrive here as Notice::Fault + Notice::Closed(true).
//!     if let Ok(notice) = notices.try_recv() {
//!         eprintln!("stream notice: {notice:?}");
//!     }
//!     mux.detach(id);
//! }
//! ```
//!
//! Unix-only: readiness registration relies on `tokio::io::unix::AsyncFd`.

mod blob;
mod config;
mod error;
mod mux;
mod subscribers;

// ---- Public re-exports ----

pub use blob::Blob;
pub use config::MuxConfig;
pub use error::{MuxError, StreamFault};
pub use mux::OutputMux;
pub use subscribers::{Notice, Subscriber, SubscriberId};
