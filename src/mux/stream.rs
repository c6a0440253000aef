//! # OutputMux: the per-stream facade.
//!
//! One [`OutputMux`] instance owns everything the design attaches to a
//! single physical output stream: the FIFO write queue, the subscriber
//! registry, and the lazily-armed readiness watch. The process typically
//! holds two instances, one for stdout and one for stderr.
//!
//! ## Data flow
//! ```text
//! producer ──enqueue(Blob)──► WriteQueue ──┐ (arm on first entry)
//!                                          ▼
//!                                   watch task (AsyncFd writable)
//!                                          │ drain loop, budgeted
//!                                          ▼
//!                                      write(2) ──► descriptor
//!
//! fatal write/descriptor error:
//!   SubscriberSet ──► Notice::Fault + Notice::Closed(true)  (each, once)
//!   WriteQueue    ──► discarded wholesale
//! ```
//!
//! ## Lifecycle
//! - `attach` / `detach` mirror a consumer's open/close hooks; detaching the
//!   last consumer tears down the queue and the watch.
//! - `enqueue` mirrors the data hook; it never blocks and never writes
//!   inline — bytes only move in the watch task.
//! - `query_closed` answers the initial "is this stream already closed"
//!   probe on first connection.
//!
//! All entry points serialize on one internal mutex, so a multi-threaded
//! host may share an instance freely; the drain loop still never runs
//! concurrently with itself.

use std::os::fd::RawFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::unix::AsyncFd;
use tokio_util::sync::CancellationToken;

use crate::blob::Blob;
use crate::config::MuxConfig;
use crate::error::{MuxError, StreamFault};
use crate::subscribers::{Subscriber, SubscriberId, SubscriberSet};

use super::queue::WriteQueue;
use super::sink;
use super::watch::{watch_interest, watch_loop, Descriptor, WatchHandle};

/// Mutable state of one output stream.
///
/// Invariant: the watch is armed exactly when the queue is non-empty; this
/// is debug-asserted after every mutation of the queue.
pub(crate) struct StreamState {
    fd: RawFd,
    cfg: MuxConfig,
    queue: WriteQueue,
    subscribers: SubscriberSet,
    watch: Option<WatchHandle>,
    /// Reactor registration, created on first arm and shared with every
    /// watch task thereafter. A descriptor can be registered only once,
    /// and a cancelled watch may keep its handle alive until the scheduler
    /// polls it again, so re-arming must reuse this instead of creating a
    /// second registration for the same fd.
    afd: Option<Arc<AsyncFd<Descriptor>>>,
    /// O_NONBLOCK is set once, permanently, on first arm.
    nonblocking: bool,
    /// Bumped on every arm; lets a stale watch task recognize itself.
    epoch: u64,
}

impl StreamState {
    fn new(fd: RawFd, cfg: MuxConfig) -> Self {
        Self {
            fd,
            cfg,
            queue: WriteQueue::new(),
            subscribers: SubscriberSet::new(cfg.max_subscribers),
            watch: None,
            afd: None,
            nonblocking: false,
            epoch: 0,
        }
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn queue_mut(&mut self) -> &mut WriteQueue {
        &mut self.queue
    }

    /// True if the given epoch still owns the registration.
    pub(crate) fn watch_matches(&self, epoch: u64) -> bool {
        self.watch.as_ref().is_some_and(|w| w.epoch() == epoch)
    }

    /// Clears the registration handle after the watch task exits on its own.
    pub(crate) fn clear_watch(&mut self) {
        self.watch = None;
    }

    /// Terminal failure: fan out to every subscriber, then discard all
    /// queued data and drop the registration.
    pub(crate) fn fail(&mut self, fault: StreamFault) {
        self.subscribers.fault_all(&fault);
        self.queue.discard_all();
        if let Some(watch) = self.watch.take() {
            watch.disarm();
        }
        self.debug_check_invariant();
    }

    /// Shared-resource teardown on last detach: no dangling registration,
    /// no leaked buffer reference.
    fn teardown(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.disarm();
        }
        self.queue.discard_all();
        self.debug_check_invariant();
    }

    pub(crate) fn debug_check_invariant(&self) {
        debug_assert_eq!(
            self.watch.is_some(),
            !self.queue.is_empty(),
            "watch must be armed exactly when writes are pending"
        );
    }
}

pub(crate) fn lock_state(shared: &Mutex<StreamState>) -> MutexGuard<'_, StreamState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Non-blocking, back-pressured writer for one OS output stream.
///
/// Accepts ordered [`Blob`]s from any number of producers, drains them FIFO
/// to the descriptor without ever blocking a caller, and reports terminal
/// errors to every attached [`Subscriber`] exactly once before discarding
/// undelivered data.
pub struct OutputMux {
    shared: Arc<Mutex<StreamState>>,
}

impl OutputMux {
    /// Multiplexer over the process's standard output.
    #[must_use]
    pub fn stdout(cfg: MuxConfig) -> Self {
        Self::from_raw_fd(libc::STDOUT_FILENO, cfg)
    }

    /// Multiplexer over the process's standard error.
    #[must_use]
    pub fn stderr(cfg: MuxConfig) -> Self {
        Self::from_raw_fd(libc::STDERR_FILENO, cfg)
    }

    /// Multiplexer over an arbitrary descriptor.
    ///
    /// The descriptor is borrowed, not owned: it must stay open for the
    /// instance's lifetime and is never closed by the multiplexer. The
    /// first enqueue puts it into non-blocking mode permanently.
    #[must_use]
    pub fn from_raw_fd(fd: RawFd, cfg: MuxConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(StreamState::new(fd, cfg))),
        }
    }

    /// Attaches a consumer; returns its identity token.
    ///
    /// Fails with [`MuxError::ResourceExhausted`] when the configured
    /// subscriber cap is reached.
    pub fn attach(&self, subscriber: Subscriber) -> Result<SubscriberId, MuxError> {
        let id = subscriber.id();
        self.lock().subscribers.insert(subscriber)?;
        Ok(id)
    }

    /// Detaches a consumer; a no-op if it is not attached.
    ///
    /// When the last consumer detaches, all queued writes are discarded and
    /// the readiness watch is disarmed, even if no error occurred.
    pub fn detach(&self, id: SubscriberId) {
        let mut state = self.lock();
        if state.subscribers.remove(id) && state.subscribers.is_empty() {
            state.teardown();
        }
    }

    /// Queues `blob` for writing and arms the readiness watch.
    ///
    /// Returns as soon as the blob is queued; bytes are written later, in
    /// enqueue order, from the watch task. On an arm failure the entry is
    /// rolled back and the stream is left unchanged.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime (the watch task is
    /// spawned on it).
    pub fn enqueue(&self, blob: Blob) -> Result<(), MuxError> {
        let mut state = self.lock();
        state.queue.push(blob);
        if let Err(err) = self.arm(&mut state) {
            state.queue.rollback_tail();
            state.debug_check_invariant();
            return Err(err);
        }
        state.debug_check_invariant();
        Ok(())
    }

    /// Whether the descriptor is already closed.
    ///
    /// Answers the initial closed-port probe on first connection; hosts
    /// forward the result as the port's starting value. Never mutates the
    /// queue or the subscriber set.
    #[must_use]
    pub fn query_closed(&self) -> bool {
        sink::probe_closed(self.lock().fd)
    }

    /// Number of writes still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    #[cfg(test)]
    pub(crate) fn armed(&self) -> bool {
        self.lock().watch.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        lock_state(&self.shared)
    }

    /// Arms the readiness watch; a no-op while one is already registered.
    fn arm(&self, state: &mut StreamState) -> Result<(), MuxError> {
        if state.watch.is_some() {
            return Ok(());
        }

        if !state.nonblocking {
            sink::set_nonblocking(state.fd)
                .map_err(|source| MuxError::SetNonblocking { source })?;
            state.nonblocking = true;
        }

        let afd = match &state.afd {
            Some(afd) => Arc::clone(afd),
            None => {
                let afd = AsyncFd::with_interest(Descriptor(state.fd), watch_interest())
                    .map_err(|source| MuxError::Registration { source })
                    .map(Arc::new)?;
                state.afd = Some(Arc::clone(&afd));
                afd
            }
        };

        state.epoch = state.epoch.wrapping_add(1);
        let token = CancellationToken::new();
        state.watch = Some(WatchHandle::new(token.clone(), state.epoch));

        tokio::spawn(watch_loop(
            Arc::clone(&self.shared),
            afd,
            token,
            state.epoch,
            state.cfg.write_budget,
        ));
        Ok(())
    }
}
