//! # Write-readiness watch.
//!
//! The readiness registration from the design maps onto the tokio reactor:
//! the [`AsyncFd`] registers the descriptor for writability (and, on
//! Linux, error conditions). It is created on first arm and then shared by
//! every successive watch task for the stream's lifetime — a descriptor
//! can only be registered with the reactor once, and a cancelled watch may
//! hold its handle until the scheduler next polls it, so re-arming must
//! reuse the live registration rather than create a second one. One watch
//! task per armed stream awaits readiness and invokes the drain scheduler;
//! disarming cancels the task through its [`CancellationToken`].
//!
//! ## Scheduling contract
//! - The watch task is the only caller of the drain loop, so `drain` is
//!   never re-entrant and never concurrent with itself.
//! - A would-block result clears the readiness flag and waits for the next
//!   signal; a budget stop keeps the flag, yields to the scheduler, and
//!   re-polls.
//! - A cancelled watch may still win the readiness race once; the epoch
//!   check keeps such a stale task from touching a successor's state.

use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::unix::AsyncFd;
use tokio::io::{Interest, Ready};
use tokio_util::sync::CancellationToken;

use crate::error::StreamFault;

use super::drain::{drain, DrainOutcome};
use super::sink::FdSink;
use super::stream::{lock_state, StreamState};

/// Handle to an armed readiness watch.
pub(crate) struct WatchHandle {
    token: CancellationToken,
    epoch: u64,
}

impl WatchHandle {
    pub(crate) fn new(token: CancellationToken, epoch: u64) -> Self {
        Self { token, epoch }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Deregisters the watch; idempotent.
    pub(crate) fn disarm(&self) {
        self.token.cancel();
    }
}

/// Non-owning wrapper so the reactor can register a borrowed descriptor.
pub(crate) struct Descriptor(pub(crate) RawFd);

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn watch_interest() -> Interest {
    Interest::WRITABLE | Interest::ERROR
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) fn watch_interest() -> Interest {
    Interest::WRITABLE
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn error_signaled(ready: Ready) -> bool {
    ready.is_error()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn error_signaled(_ready: Ready) -> bool {
    // Without an error interest, descriptor failures surface through the
    // write path instead.
    false
}

/// Runs until the queue drains, the stream faults, or the watch is disarmed.
pub(crate) async fn watch_loop(
    shared: Arc<Mutex<StreamState>>,
    afd: Arc<AsyncFd<Descriptor>>,
    token: CancellationToken,
    epoch: u64,
    budget: Duration,
) {
    loop {
        let mut guard = tokio::select! {
            _ = token.cancelled() => return,
            ready = afd.ready(watch_interest()) => match ready {
                Ok(guard) => guard,
                Err(_) => {
                    fail_stream(&shared, epoch, StreamFault::Descriptor);
                    return;
                }
            },
        };

        let outcome = {
            let mut state = lock_state(&shared);
            if !state.watch_matches(epoch) {
                // A successor owns the registration now.
                return;
            }
            if error_signaled(guard.ready()) {
                state.fail(StreamFault::Descriptor);
                return;
            }

            let mut sink = FdSink::new(state.fd());
            match drain(state.queue_mut(), &mut sink, budget) {
                DrainOutcome::Idle => {
                    state.clear_watch();
                    state.debug_check_invariant();
                    return;
                }
                DrainOutcome::Fatal(fault) => {
                    state.fail(fault);
                    return;
                }
                paused => {
                    state.debug_check_invariant();
                    paused
                }
            }
        };

        match outcome {
            DrainOutcome::WouldBlock => guard.clear_ready(),
            _ => {
                // Budget stop: readiness is still set, but give the rest of
                // the event loop a turn before re-polling.
                drop(guard);
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Faults the stream on behalf of this watch, unless the watch is stale.
fn fail_stream(shared: &Arc<Mutex<StreamState>>, epoch: u64, fault: StreamFault) {
    let mut state = lock_state(shared);
    if state.watch_matches(epoch) {
        state.fail(fault);
    }
}
