//! Error types used by the output multiplexer.
//!
//! This module defines two error enums:
//!
//! - [`MuxError`] — synchronous failures returned to the caller of
//!   `attach`/`enqueue`; the triggering operation is rolled back.
//! - [`StreamFault`] — terminal stream failures detected asynchronously
//!   inside the drain loop; never returned to a caller, instead broadcast to
//!   every attached subscriber before the queue is discarded.
//!
//! Would-block and interrupted write conditions are not errors: they are
//! absorbed inside the drain scheduler.
//!
//! Both types provide helper methods (`as_label`, `as_message`/`message`)
//! for logging and tests.

use std::io;

use thiserror::Error;

/// # Synchronous errors returned by enqueue/attach.
///
/// Each variant leaves the stream state unchanged: a failed enqueue removes
/// the just-appended queue entry, a failed attach leaves the subscriber set
/// as it was.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MuxError {
    /// The subscriber membership set cannot grow (configured cap reached).
    #[error("subscriber capacity exhausted")]
    ResourceExhausted,

    /// Putting the descriptor into non-blocking mode failed.
    #[error("failed to set descriptor non-blocking: {source}")]
    SetNonblocking {
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Registering the write-readiness watch with the event loop failed.
    #[error("failed to register write-readiness watch: {source}")]
    Registration {
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl MuxError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use outmux::MuxError;
    ///
    /// assert_eq!(MuxError::ResourceExhausted.as_label(), "resource_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MuxError::ResourceExhausted => "resource_exhausted",
            MuxError::SetNonblocking { .. } => "set_nonblocking_failed",
            MuxError::Registration { .. } => "watch_registration_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            MuxError::ResourceExhausted => "subscriber capacity exhausted".to_string(),
            MuxError::SetNonblocking { source } => format!("set O_NONBLOCK: {source}"),
            MuxError::Registration { source } => format!("watch registration: {source}"),
        }
    }
}

/// # Terminal stream failures.
///
/// A fault is fatal for the whole stream: it is fanned out to every attached
/// subscriber exactly once (an error notice followed by a closed signal) and
/// all queued data is discarded, regardless of which producer enqueued it.
/// The descriptor is the shared failing resource, so there is no
/// per-producer isolation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    /// The event loop reported an error condition on the descriptor itself.
    #[error("descriptor error condition")]
    Descriptor,

    /// A write system call failed with an errno other than would-block or
    /// interrupted.
    #[error("write failed (errno {code})")]
    Write {
        /// The raw OS error code carried by the failed write.
        code: i32,
    },
}

impl StreamFault {
    /// Builds a fault from a failed write call.
    ///
    /// Writes that fail without an OS error code are mapped to `EIO`.
    pub(crate) fn from_write_error(err: &io::Error) -> Self {
        StreamFault::Write {
            code: err.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// The OS error code delivered to subscribers.
    ///
    /// Descriptor-level error conditions are reported as `EBADF`.
    pub fn code(&self) -> i32 {
        match self {
            StreamFault::Descriptor => libc::EBADF,
            StreamFault::Write { code } => *code,
        }
    }

    /// Human-readable description of [`StreamFault::code`] (strerror text).
    pub fn message(&self) -> String {
        io::Error::from_raw_os_error(self.code()).to_string()
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamFault::Descriptor => "descriptor_error",
            StreamFault::Write { .. } => "write_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes() {
        assert_eq!(StreamFault::Descriptor.code(), libc::EBADF);
        assert_eq!(StreamFault::Write { code: libc::EPIPE }.code(), libc::EPIPE);
    }

    #[test]
    fn test_write_error_without_errno_maps_to_eio() {
        let err = io::Error::other("synthetic");
        assert_eq!(
            StreamFault::from_write_error(&err),
            StreamFault::Write { code: libc::EIO }
        );
    }

    #[test]
    fn test_messages_are_nonempty() {
        assert!(!StreamFault::Descriptor.message().is_empty());
        assert!(!MuxError::ResourceExhausted.as_message().is_empty());
    }
}
