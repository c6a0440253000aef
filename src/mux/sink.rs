//! Raw descriptor plumbing: non-blocking writes and flag probes.
//!
//! The drain loop is written against the [`RawSink`] trait so tests can
//! substitute a scripted sink; [`FdSink`] is the production implementation
//! over a raw file descriptor.

use std::io;
use std::os::fd::RawFd;

/// A single non-blocking write attempt.
///
/// Implementations must never block: a descriptor that cannot accept bytes
/// right now reports `ErrorKind::WouldBlock`.
pub(crate) trait RawSink {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Writes directly to a raw descriptor via `write(2)`.
///
/// Does not own the descriptor; the caller keeps it open for the stream's
/// lifetime.
pub(crate) struct FdSink {
    fd: RawFd,
}

impl FdSink {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl RawSink for FdSink {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = unsafe {
            libc::write(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
            )
        };
        if written < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(written as usize)
        }
    }
}

/// Sets `O_NONBLOCK` on the descriptor, preserving the other status flags.
pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// True when the descriptor no longer answers flag queries (already closed).
pub(crate) fn probe_closed(fd: RawFd) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFL) < 0 }
}
