//! # Drain scheduler: the non-blocking write loop.
//!
//! [`drain`] is invoked whenever the descriptor signals writable. It walks
//! the queue head-first, issuing one non-blocking write per iteration, and
//! stops on the first of:
//!
//! - the queue running dry ([`DrainOutcome::Idle`] — the watch disarms);
//! - the descriptor pushing back ([`DrainOutcome::WouldBlock`] — the watch
//!   stays armed for the next readiness signal);
//! - the wall-clock budget running out with work remaining
//!   ([`DrainOutcome::Budget`] — the watch stays armed and re-polls after
//!   yielding, so one stream cannot starve the rest of the scheduler);
//! - a terminal write failure ([`DrainOutcome::Fatal`]).
//!
//! Interrupted writes (`EINTR`) are retried immediately; they make no
//! progress but still pass through the budget check. The budget is measured
//! with [`Instant`], so it is immune to wall-clock adjustments, and it is
//! only checked after a write attempt — even a zero budget drains at least
//! one chunk per invocation.

use std::io;
use std::time::{Duration, Instant};

use crate::error::StreamFault;

use super::queue::WriteQueue;
use super::sink::RawSink;

/// Why a drain invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Queue fully drained; the readiness watch should disarm.
    Idle,
    /// The descriptor cannot accept more bytes right now.
    WouldBlock,
    /// Time budget exhausted with work remaining.
    Budget,
    /// Terminal failure; the stream must fault and discard its queue.
    Fatal(StreamFault),
}

/// Result of one write attempt against the queue head.
enum Step {
    /// Head entry fully written (or empty) and removed.
    Completed,
    /// Partial progress on the head entry.
    Progress,
    /// Would-block, or a zero-byte write with data remaining.
    Stalled,
    /// Interrupted call; retry without counting progress.
    Retry,
}

/// Drains as much of `queue` into `sink` as the budget allows.
///
/// Never blocks and never touches entries other than the head. Fatal errors
/// are reported, not handled: discarding the queue and notifying
/// subscribers is the caller's job, so the queue is left as-is for it.
pub(crate) fn drain<S: RawSink>(
    queue: &mut WriteQueue,
    sink: &mut S,
    budget: Duration,
) -> DrainOutcome {
    let start = Instant::now();

    loop {
        let step = match queue.head_mut() {
            None => return DrainOutcome::Idle,
            Some(head) => {
                if head.remaining().is_empty() {
                    Step::Completed
                } else {
                    match sink.try_write(head.remaining()) {
                        // A zero-byte result with bytes remaining would spin;
                        // treat it like back-pressure.
                        Ok(0) => Step::Stalled,
                        Ok(written) => {
                            head.advance(written);
                            if head.is_complete() {
                                Step::Completed
                            } else {
                                Step::Progress
                            }
                        }
                        Err(err) => match err.kind() {
                            io::ErrorKind::WouldBlock => Step::Stalled,
                            io::ErrorKind::Interrupted => Step::Retry,
                            _ => return DrainOutcome::Fatal(StreamFault::from_write_error(&err)),
                        },
                    }
                }
            }
        };

        match step {
            Step::Completed => queue.complete_head(),
            Step::Stalled => return DrainOutcome::WouldBlock,
            Step::Progress | Step::Retry => {}
        }

        if queue.is_empty() {
            return DrainOutcome::Idle;
        }
        if start.elapsed() >= budget {
            return DrainOutcome::Budget;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;

    use std::collections::VecDeque;

    /// Scripted write behavior, one entry per `try_write` call.
    #[derive(Clone, Copy)]
    enum WriteStep {
        Accept(usize),
        WouldBlock,
        Interrupt,
        Fail(i32),
    }

    /// Fake sink that follows a script, then accepts everything.
    struct ScriptedSink {
        script: VecDeque<WriteStep>,
        written: Vec<u8>,
    }

    impl ScriptedSink {
        fn new(script: &[WriteStep]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                written: Vec::new(),
            }
        }

        fn accepting() -> Self {
            Self::new(&[])
        }
    }

    impl RawSink for ScriptedSink {
        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.script.pop_front().unwrap_or(WriteStep::Accept(usize::MAX)) {
                WriteStep::Accept(n) => {
                    let n = n.min(buf.len());
                    self.written.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                WriteStep::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
                WriteStep::Interrupt => Err(io::ErrorKind::Interrupted.into()),
                WriteStep::Fail(code) => Err(io::Error::from_raw_os_error(code)),
            }
        }
    }

    const GENEROUS: Duration = Duration::from_secs(5);

    fn queue_of(chunks: &[&[u8]]) -> WriteQueue {
        let mut queue = WriteQueue::new();
        for chunk in chunks {
            queue.push(Blob::from(*chunk));
        }
        queue
    }

    #[test]
    fn test_fifo_bytes_equal_concatenation() {
        let mut queue = queue_of(&[b"one ", b"two ", b"three"]);
        let mut sink = ScriptedSink::accepting();

        assert_eq!(drain(&mut queue, &mut sink, GENEROUS), DrainOutcome::Idle);
        assert_eq!(sink.written, b"one two three");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_would_block_leaves_queue_and_offset_untouched() {
        let mut queue = queue_of(&[b"hello"]);
        let mut sink = ScriptedSink::new(&[WriteStep::WouldBlock]);

        assert_eq!(
            drain(&mut queue, &mut sink, GENEROUS),
            DrainOutcome::WouldBlock
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.head().unwrap().offset(), 0);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_interrupted_write_is_retried() {
        let mut queue = queue_of(&[b"payload"]);
        let mut sink = ScriptedSink::new(&[WriteStep::Interrupt, WriteStep::Interrupt]);

        assert_eq!(drain(&mut queue, &mut sink, GENEROUS), DrainOutcome::Idle);
        assert_eq!(sink.written, b"payload");
    }

    #[test]
    fn test_partial_write_then_would_block_then_resume() {
        let blob = Blob::from(&b"0123456789"[..]);
        let mut queue = WriteQueue::new();
        queue.push(blob.clone());
        assert_eq!(blob.ref_count(), 2);

        let mut sink = ScriptedSink::new(&[WriteStep::Accept(4), WriteStep::WouldBlock]);
        assert_eq!(
            drain(&mut queue, &mut sink, GENEROUS),
            DrainOutcome::WouldBlock
        );
        assert_eq!(queue.head().unwrap().offset(), 4);
        assert_eq!(sink.written, b"0123");

        // Next readiness signal: the remaining six bytes go through.
        assert_eq!(drain(&mut queue, &mut sink, GENEROUS), DrainOutcome::Idle);
        assert_eq!(sink.written, b"0123456789");
        assert!(queue.is_empty());
        assert_eq!(blob.ref_count(), 1, "exactly one release on completion");
    }

    #[test]
    fn test_zero_budget_stops_after_one_chunk() {
        let mut queue = queue_of(&[b"first", b"second", b"third"]);
        let mut sink = ScriptedSink::accepting();

        assert_eq!(
            drain(&mut queue, &mut sink, Duration::ZERO),
            DrainOutcome::Budget
        );
        assert_eq!(sink.written, b"first");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fatal_error_carries_os_code() {
        let mut queue = queue_of(&[b"doomed"]);
        let mut sink = ScriptedSink::new(&[WriteStep::Fail(libc::EPIPE)]);

        assert_eq!(
            drain(&mut queue, &mut sink, GENEROUS),
            DrainOutcome::Fatal(StreamFault::Write { code: libc::EPIPE })
        );
        // Discard is the caller's responsibility.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_zero_length_blob_completes_without_a_write() {
        let mut queue = queue_of(&[b"", b"data"]);
        let mut sink = ScriptedSink::accepting();

        assert_eq!(drain(&mut queue, &mut sink, GENEROUS), DrainOutcome::Idle);
        assert_eq!(sink.written, b"data");
    }

    #[test]
    fn test_zero_byte_write_treated_as_back_pressure() {
        let mut queue = queue_of(&[b"stuck"]);
        let mut sink = ScriptedSink::new(&[WriteStep::Accept(0)]);

        assert_eq!(
            drain(&mut queue, &mut sink, GENEROUS),
            DrainOutcome::WouldBlock
        );
        assert_eq!(queue.head().unwrap().offset(), 0);
    }
}
