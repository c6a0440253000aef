//! FIFO queue of pending write requests.
//!
//! Each entry holds one [`Blob`] clone and the number of bytes already
//! written from it. Insertion order is write order; only the head entry ever
//! advances. Entries release their blob reference when removed, whether
//! completed, rolled back, or discarded wholesale.

use std::collections::VecDeque;

use crate::blob::Blob;

/// One queued chunk: a shared buffer plus the drain progress into it.
pub(crate) struct PendingWrite {
    blob: Blob,
    offset: usize,
}

impl PendingWrite {
    fn new(blob: Blob) -> Self {
        Self { blob, offset: 0 }
    }

    /// Bytes not yet written.
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.blob.as_bytes()[self.offset..]
    }

    /// Records `written` more bytes of drain progress.
    pub(crate) fn advance(&mut self, written: usize) {
        self.offset += written;
        debug_assert!(self.offset <= self.blob.len());
    }

    /// True once every byte has been written.
    pub(crate) fn is_complete(&self) -> bool {
        self.offset >= self.blob.len()
    }

    #[cfg(test)]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

/// Strict-FIFO sequence of pending writes.
pub(crate) struct WriteQueue {
    entries: VecDeque<PendingWrite>,
}

impl WriteQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Appends a new pending write for `blob` at the tail.
    pub(crate) fn push(&mut self, blob: Blob) {
        self.entries.push_back(PendingWrite::new(blob));
    }

    /// Removes the most recently pushed entry (enqueue rollback).
    pub(crate) fn rollback_tail(&mut self) {
        self.entries.pop_back();
    }

    pub(crate) fn head_mut(&mut self) -> Option<&mut PendingWrite> {
        self.entries.front_mut()
    }

    #[cfg(test)]
    pub(crate) fn head(&self) -> Option<&PendingWrite> {
        self.entries.front()
    }

    /// Removes the fully-written head entry, releasing its blob reference.
    pub(crate) fn complete_head(&mut self) {
        self.entries.pop_front();
    }

    /// Drops every entry, releasing all held blob references.
    pub(crate) fn discard_all(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_fifo_order() {
        let mut queue = WriteQueue::new();
        queue.push(Blob::from(&b"first"[..]));
        queue.push(Blob::from(&b"second"[..]));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.head().unwrap().remaining(), b"first");

        queue.complete_head();
        assert_eq!(queue.head().unwrap().remaining(), b"second");
    }

    #[test]
    fn test_rollback_tail_releases_reference() {
        let blob = Blob::from(vec![0u8; 8]);
        let mut queue = WriteQueue::new();

        queue.push(blob.clone());
        assert_eq!(blob.ref_count(), 2);

        queue.rollback_tail();
        assert_eq!(blob.ref_count(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_discard_all_releases_every_reference() {
        let a = Blob::from(&b"a"[..]);
        let b = Blob::from(&b"b"[..]);
        let mut queue = WriteQueue::new();

        queue.push(a.clone());
        queue.push(b.clone());
        assert_eq!(a.ref_count(), 2);
        assert_eq!(b.ref_count(), 2);

        queue.discard_all();
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 1);
    }

    #[test]
    fn test_advance_tracks_completion() {
        let mut queue = WriteQueue::new();
        queue.push(Blob::from(&b"0123456789"[..]));

        let head = queue.head_mut().unwrap();
        head.advance(4);
        assert!(!head.is_complete());
        assert_eq!(head.remaining(), b"456789");

        head.advance(6);
        assert!(head.is_complete());
        assert!(head.remaining().is_empty());
    }
}
