//! Shared immutable byte buffers.
//!
//! [`Blob`] is the unit of data handed to the multiplexer. It is backed by an
//! `Arc<[u8]>`, so cloning acquires a reference and dropping releases it; a
//! queued chunk holds exactly one clone for as long as it is pending.

use std::fmt;
use std::sync::Arc;

/// Immutable, reference-counted byte buffer.
///
/// Cheap to clone: all clones share one allocation. The bytes can never be
/// mutated after construction, so a blob may be read concurrently by the
/// producer and the drain loop without coordination.
#[derive(Clone)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    /// Bytes of this blob.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes. Zero-length blobs are legal and complete without a write.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of live references to the underlying allocation.
    #[cfg(test)]
    pub(crate) fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for Blob {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().into())
    }
}

impl From<String> for Blob {
    fn from(text: String) -> Self {
        Self(text.into_bytes().into())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_allocation() {
        let blob = Blob::from(vec![1u8, 2, 3]);
        assert_eq!(blob.ref_count(), 1);

        let queued = blob.clone();
        assert_eq!(blob.ref_count(), 2);
        assert_eq!(queued.as_bytes(), blob.as_bytes());

        drop(queued);
        assert_eq!(blob.ref_count(), 1);
    }

    #[test]
    fn test_empty_blob() {
        let blob = Blob::from(&b""[..]);
        assert!(blob.is_empty());
        assert_eq!(blob.len(), 0);
    }
}
