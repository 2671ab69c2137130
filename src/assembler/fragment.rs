//! Pending fragment
//!
//! One queued piece of a command that has not been terminated yet.

use bytes::Bytes;

use crate::entry::try_alloc;
use crate::error::Result;

/// A chunk (or a truncated chunk) waiting for the rest of its command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFragment {
    data: Bytes,
}

impl PendingFragment {
    /// Copy a caller chunk into a freshly allocated fragment
    pub fn copy_from(chunk: &[u8]) -> Result<Self> {
        let mut data = try_alloc(chunk.len())?;
        data.extend_from_slice(chunk);
        Ok(Self { data: data.into() })
    }

    /// Adopt bytes that are already owned (no copy)
    pub(crate) fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn ends_with(&self, terminator: u8) -> bool {
        self.data.last() == Some(&terminator)
    }
}
