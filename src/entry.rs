//! Entry definitions
//!
//! An [`Entry`] is the stored, immutable buffer for one completed command.
//! Entries are moved, never copied: the assembler hands one to the engine,
//! the engine moves it into a log slot, and eviction moves it back out to be
//! dropped.

use std::ops::Range;

use bytes::Bytes;

use crate::error::{LogError, Result};

/// Allocate an empty buffer able to hold `capacity` bytes, reporting
/// allocation failure instead of aborting.
pub(crate) fn try_alloc(capacity: usize) -> Result<Vec<u8>> {
    #[cfg(test)]
    if alloc_limit::exceeded(capacity) {
        return Err(LogError::OutOfMemory { requested: capacity });
    }

    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| LogError::OutOfMemory { requested: capacity })?;
    Ok(buf)
}


/// One completed command
#[derive(Debug, PartialEq, Eq)]
pub struct Entry {
    data: Bytes,
}

impl Entry {
    /// Wrap already-owned bytes as an entry
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the command bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Cheap, reference-counted view of part of the entry
    pub fn slice(&self, range: Range<usize>) -> Bytes {
        self.data.slice(range)
    }

    /// Whether the last byte is `terminator`
    pub fn ends_with(&self, terminator: u8) -> bool {
        self.data.last() == Some(&terminator)
    }

    /// Give up the entry, keeping its bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Vec<u8>> for Entry {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&'static [u8]> for Entry {
    fn from(data: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(data))
    }
}
