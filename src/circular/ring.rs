//! CircularLog implementation
//!
//! Boxed slot array plus a write cursor and a full flag.

use crate::entry::Entry;
use crate::error::{LogError, Result};

use super::Iter;

/// Bounded log of completed commands
///
/// ## Invariants
/// - Exactly `if is_full { N } else { write_cursor }` slots are occupied
/// - The occupied slots hold the N (or fewer) most recent entries
/// - The oldest entry sits at `write_cursor` when full, at slot 0 otherwise
/// - Entries are inserted whole and never edited in place
#[derive(Debug)]
pub struct CircularLog {
    /// Fixed-size slot array (length N)
    slots: Box<[Option<Entry>]>,

    /// Slot that receives the next insert
    write_cursor: usize,

    /// Set once the cursor has wrapped
    is_full: bool,
}

impl CircularLog {
    /// Create an empty log retaining up to `capacity` entries
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LogError::Config(
                "circular log capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            write_cursor: 0,
            is_full: false,
        })
    }

    /// Insert an entry, returning the evicted oldest entry if the log was full
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        let evicted = self.slots[self.write_cursor].replace(entry);

        self.write_cursor = (self.write_cursor + 1) % self.slots.len();
        if self.write_cursor == 0 {
            self.is_full = true;
        }

        evicted
    }

    /// Locate the entry containing stream offset `offset`
    ///
    /// The stream is every retained entry concatenated oldest first, starting
    /// at 0. Returns the entry and the offset inside it, or `None` when
    /// `offset` is at or past the end of the stream.
    pub fn resolve(&self, offset: usize) -> Option<(&Entry, usize)> {
        let mut running = 0usize;

        for entry in self.iter() {
            let end = running + entry.len();
            if offset < end {
                return Some((entry, offset - running));
            }
            running = end;
        }

        None
    }

    /// Retained entries, oldest first
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.slots, self.oldest_index(), self.len())
    }

    /// Oldest retained entry
    pub fn oldest(&self) -> Option<&Entry> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.oldest_index()].as_ref()
    }

    /// Most recently inserted entry
    pub fn newest(&self) -> Option<&Entry> {
        if self.is_empty() {
            return None;
        }
        let capacity = self.slots.len();
        self.slots[(self.write_cursor + capacity - 1) % capacity].as_ref()
    }

    /// Remove every entry (oldest first) and reset the ring
    pub fn drain(&mut self) -> Vec<Entry> {
        let start = self.oldest_index();
        let len = self.len();
        let capacity = self.slots.len();

        let drained = (0..len)
            .filter_map(|i| self.slots[(start + i) % capacity].take())
            .collect();

        self.write_cursor = 0;
        self.is_full = false;
        drained
    }

    /// Maximum number of retained entries (N)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        if self.is_full {
            self.slots.len()
        } else {
            self.write_cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the next insert will evict
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// Length of the retained byte stream
    pub fn total_bytes(&self) -> usize {
        self.iter().map(Entry::len).sum()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Slot index of the oldest entry; recomputed from the current state on
    /// every call
    fn oldest_index(&self) -> usize {
        if self.is_full {
            self.write_cursor
        } else {
            0
        }
    }
}
