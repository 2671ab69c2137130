//! Assembler Module
//!
//! Reassembles commands from arbitrarily fragmented write chunks.
//!
//! ## Responsibilities
//! - Queue incoming chunks in arrival order until one ends a command
//! - Truncate a chunk at its first terminator (trailing bytes are dropped)
//! - Concatenate the queued fragments into one [`Entry`](crate::entry::Entry)
//! - Fail atomically on allocation failure
//!
//! ## Example
//! ```text
//!   feed("hel")      → Pending   queue: ["hel"]            total: 3
//!   feed("lo\nxx")   → Completed entry: "hello\n"          total: 0
//!                                 ("xx" discarded)
//! ```

mod fragment;
mod reassembly;

pub use fragment::PendingFragment;
pub use reassembly::Assembler;

use crate::entry::Entry;

/// Outcome of feeding one chunk
#[derive(Debug, PartialEq, Eq)]
pub enum Feed {
    /// The chunk was queued; the command is still incomplete
    Pending {
        /// Bytes of the chunk that were queued
        queued: usize,
    },

    /// The chunk ended a command
    Completed {
        /// The whole command, terminator included
        entry: Entry,

        /// Bytes of the chunk that were consumed (through the terminator)
        queued: usize,
    },
}

impl Feed {
    /// Number of input bytes this feed consumed
    pub fn queued(&self) -> usize {
        match self {
            Feed::Pending { queued } | Feed::Completed { queued, .. } => *queued,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Feed::Completed { .. })
    }

    /// Take the completed entry, if any
    pub fn into_entry(self) -> Option<Entry> {
        match self {
            Feed::Completed { entry, .. } => Some(entry),
            Feed::Pending { .. } => None,
        }
    }
}
