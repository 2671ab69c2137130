//! Assembler implementation
//!
//! VecDeque-based fragment queue with a running byte total.

use std::collections::VecDeque;

use crate::entry::{try_alloc, Entry};
use crate::error::Result;

use super::{Feed, PendingFragment};

/// Accumulates write chunks until a command is terminated
///
/// ## Invariants
/// - The in-order concatenation of `fragments` is the unfinished command
/// - `total_pending_bytes == Σ fragment.len()`
/// - No queued fragment ends with the terminator
#[derive(Debug)]
pub struct Assembler {
    /// Byte that ends a command
    terminator: u8,

    /// Fragments of the unfinished command, oldest first
    fragments: VecDeque<PendingFragment>,

    /// Sum of fragment lengths
    total_pending_bytes: usize,
}

impl Assembler {
    /// Create an empty assembler
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            fragments: VecDeque::new(),
            total_pending_bytes: 0,
        }
    }

    /// Feed one chunk
    ///
    /// Only bytes up to and including the first terminator are queued; the
    /// rest of the chunk is dropped. If the queued part ends the command, the
    /// queue is collapsed into a new [`Entry`].
    ///
    /// On `OutOfMemory` nothing from this chunk is kept and the queue is left
    /// exactly as it was.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Feed> {
        if chunk.is_empty() {
            return Ok(Feed::Pending { queued: 0 });
        }

        let accepted = self.accepted_prefix(chunk);
        if accepted.len() < chunk.len() {
            tracing::trace!(
                dropped = chunk.len() - accepted.len(),
                "chunk truncated at terminator"
            );
        }

        // Step 1: Copy the chunk (nothing is queued yet if this fails)
        let fragment = PendingFragment::copy_from(accepted)?;
        let queued = fragment.len();

        if !fragment.ends_with(self.terminator) {
            self.total_pending_bytes += queued;
            self.fragments.push_back(fragment);
            return Ok(Feed::Pending { queued });
        }

        // Step 2: Reserve the whole command before touching the queue
        let total = self.total_pending_bytes + queued;
        let mut command = try_alloc(total)?;

        // Step 3: Queue the final fragment and collapse everything
        self.fragments.push_back(fragment);
        for fragment in self.fragments.drain(..) {
            command.extend_from_slice(fragment.as_bytes());
        }
        self.total_pending_bytes = 0;

        debug_assert_eq!(command.len(), total);
        Ok(Feed::Completed {
            entry: Entry::new(command),
            queued,
        })
    }

    /// Put a completed command back as pending, minus its final `tail_len`
    /// bytes.
    ///
    /// Used when a completed entry could not be committed: the caller gets an
    /// error and resubmits its last chunk, which completes the same command
    /// again.
    pub(crate) fn restore(&mut self, entry: Entry, tail_len: usize) {
        let prefix_len = entry.len().saturating_sub(tail_len);
        if prefix_len == 0 {
            return;
        }

        let prefix = entry.into_bytes().slice(..prefix_len);
        self.fragments.push_front(PendingFragment::from_bytes(prefix));
        self.total_pending_bytes += prefix_len;
    }

    /// Drop every queued fragment, returning the number of bytes discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.total_pending_bytes;
        self.fragments.clear();
        self.total_pending_bytes = 0;
        discarded
    }

    /// Bytes of the unfinished command
    pub fn pending_bytes(&self) -> usize {
        self.total_pending_bytes
    }

    /// Number of queued fragments
    pub fn pending_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// True when no command is in progress
    pub fn is_idle(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The part of `chunk` that belongs to the current command
    fn accepted_prefix<'c>(&self, chunk: &'c [u8]) -> &'c [u8] {
        match chunk.iter().position(|&b| b == self.terminator) {
            Some(pos) => &chunk[..=pos],
            None => chunk,
        }
    }
}
