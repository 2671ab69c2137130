//! Writer sessions
//!
//! A [`Session`] is a producer with its own reassembly state. Sessions write
//! into the same circular log as the engine-wide write path, but their
//! unfinished commands are private: two sessions interleaving unterminated
//! chunks never corrupt each other's commands.

use crate::assembler::{Assembler, Feed};
use crate::engine::Engine;
use crate::error::Result;
use crate::sync::CancelToken;

/// Writer handle with private reassembly state
pub struct Session<'a> {
    engine: &'a Engine,
    assembler: Assembler,
}

impl<'a> Session<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            assembler: Assembler::new(engine.terminator()),
        }
    }

    /// Write one chunk; same contract as [`Engine::write`]
    pub fn write(&mut self, chunk: &[u8]) -> Result<usize> {
        self.write_interruptible(chunk, &CancelToken::new())
    }

    /// Write one chunk, giving up on the log lock wait once `cancel` fires
    ///
    /// After `Interrupted` the identical chunk may be resubmitted.
    pub fn write_interruptible(&mut self, chunk: &[u8], cancel: &CancelToken) -> Result<usize> {
        let feed = self.assembler.feed(chunk)?;
        let queued = feed.queued();

        if let Feed::Completed { entry, .. } = feed {
            if let Err(rejected) = self.engine.commit(entry, cancel) {
                self.assembler.restore(rejected.entry, queued);
                return Err(rejected.error);
            }
        }

        Ok(queued)
    }

    /// Bytes of this session's unfinished command
    pub fn pending_bytes(&self) -> usize {
        self.assembler.pending_bytes()
    }

    /// Drop this session's unfinished command, returning its length
    pub fn discard(&mut self) -> usize {
        self.assembler.clear()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let discarded = self.assembler.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "session closed with unfinished command");
        }
    }
}
