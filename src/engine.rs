//! Engine Module
//!
//! The command log engine that coordinates reassembly and retention.
//!
//! ## Responsibilities
//! - Feed write chunks through the shared assembler
//! - Commit completed commands into the circular log
//! - Serve offset reads that never cross an entry boundary
//! - Keep lock hold times short and lock ordering acyclic

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::assembler::{Assembler, Feed};
use crate::circular::CircularLog;
use crate::config::Config;
use crate::entry::Entry;
use crate::error::{LogError, Result};
use crate::session::Session;
use crate::sync::{CancelToken, InterruptibleMutex};

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Maximum number of retained commands
    pub capacity: usize,

    /// Commands currently retained
    pub retained_entries: usize,

    /// Bytes currently readable
    pub retained_bytes: usize,

    /// Bytes of the unfinished command in the shared assembler
    pub pending_bytes: usize,

    /// Commands committed since the engine was created
    pub commands_committed: u64,

    /// Entries evicted since the engine was created
    pub entries_evicted: u64,
}

/// What [`Engine::close`] released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// Retained entries dropped
    pub entries_released: usize,

    /// Bytes of an unfinished command dropped
    pub pending_bytes_discarded: usize,
}

/// A completed entry that could not be committed
pub(crate) struct Rejected {
    pub(crate) entry: Entry,
    pub(crate) error: LogError,
}

/// The command log engine
///
/// ## Concurrency Model: two independent locks
///
/// - **assembler lock**: guards the shared fragment queue
/// - **log lock**: guards the circular log (inserts and reads are mutually
///   exclusive)
///
/// No call path holds both. `write` releases the assembler lock before
/// taking the log lock, and drops an evicted entry only after releasing the
/// log lock. `read` takes only the log lock.
///
/// Every lock wait is interruptible through a [`CancelToken`]; an aborted
/// wait fails with [`LogError::Interrupted`] and records nothing.
///
/// ## Known limitation
/// The engine-wide `write` path shares one fragment queue between all
/// callers. Producers that interleave unterminated chunks through it get
/// their fragments mixed into one command. Producers that need isolation
/// should write through a [`Session`].
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Shared reassembly state
    assembler: InterruptibleMutex<Assembler>,

    /// Retained commands
    log: InterruptibleMutex<CircularLog>,

    /// Commands committed (any writer)
    commands_committed: AtomicU64,

    /// Entries evicted by commits
    entries_evicted: AtomicU64,
}

impl Engine {
    const ASSEMBLER_LOCK: &'static str = "assembler";
    const LOG_LOCK: &'static str = "log";

    /// Create an engine with the given config
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let poll = Duration::from_millis(config.lock_poll_ms);
        let assembler = Assembler::new(config.terminator);
        let log = CircularLog::new(config.capacity)?;

        tracing::debug!(
            capacity = config.capacity,
            terminator = config.terminator,
            "engine created"
        );

        Ok(Self {
            assembler: InterruptibleMutex::new(assembler, Self::ASSEMBLER_LOCK, poll),
            log: InterruptibleMutex::new(log, Self::LOG_LOCK, poll),
            commands_committed: AtomicU64::new(0),
            entries_evicted: AtomicU64::new(0),
            config,
        })
    }

    /// Create an engine with default settings and the given capacity
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(Config::builder().capacity(capacity).build())
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Write one chunk through the shared assembler
    ///
    /// Returns the number of bytes consumed: the whole chunk, or the part up
    /// to and including its first terminator. Whether the chunk completed a
    /// command is not reported.
    pub fn write(&self, chunk: &[u8]) -> Result<usize> {
        self.write_interruptible(chunk, &CancelToken::new())
    }

    /// [`write`](Self::write) with lock waits that give up once `cancel`
    /// fires
    ///
    /// After `Interrupted` the identical chunk may be resubmitted.
    pub fn write_interruptible(&self, chunk: &[u8], cancel: &CancelToken) -> Result<usize> {
        // Step 1: Feed the assembler (assembler lock only)
        let feed = {
            let mut assembler = self.assembler.lock(cancel)?;
            assembler.feed(chunk)?
        };

        let queued = feed.queued();
        tracing::trace!(queued, completed = feed.is_completed(), "chunk written");

        // Step 2: Commit a completed command (log lock only)
        if let Feed::Completed { entry, .. } = feed {
            if let Err(rejected) = self.commit(entry, cancel) {
                // Undo the completion so a resubmitted chunk rebuilds it
                self.assembler
                    .lock_uninterruptible()
                    .restore(rejected.entry, queued);
                return Err(rejected.error);
            }
        }

        Ok(queued)
    }

    /// Open a writer session with private reassembly state
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }

    /// Move a completed entry into the log
    ///
    /// The evicted entry (if any) is dropped after the log lock is released.
    pub(crate) fn commit(&self, entry: Entry, cancel: &CancelToken) -> std::result::Result<(), Rejected> {
        let len = entry.len();

        let evicted = match self.log.lock(cancel) {
            Ok(mut log) => log.insert(entry),
            Err(error) => return Err(Rejected { entry, error }),
        };

        self.commands_committed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(len, "command committed");

        if let Some(evicted) = evicted {
            self.entries_evicted.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(evicted_len = evicted.len(), "oldest command evicted");
            drop(evicted);
        }

        Ok(())
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Read up to `max_len` bytes starting at stream offset `offset`
    ///
    /// Bytes come from a single entry; continue with `offset + n` to move
    /// into the next one. An empty result means end of stream.
    pub fn read(&self, offset: usize, max_len: usize) -> Result<Bytes> {
        self.read_interruptible(offset, max_len, &CancelToken::new())
    }

    /// [`read`](Self::read) with a lock wait that gives up once `cancel`
    /// fires
    pub fn read_interruptible(
        &self,
        offset: usize,
        max_len: usize,
        cancel: &CancelToken,
    ) -> Result<Bytes> {
        let log = self.log.lock(cancel)?;

        let Some((entry, intra)) = log.resolve(offset) else {
            tracing::trace!(offset, "end of stream");
            return Ok(Bytes::new());
        };

        let n = max_len.min(entry.len() - intra);
        tracing::trace!(offset, intra, n, "read");
        Ok(entry.slice(intra..intra + n))
    }

    /// Read like [`read_interruptible`](Self::read_interruptible), copying the
    /// bytes into `sink`
    ///
    /// The copy happens after the log lock is released. A sink failure is
    /// reported as `CopyFault`. Returns the number of bytes copied; 0 means
    /// end of stream.
    pub fn read_into<W: Write>(
        &self,
        offset: usize,
        max_len: usize,
        sink: &mut W,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let bytes = self.read_interruptible(offset, max_len, cancel)?;
        if bytes.is_empty() {
            return Ok(0);
        }

        sink.write_all(&bytes)
            .map_err(|e| LogError::CopyFault(format!("offset {}: {}", offset, e)))?;
        Ok(bytes.len())
    }

    /// Copy the whole retained stream into `sink`, one entry per read
    ///
    /// Concurrent commits may evict entries between reads; the copy follows
    /// offsets, not entries, so it can start mid-command. Use
    /// [`snapshot_interruptible`](Self::snapshot_interruptible) when the
    /// output must be one consistent state of the log.
    pub fn copy_to<W: Write>(&self, sink: &mut W, cancel: &CancelToken) -> Result<usize> {
        let mut offset = 0;
        loop {
            let n = self.read_into(offset, usize::MAX, sink, cancel)?;
            if n == 0 {
                return Ok(offset);
            }
            offset += n;
        }
    }

    /// Consistent copy of the retained stream taken under one log-lock hold
    pub fn snapshot(&self) -> Bytes {
        Self::concat_log(&self.log.lock_uninterruptible())
    }

    /// [`snapshot`](Self::snapshot) with a lock wait that gives up once
    /// `cancel` fires
    pub fn snapshot_interruptible(&self, cancel: &CancelToken) -> Result<Bytes> {
        let log = self.log.lock(cancel)?;
        Ok(Self::concat_log(&log))
    }

    fn concat_log(log: &CircularLog) -> Bytes {
        let mut out = BytesMut::with_capacity(log.total_bytes());
        for entry in log.iter() {
            out.extend_from_slice(entry.as_bytes());
        }
        out.freeze()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear the engine down, releasing every entry and pending fragment
    pub fn close(self) -> CloseReport {
        let pending_bytes_discarded = self.assembler.into_inner().clear();
        let entries_released = self.log.into_inner().drain().len();

        tracing::debug!(
            entries_released,
            pending_bytes_discarded,
            "engine closed"
        );

        CloseReport {
            entries_released,
            pending_bytes_discarded,
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Gather counters; takes each lock in turn, never both
    pub fn stats(&self) -> EngineStats {
        let pending_bytes = self.assembler.lock_uninterruptible().pending_bytes();

        let (retained_entries, retained_bytes) = {
            let log = self.log.lock_uninterruptible();
            (log.len(), log.total_bytes())
        };

        EngineStats {
            capacity: self.config.capacity,
            retained_entries,
            retained_bytes,
            pending_bytes,
            commands_committed: self.commands_committed.load(Ordering::Relaxed),
            entries_evicted: self.entries_evicted.load(Ordering::Relaxed),
        }
    }

    /// Maximum number of retained commands
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Byte that ends a command
    pub fn terminator(&self) -> u8 {
        self.config.terminator
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
