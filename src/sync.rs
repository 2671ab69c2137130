//! Interruptible locking
//!
//! Callers of the engine may block on a lock. A blocked caller must be able
//! to give up when asked to, failing with [`LogError::Interrupted`] instead of
//! waiting forever. A [`CancelToken`] carries that request; an
//! [`InterruptibleMutex`] waits in short timed slices and checks the token
//! between them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{LogError, Result};

/// Shared cancellation flag
///
/// Clones observe the same flag. A fresh token is never cancelled until
/// someone calls [`CancelToken::cancel`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every waiter holding this token to give up
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the token can be reused
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Mutex whose lock wait can be aborted through a [`CancelToken`]
pub(crate) struct InterruptibleMutex<T> {
    inner: Mutex<T>,
    name: &'static str,
    poll: Duration,
}

impl<T> InterruptibleMutex<T> {
    pub(crate) fn new(value: T, name: &'static str, poll: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            name,
            poll,
        }
    }

    /// Acquire the lock, or fail with `Interrupted` once `cancel` fires.
    ///
    /// An uncontended lock is taken even if the token is already cancelled.
    pub(crate) fn lock(&self, cancel: &CancelToken) -> Result<MutexGuard<'_, T>> {
        if let Some(guard) = self.inner.try_lock() {
            return Ok(guard);
        }

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(lock = self.name, "lock wait interrupted");
                return Err(LogError::Interrupted { lock: self.name });
            }
            if let Some(guard) = self.inner.try_lock_for(self.poll) {
                return Ok(guard);
            }
        }
    }

    /// Acquire the lock without a way out; for short bookkeeping paths only
    pub(crate) fn lock_uninterruptible(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    pub(crate) fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
