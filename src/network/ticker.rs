//! Timestamp Ticker
//!
//! Appends a `timestamp:<date>` command to the log at a fixed interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use crossbeam::channel::{self, Receiver};

use crate::engine::Engine;
use crate::error::Result;

/// Render one timestamp command (RFC 2822 style, terminated)
pub fn format_timestamp<Tz>(now: &DateTime<Tz>, terminator: u8) -> Vec<u8>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut line = now
        .format("timestamp:%a, %d %b %Y %H:%M:%S %z")
        .to_string()
        .into_bytes();
    line.push(terminator);
    line
}

/// Background thread writing timestamp commands
pub struct TimestampTicker {
    handle: JoinHandle<()>,
}

impl TimestampTicker {
    /// Start ticking; one timestamp is written immediately, then one per
    /// `interval`. The thread exits once `stop` is disconnected or receives a
    /// message.
    pub fn spawn(engine: Arc<Engine>, interval: Duration, stop: Receiver<()>) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("cmdlog-ticker".to_string())
            .spawn(move || Self::run(&engine, interval, &stop))?;

        Ok(Self { handle })
    }

    /// Wait for the ticker thread to exit
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::warn!("Timestamp ticker panicked");
        }
    }

    fn run(engine: &Engine, interval: Duration, stop: &Receiver<()>) {
        let ticks = channel::tick(interval);
        let mut session = engine.session();

        Self::write_timestamp(&mut session, engine.terminator());
        loop {
            crossbeam::select! {
                recv(ticks) -> _ => Self::write_timestamp(&mut session, engine.terminator()),
                recv(stop) -> _ => break,
            }
        }

        tracing::debug!("Timestamp ticker stopped");
    }

    fn write_timestamp(session: &mut crate::session::Session<'_>, terminator: u8) {
        let line = format_timestamp(&Local::now(), terminator);
        match session.write(&line) {
            Ok(_) => tracing::trace!("Timestamp written"),
            Err(e) => tracing::warn!("Failed to write timestamp: {}", e),
        }
    }
}
