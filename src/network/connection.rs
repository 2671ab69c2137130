//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{LogError, Result};
use crate::sync::CancelToken;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the command log engine
    engine: Arc<Engine>,

    /// Fired by the server on shutdown
    cancel: CancelToken,

    /// Largest chunk fed to the engine per receive
    recv_buffer_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(
        stream: TcpStream,
        engine: Arc<Engine>,
        cancel: CancelToken,
        recv_buffer_size: usize,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Accepted sockets may inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            cancel,
            recv_buffer_size: recv_buffer_size.max(1),
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Feeds every received chunk into a private session. Bytes after a
    /// terminator in the same chunk start the next command. Each receive that
    /// completes at least one command is answered with the full log.
    /// An unfinished command is discarded when the client disconnects.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let engine = Arc::clone(&self.engine);
        let terminator = engine.terminator();
        let mut session = engine.session();
        let mut buffer = vec![0u8; self.recv_buffer_size];

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("Closing {} for shutdown", self.peer_addr);
                return Ok(());
            }

            // Receive next chunk
            let received = match self.reader.read(&mut buffer) {
                Ok(0) => {
                    // Client disconnected gracefully
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    // Idle; loop around to check for shutdown
                    continue;
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Connection closed by client {}: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            };

            tracing::trace!("Received {} bytes from {}", received, self.peer_addr);

            // Feed the whole chunk, one command at a time
            let mut chunk = &buffer[..received];
            let mut completed = false;
            while !chunk.is_empty() {
                let consumed = match session.write_interruptible(chunk, &self.cancel) {
                    Ok(n) => n,
                    Err(LogError::Interrupted { .. }) => {
                        tracing::debug!("Write from {} interrupted by shutdown", self.peer_addr);
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!("Error writing command from {}: {}", self.peer_addr, e);
                        return Err(e);
                    }
                };

                if chunk[consumed - 1] == terminator {
                    completed = true;
                }
                chunk = &chunk[consumed..];
            }

            // Reply with the whole log
            if completed {
                if let Err(e) = self.send_log() {
                    return self.finish_send_error(e);
                }
            }
        }
    }

    /// Send the retained log back to the client
    fn send_log(&mut self) -> Result<()> {
        let sent = write_log(&self.engine, &mut self.writer, &self.cancel)?;
        self.writer.flush()?;
        tracing::trace!("Sent {} bytes to {}", sent, self.peer_addr);
        Ok(())
    }

    /// Classify a failed reply: peer hang-ups and shutdown end the connection
    /// quietly, anything else is an error
    fn finish_send_error(&self, e: LogError) -> Result<()> {
        match &e {
            LogError::Interrupted { .. } => return Ok(()),
            LogError::Io(io_err)
                if matches!(
                    io_err.kind(),
                    ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
                ) =>
            {
                tracing::debug!(
                    "Client {} disconnected before the log could be sent: {}",
                    self.peer_addr,
                    e
                );
                return Ok(());
            }
            _ => {}
        }
        tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
        Err(e)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Write one consistent copy of the log into `sink`
///
/// The copy is taken under a single log-lock hold; the sink is written after
/// the lock is released, so commits made meanwhile never tear the reply.
fn write_log<W: Write>(engine: &Engine, sink: &mut W, cancel: &CancelToken) -> Result<usize> {
    let log = engine.snapshot_interruptible(cancel)?;
    sink.write_all(&log)?;
    Ok(log.len())
}
