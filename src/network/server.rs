//! TCP Server
//!
//! Accepts connections and dispatches each to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{LogError, Result};
use crate::sync::CancelToken;

use super::{Connection, TimestampTicker};

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    cancel: CancelToken,
}

impl ShutdownHandle {
    /// Signal the server to shut down; blocked connection threads give up
    /// their lock waits
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// TCP server for cmdlog
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    cancel: CancelToken,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            LogError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
            cancel: self.cancel.clone(),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// Start the server (blocking until shutdown)
    ///
    /// On return every connection thread and the ticker have exited.
    pub fn run(&mut self) -> Result<()> {
        // Start the timestamp ticker, stopped by dropping `stop_tx`
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = match self.config.timestamp_interval_ms {
            Some(ms) => Some(TimestampTicker::spawn(
                Arc::clone(&self.engine),
                Duration::from_millis(ms),
                stop_rx,
            )?),
            None => None,
        };

        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Some(worker) = self.dispatch(stream, addr) {
                        workers.push(worker);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }

            // Reap finished connection threads
            workers.retain(|w| !w.is_finished());
        }

        tracing::info!("Shutting down, waiting for {} connections", workers.len());

        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("Connection thread panicked");
            }
        }

        drop(stop_tx);
        if let Some(ticker) = ticker {
            ticker.join();
        }

        Ok(())
    }

    /// Spawn a connection thread, or refuse the client when at capacity
    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) -> Option<JoinHandle<()>> {
        if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections already active",
                addr,
                self.config.max_connections
            );
            return None;
        }

        let mut connection = match Connection::new(
            stream,
            Arc::clone(&self.engine),
            self.cancel.clone(),
            self.config.recv_buffer_size,
        ) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                return None;
            }
        };

        if let Err(e) =
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)
        {
            tracing::warn!("Failed to set timeouts for {}: {}", addr, e);
            return None;
        }

        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("cmdlog-conn-{}", addr))
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::warn!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Failed to spawn connection thread for {}: {}", addr, e);
                self.active.fetch_sub(1, Ordering::SeqCst);
                None
            }
        }
    }
}
