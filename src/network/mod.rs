//! Network Module
//!
//! TCP front end that exposes one engine to many clients.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking listener, polled)
//! - One thread per connection, each writing through its own session
//! - Optional ticker thread appending timestamp commands
//! - After every completed command, the client receives the whole log

mod connection;
mod server;
mod ticker;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
pub use ticker::{format_timestamp, TimestampTicker};
