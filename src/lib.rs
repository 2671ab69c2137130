//! # cmdlog
//!
//! A bounded, in-memory log of terminator-delimited commands with:
//! - Reassembly of commands from arbitrarily fragmented write chunks
//! - Circular retention of the N most recent commands
//! - Byte-offset reads over the oldest-first concatenation of the log
//! - Two independent, interruptible locks (assembler / log)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TCP Server / Device Front End                │
//! │              (write chunks in, offset reads out)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Engine                              │
//! │          write(chunk) → n        read(offset, max) → bytes   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  Entry   ┌─────────────┐
//!   │  Assembler  │ ───────▶ │ CircularLog │
//!   │ (asm lock)  │  (move)  │ (log lock)  │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use cmdlog::Engine;
//!
//! let engine = Engine::with_capacity(3).unwrap();
//! for cmd in ["one\n", "two\n", "three\n", "four\n"] {
//!     engine.write(cmd.as_bytes()).unwrap();
//! }
//!
//! assert_eq!(&engine.read(0, 100).unwrap()[..], b"two\n");
//! assert_eq!(&engine.read(4, 100).unwrap()[..], b"three\n");
//! assert_eq!(&engine.read(10, 100).unwrap()[..], b"four\n");
//! assert!(engine.read(15, 100).unwrap().is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod sync;

pub mod entry;
pub mod assembler;
pub mod circular;
pub mod session;
pub mod engine;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::Config;
pub use engine::{CloseReport, Engine, EngineStats};
pub use entry::Entry;
pub use session::Session;
pub use sync::CancelToken;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cmdlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
