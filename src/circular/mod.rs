//! Circular Log Module
//!
//! Fixed-capacity ring of completed commands.
//!
//! ## Responsibilities
//! - Retain the N most recent entries, evicting the oldest on overflow
//! - Present retained entries as one oldest-first byte stream
//! - Translate a stream offset into `(entry, offset within entry)`
//!
//! ## Layout
//! ```text
//!  not full (cursor = 2)          full (cursor = 1, N = 3)
//!  ┌─────┬─────┬─────┐            ┌─────┬─────┬─────┐
//!  │  A  │  B  │  -  │            │  D  │  B  │  C  │
//!  └─────┴─────┴─────┘            └─────┴─────┴─────┘
//!   oldest      ↑cursor                  ↑cursor = oldest
//!
//!  stream: A B                     stream: B C D
//! ```

mod iter;
mod ring;

pub use iter::Iter;
pub use ring::CircularLog;
