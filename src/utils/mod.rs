//! Generic utility primitives with zero domain knowledge.
//!
//! - `io` - File reads with consistent error handling
//! - `shell` - Shell quoting and command-line rendering

pub mod io;
pub mod shell;
