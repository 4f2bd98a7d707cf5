//! CLI modules for the `standoff` binary.
//!
//! Kept in the library (behind the `cli` feature) so the commands can be
//! tested without spawning a process.

pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;
