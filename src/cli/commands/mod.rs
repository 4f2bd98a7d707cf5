//! Command implementations for the standoff CLI
//!
//! Each command has its own module/file.

pub mod check;
pub mod convert;

pub use check::{cmd_check, CheckArgs};
pub use convert::{cmd_convert, ConvertArgs};
