//! Tooling
//!
//! Inspection CLI over the course tree.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, ConfigCommands};
