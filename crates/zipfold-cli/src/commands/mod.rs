//! Subcommand implementations.

pub mod completion;
pub mod fixture;
pub mod list;
pub mod process;
pub mod verify;
