//! Command-line interface components
//!
//! This module contains CLI-specific code for the SQLite loader, including
//! argument parsing, command handlers and transfer progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    ClearArgs, Cli, Commands, GlobalArgs, LoadArgs, QueryArgs, SourceArgs, StatusArgs,
};
pub use commands::{
    build_loader, format_table, handle_clear, handle_load, handle_query, handle_status,
    CommandContext,
};
pub use progress::ProgressDisplay;
