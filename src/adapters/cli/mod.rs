//! CLI Adapter
//!
//! Command-line interface for the listing sniper. Uses clap derive macros
//! for argument parsing.

mod commands;

pub use commands::{CliApp, Command, QuoteCmd, RunCmd, StatusCmd};
