//! CLI module for the Ronzz deployment tool.
//!
//! This module provides the command-line interface for previewing,
//! applying and destroying a deployment.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
