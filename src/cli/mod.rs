//! CLI layer for hbnb-store.
//!
//! Provides the command-line interface using clap, with the line-oriented
//! console as the default command.

pub mod commands;
pub mod console;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use console::{Console, Flow};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
