//! I/O utilities for hbnb-store.
//!
//! Whole-file reads and atomic whole-file replacement for the snapshot
//! backend.

pub mod reader;

pub use reader::{read_file_if_exists, write_atomic};
