//! # hbnb-store
//!
//! Dual-backend object store for the HBnB domain.
//!
//! Users, states, cities, places, reviews and amenities live behind one
//! storage contract with two interchangeable backends, selected once at
//! startup from configuration.
//!
//! ## Features
//!
//! - **Snapshot Storage**: Whole-file JSON snapshot with an in-memory identity map
//! - **`SQLite` Storage**: Typed tables, cascading foreign keys, transactional saves
//! - **Console**: Line-oriented command interpreter over either backend
//!
//! ## Example
//!
//! ```
//! use hbnb_store::core::{ClassTag, Record, model};
//! use hbnb_store::storage::{SqliteStorage, Storage};
//!
//! let mut storage = SqliteStorage::in_memory().unwrap();
//! storage.reload().unwrap();
//!
//! let mut state = Record::new(ClassTag::State);
//! state.set("name", "Texas");
//! model::save(&mut storage, &mut state).unwrap();
//!
//! assert_eq!(storage.count(Some("State")).unwrap(), 1);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{ClassTag, Record};

// Re-export configuration
pub use config::{RelationalConfig, StorageConfig};

// Re-export storage types
pub use storage::{Backend, SnapshotStorage, SqliteStorage, Storage, StorageStats};

// Re-export CLI types
pub use cli::{Cli, Commands, Console, OutputFormat};
