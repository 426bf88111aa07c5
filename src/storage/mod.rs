//! Storage layer for hbnb-store.
//!
//! One contract ([`Storage`]), two backends: a JSON snapshot with an
//! in-memory identity map, and `SQLite` tables with cascading foreign keys.
//! [`open`] picks one from configuration at startup.

pub mod facade;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use facade::open;
pub use snapshot::SnapshotStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Backend, Storage, StorageStats};
