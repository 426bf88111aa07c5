//! Backend selection.
//!
//! Builds the one store a process uses. The returned box is handed to the
//! console and the model functions explicitly; nothing here is global.

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::snapshot::SnapshotStorage;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::Storage;

/// Builds the configured backend and loads it.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, or if the initial
/// reload fails (unreadable snapshot, schema creation failure).
///
/// # Examples
///
/// ```no_run
/// use hbnb_store::config::StorageConfig;
/// use hbnb_store::storage;
///
/// let config = StorageConfig::from_env().unwrap();
/// let store = storage::open(&config).unwrap();
/// println!("{} records", store.count(None).unwrap());
/// ```
pub fn open(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    let mut storage: Box<dyn Storage> = match config {
        StorageConfig::Snapshot { path } => {
            tracing::info!(path = %path.display(), "using snapshot storage");
            Box::new(SnapshotStorage::new(path))
        }
        StorageConfig::Relational(relational) => {
            tracing::info!(database = %relational.database, "using relational storage");
            Box::new(SqliteStorage::from_config(relational)?)
        }
    };
    storage.reload()?;
    Ok(storage)
}
