//! Storage trait definition.
//!
//! Defines the contract shared by the snapshot and relational backends.
//! Callers (the console, the model lifecycle) see only this trait, so the
//! backend chosen at startup is invisible to them.

use crate::core::Record;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which backend implements a [`Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Whole-file JSON snapshot.
    Snapshot,
    /// `SQLite` tables with foreign keys.
    Relational,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => f.write_str("snapshot"),
            Self::Relational => f.write_str("relational"),
        }
    }
}

/// Trait for persistent storage backends.
///
/// Class tags are taken as strings: an unrecognized tag is simply a class
/// with no records, never an error. The store is meant for a single caller
/// at a time and does no internal locking.
pub trait Storage {
    /// Returns every live record keyed by identity key, optionally only
    /// those of one class.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing medium fails.
    fn all(&self, class: Option<&str>) -> Result<BTreeMap<String, Record>>;

    /// Looks up one record.
    ///
    /// Returns `None` if it does not exist or the class is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing medium fails.
    fn get(&self, class: &str, id: &str) -> Result<Option<Record>>;

    /// Counts records of one class, or of all classes.
    ///
    /// Always equal to `self.all(class)?.len()`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing medium fails.
    fn count(&self, class: Option<&str>) -> Result<usize>;

    /// Registers a record as pending persistence.
    ///
    /// A record with the same identity key replaces the pending entry.
    /// Performs no I/O.
    fn new(&mut self, record: Record);

    /// Durably persists all pending state.
    ///
    /// Either every pending change becomes visible or none does.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails; prior durable state is kept.
    fn save(&mut self) -> Result<()>;

    /// Removes a record from the live index.
    ///
    /// The snapshot backend rewrites its file immediately, the relational
    /// backend only stages the removal. Callers follow with [`save`] on
    /// either backend.
    ///
    /// [`save`]: Storage::save
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot rewrite fails.
    fn delete(&mut self, record: &Record) -> Result<()>;

    /// (Re)initializes the live index from the backing medium.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreadable or corrupt; the live
    /// index is then left as it was.
    fn reload(&mut self) -> Result<()>;

    /// Releases backend resources. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the resource fails.
    fn close(&mut self) -> Result<()>;

    /// Returns which backend this is.
    fn backend(&self) -> Backend;
}

/// Per-class record counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// Active backend.
    pub backend: Option<Backend>,
    /// Count per class tag, in registry order.
    pub counts: Vec<(String, usize)>,
    /// Total number of records.
    pub total: usize,
}

impl StorageStats {
    /// Gathers counts from any store.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn collect(storage: &dyn Storage) -> Result<Self> {
        let mut counts = Vec::new();
        for tag in crate::core::ClassTag::ALL {
            counts.push((tag.as_str().to_string(), storage.count(Some(tag.as_str()))?));
        }
        Ok(Self {
            backend: Some(storage.backend()),
            counts,
            total: storage.count(None)?,
        })
    }
}
