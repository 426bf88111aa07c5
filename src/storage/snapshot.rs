//! JSON snapshot storage implementation.
//!
//! Keeps every live record in an in-memory identity map and writes the
//! whole map to one JSON document on each save. The document's top-level
//! keys are identity keys; each value is the record's `to_dict(true)` form.

use crate::core::{ClassTag, Record};
use crate::error::{Result, StorageError};
use crate::io::{read_file_if_exists, write_atomic};
use crate::storage::traits::{Backend, Storage};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File-backed storage with an in-memory identity map.
///
/// # Examples
///
/// ```no_run
/// use hbnb_store::storage::{SnapshotStorage, Storage};
///
/// let mut storage = SnapshotStorage::new("file.json");
/// storage.reload().unwrap();
/// ```
pub struct SnapshotStorage {
    /// Identity key -> record.
    objects: BTreeMap<String, Record>,
    /// Backing document.
    path: PathBuf,
}

impl SnapshotStorage {
    /// Creates an empty store bound to `path`. Nothing is read until
    /// [`reload`](Storage::reload).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            objects: BTreeMap::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the identity map to the on-disk document.
    fn serialize(&self) -> Result<String> {
        let document: Map<String, Value> = self
            .objects
            .iter()
            .map(|(key, record)| (key.clone(), Value::Object(record.to_dict(true))))
            .collect();
        Ok(serde_json::to_string(&document)?)
    }

    /// Parses a document into a complete identity map.
    ///
    /// Fails as a whole on the first bad entry.
    fn deserialize(&self, content: &str) -> Result<BTreeMap<String, Record>> {
        let corrupt = |reason: String| StorageError::CorruptSnapshot {
            path: self.path.to_string_lossy().to_string(),
            reason,
        };

        let document: Value = serde_json::from_str(content).map_err(|e| corrupt(e.to_string()))?;
        let Value::Object(entries) = document else {
            return Err(corrupt("top level is not an object".to_string()).into());
        };

        let mut objects = BTreeMap::new();
        for (key, entry) in entries {
            let Value::Object(dict) = entry else {
                return Err(corrupt(format!("entry {key} is not an object")).into());
            };
            let record = Record::from_dict(&dict).map_err(|e| corrupt(format!("entry {key}: {e}")))?;
            let identity = record.identity_key();
            if identity != key {
                tracing::warn!(file_key = %key, %identity, "snapshot key does not match record");
            }
            objects.insert(identity, record);
        }

        Ok(objects)
    }
}

impl Storage for SnapshotStorage {
    fn all(&self, class: Option<&str>) -> Result<BTreeMap<String, Record>> {
        let Some(tag) = class else {
            return Ok(self.objects.clone());
        };
        let Some(tag) = ClassTag::parse(tag) else {
            return Ok(BTreeMap::new());
        };
        Ok(self
            .objects
            .iter()
            .filter(|(_, record)| record.class == tag)
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }

    fn get(&self, class: &str, id: &str) -> Result<Option<Record>> {
        let Some(tag) = ClassTag::parse(class) else {
            return Ok(None);
        };
        Ok(self.objects.get(&format!("{tag}.{id}")).cloned())
    }

    fn count(&self, class: Option<&str>) -> Result<usize> {
        match class {
            None => Ok(self.objects.len()),
            Some(tag) => match ClassTag::parse(tag) {
                Some(tag) => Ok(self.objects.values().filter(|r| r.class == tag).count()),
                None => Ok(0),
            },
        }
    }

    fn new(&mut self, record: Record) {
        tracing::debug!(key = %record.identity_key(), "registering record");
        self.objects.insert(record.identity_key(), record);
    }

    fn save(&mut self) -> Result<()> {
        let content = self.serialize()?;
        write_atomic(&self.path, &content)?;
        tracing::debug!(path = %self.path.display(), records = self.objects.len(), "snapshot written");
        Ok(())
    }

    fn delete(&mut self, record: &Record) -> Result<()> {
        if self.objects.remove(&record.identity_key()).is_some() {
            tracing::debug!(key = %record.identity_key(), "record removed");
        }
        self.save()
    }

    fn reload(&mut self) -> Result<()> {
        let Some(content) = read_file_if_exists(&self.path)? else {
            tracing::debug!(path = %self.path.display(), "no snapshot file, starting empty");
            return Ok(());
        };
        self.objects = self.deserialize(&content)?;
        tracing::debug!(path = %self.path.display(), records = self.objects.len(), "snapshot loaded");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.reload()
    }

    fn backend(&self) -> Backend {
        Backend::Snapshot
    }
}
