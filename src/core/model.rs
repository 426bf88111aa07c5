//! Model lifecycle on top of the storage contract.
//!
//! These are the operations every entity shares: create, save, delete, and
//! following a foreign key back to its children. The store is always passed
//! in by the caller.

use crate::core::class_tag::ClassTag;
use crate::core::record::Record;
use crate::error::Result;
use crate::storage::Storage;
use crate::storage::schema::foreign_key;
use serde_json::{Map, Value};

/// Creates a record with the given attributes and persists it.
///
/// Reserved keys in `attrs` are skipped.
///
/// # Errors
///
/// Returns an error if the store fails to save.
pub fn create(storage: &mut dyn Storage, class: ClassTag, attrs: Map<String, Value>) -> Result<Record> {
    let mut record = Record::new(class);
    for (key, value) in attrs {
        record.set(&key, value);
    }
    save(storage, &mut record)?;
    Ok(record)
}

/// Refreshes `updated_at`, registers the record, and saves the store.
///
/// # Errors
///
/// Returns an error if the store fails to save.
pub fn save(storage: &mut dyn Storage, record: &mut Record) -> Result<()> {
    record.touch();
    storage.new(record.clone());
    storage.save()
}

/// Deletes a record and makes the removal durable on either backend.
///
/// # Errors
///
/// Returns an error if the store fails to delete or save.
pub fn delete(storage: &mut dyn Storage, record: &Record) -> Result<()> {
    storage.delete(record)?;
    storage.save()
}

/// Returns the `child` records whose foreign key points at `parent`.
///
/// The key comes from the relational schema and the lookup works the same
/// on both backends, e.g. a state's cities or a user's places. A child type
/// with no key to `parent` has no children.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn children(storage: &dyn Storage, parent: &Record, child: ClassTag) -> Result<Vec<Record>> {
    let Some(key) = foreign_key(child, parent.class) else {
        return Ok(Vec::new());
    };
    let mut found: Vec<Record> = storage
        .all(Some(child.as_str()))?
        .into_values()
        .filter(|r| r.get_str(key) == Some(parent.id.as_str()))
        .collect();
    found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(found)
}

/// Returns the cities of a state.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn cities(storage: &dyn Storage, state: &Record) -> Result<Vec<Record>> {
    children(storage, state, ClassTag::City)
}

/// Returns the reviews of a place.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn reviews(storage: &dyn Storage, place: &Record) -> Result<Vec<Record>> {
    children(storage, place, ClassTag::Review)
}
