//! Core domain models for hbnb-store.
//!
//! Class tags, records, and the model lifecycle. Records are plain data;
//! the lifecycle functions reach storage only through the
//! [`Storage`](crate::storage::Storage) contract they are handed.

pub mod class_tag;
pub mod model;
pub mod record;

pub use class_tag::ClassTag;
pub use record::{Record, TIME_FORMAT};
