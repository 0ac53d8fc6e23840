//! Storage layer
//!
//! Wills are stored as one JSON file each; photos as plain files next to
//! them. All writes are atomic.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{atomic_write, read_json, remove_if_exists, write_json};
