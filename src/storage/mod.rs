#![forbid(unsafe_code)]

//! Object storage access.
//!
//! The lake is addressed the way a bucket is: flat `/`-separated keys that
//! are listed by prefix and fetched whole. Everything above this module talks
//! to the [`ObjectStore`] trait only, so tests run against [`MemoryStore`]
//! while the binary reads a directory tree through [`LocalStore`].

use bytes::Bytes;
use thiserror::Error;

/// Directory-backed object store.
pub mod local;

/// In-memory object store.
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Listing entry returned by [`ObjectStore::list_objects`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full object key.
    pub key: String,
    /// Payload size in bytes.
    pub size: u64,
}

/// Failure talking to the backing store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Key is not present in the store.
    #[error("object '{0}' not found")]
    NotFound(String),
    /// Store is configured incorrectly or cannot be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Io(_) => "StorageIo",
            StorageError::NotFound(_) => "ObjectNotFound",
            StorageError::Unavailable(_) => "StorageUnavailable",
        }
    }
}

/// Minimal bucket-style storage capability consumed by the lake.
///
/// Implementations must return listings sorted by key so that ingestion
/// order is deterministic.
pub trait ObjectStore: Send + Sync {
    /// Lists every object whose key starts with `prefix`.
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError>;

    /// Fetches the full payload stored under `key`.
    fn get_object(&self, key: &str) -> Result<Bytes, StorageError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        (**self).list_objects(prefix)
    }

    fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        (**self).get_object(key)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        (**self).list_objects(prefix)
    }

    fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        (**self).get_object(key)
    }
}
