use std::collections::BTreeMap;
use std::sync::RwLock;

use bytes::Bytes;

use super::{ObjectMeta, ObjectStore, StorageError};

/// Object store held entirely in memory.
///
/// Keys are kept in a `BTreeMap`, which gives sorted listings for free.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `payload` under `key`, replacing any previous object.
    pub fn put(&self, key: impl Into<String>, payload: impl Into<Bytes>) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        objects.insert(key.into(), payload.into());
    }
}

impl ObjectStore for MemoryStore {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        Ok(objects
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, payload)| ObjectMeta {
                key: key.clone(),
                size: payload.len() as u64,
            })
            .collect())
    }

    fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }
}
