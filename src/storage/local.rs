use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use super::{ObjectMeta, ObjectStore, StorageError};

/// Object store backed by a directory tree.
///
/// An object's key is its path relative to the root, joined with `/`. This
/// matches the layout produced by syncing a bucket to local disk.
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Opens a store rooted at `root`. The directory must exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "storage root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::NotFound(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    /// Directory holding every key that starts with `prefix`, or `None` when
    /// no such key can exist.
    ///
    /// Keys are built from normal path components only, so a prefix whose
    /// directory part is missing on disk or is not a plain relative path
    /// matches nothing.
    fn walk_start(&self, prefix: &str) -> Option<PathBuf> {
        let Some(idx) = prefix.rfind('/') else {
            return Some(self.root.clone());
        };
        let dir = &prefix[..idx];
        let plain = dir
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
        let candidate = self.root.join(dir);
        (plain && candidate.is_dir()).then_some(candidate)
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<ObjectMeta>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.collect(&path, prefix, out)?;
            } else if file_type.is_file() {
                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if key.starts_with(prefix) {
                    out.push(ObjectMeta {
                        key,
                        size: entry.metadata()?.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        Some(parts?.join("/"))
    }
}

impl ObjectStore for LocalStore {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        let Some(start) = self.walk_start(prefix) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        self.collect(&start, prefix, &mut out)?;
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
