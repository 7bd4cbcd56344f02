//! Byte storage behind the engine.
//!
//! The engine only ever talks to a [`StorageBackend`]. Two implementations
//! ship with the crate:
//!
//! - [`FileSystemStorage`]: files under a root directory on local disk,
//!   served from a URL prefix (e.g. `public/` behind `/system`).
//! - [`MemoryStorage`]: an in-process map, for tests and embedders that
//!   keep bytes elsewhere.
//!
//! Paths are always `/`-separated and relative. Anything absolute or
//! containing `..` is rejected before it reaches the medium.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid storage path: {0:?}")]
    InvalidPath(String),
}

/// Pluggable byte store.
///
/// `Sync` because styles are written from rayon workers in parallel.
/// `delete` of a missing path succeeds.
pub trait StorageBackend: Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL a browser would fetch `path` from.
    fn public_url(&self, path: &str) -> String;

    /// Every stored path starting with `prefix`, sorted.
    ///
    /// Backends that cannot enumerate keep the default and report nothing.
    fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for &T {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).put(path, bytes)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        (**self).get(path)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        (**self).delete(path)
    }

    fn public_url(&self, path: &str) -> String {
        (**self).public_url(path)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list(prefix)
    }
}

/// Reject paths that could leave the storage root.
fn check_path(path: &str) -> Result<&Path, StorageError> {
    let p = Path::new(path);
    let clean = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(p)
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

fn join_url(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path)
}

// ============================================================================
// Local disk
// ============================================================================

/// Files on local disk under `root`, addressed publicly as `url_prefix/path`.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    url_prefix: String,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a storage path on disk.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(check_path(path)?))
    }
}

impl StorageBackend for FileSystemStorage {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.url_prefix, path)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Walk the deepest directory the prefix names, then filter by full prefix
        let dir = match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.resolve(dir)?,
            _ => self.root.clone(),
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| StorageError::Io(io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                paths.push(key);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Thread-safe in-process store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    url_prefix: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url_prefix(url_prefix: impl Into<String>) -> Self {
        Self {
            files: Mutex::default(),
            url_prefix: url_prefix.into(),
        }
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_path(path)?;
        self.files().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.files().remove(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.url_prefix, path)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .files()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
