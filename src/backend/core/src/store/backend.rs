//! Blob backend implementations.
//!
//! This module provides pluggable persistence for sealed blobs:
//! - **FileBackend**: one `<name>.bin` file per entry, replaced atomically
//! - **InMemoryBackend**: process-local map, for tests and throwaway sessions

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

use super::StoreError;

/// File extension for persisted blobs.
pub const BLOB_EXTENSION: &str = "bin";

/// Longest file name most filesystems accept, in bytes.
pub const FILE_NAME_MAX: usize = 255;

// ═══════════════════════════════════════════════════════════════════════════════
// Backend Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw byte persistence keyed by entry name.
///
/// `put` must replace the previous value atomically: a concurrent or later
/// `get` sees either the old bytes or the new bytes, never a mix.
pub trait BlobBackend: Send + Sync {
    /// Store `bytes` under `name`, replacing any previous value.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Fetch the bytes stored under `name`, if any.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `bytes` under `name` only if no entry exists yet.
    ///
    /// Returns `false`, leaving the existing value untouched, when another
    /// writer got there first.
    fn put_new(&self, name: &str, bytes: &[u8]) -> Result<bool, StoreError>;

    /// Check whether an entry exists.
    fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Get the backend name.
    fn name(&self) -> &'static str;
}

impl<B: BlobBackend + ?Sized> BlobBackend for Arc<B> {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(name, bytes)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(name)
    }

    fn put_new(&self, name: &str, bytes: &[u8]) -> Result<bool, StoreError> {
        (**self).put_new(name, bytes)
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        (**self).exists(name)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// File Backend
// ═══════════════════════════════════════════════════════════════════════════════

/// Stores each entry as `<root>/<name>.bin`.
///
/// Writes go to a uniquely named temporary file in the root that is flushed
/// to disk and then renamed over the target, so any number of backends (or
/// processes) may share a root. Writers to the same entry through one
/// backend are serialized by a per-entry mutex; a mutex is dropped again once
/// no writer holds it, so the lock table only ever holds entries being
/// written.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root.display().to_string(), e))?;
        debug!(root = %root.display(), "Opened file blob backend");
        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`.
    pub fn entry_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidResourceName {
                name: name.to_string(),
                reason: "not a plain file name",
            });
        }
        Ok(self.root.join(format!("{}.{}", name, BLOB_EXTENSION)))
    }

    /// Run `write` while holding the per-entry lock for `name`.
    fn with_entry_lock<T>(&self, name: &str, write: impl FnOnce() -> T) -> T {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock();
            write()
        };
        drop(lock);
        self.locks.remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Write `bytes` to a fresh temporary file in the root, flushed to disk.
    /// The file is removed if it is dropped without being persisted.
    fn stage(&self, bytes: &[u8]) -> io::Result<NamedTempFile> {
        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }
}

impl BlobBackend for FileBackend {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.entry_path(name)?;
        self.with_entry_lock(name, || -> io::Result<()> {
            let temp = self.stage(bytes)?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .map_err(|e| StoreError::io(name, e))?;

        debug!(entry = name, bytes = bytes.len(), "Wrote blob");
        Ok(())
    }

    fn put_new(&self, name: &str, bytes: &[u8]) -> Result<bool, StoreError> {
        let path = self.entry_path(name)?;
        let created = self
            .with_entry_lock(name, || -> io::Result<bool> {
                let temp = self.stage(bytes)?;
                match temp.persist_noclobber(&path) {
                    Ok(_) => Ok(true),
                    Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
                    Err(e) => Err(e.error),
                }
            })
            .map_err(|e| StoreError::io(name, e))?;

        debug!(entry = name, created, "Wrote blob if absent");
        Ok(created)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.entry_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(name, e)),
        }
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.entry_path(name)?;
        path.try_exists().map_err(|e| StoreError::io(name, e))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Backend
// ═══════════════════════════════════════════════════════════════════════════════

/// Keeps entries in a concurrent map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlobBackend for InMemoryBackend {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn put_new(&self, name: &str, bytes: &[u8]) -> Result<bool, StoreError> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(true)
            }
        }
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(name).map(|entry| entry.value().clone()))
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(name))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_file_put_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        assert_eq!(backend.get("report.txt").unwrap(), None);
        assert!(!backend.exists("report.txt").unwrap());

        backend.put("report.txt", b"first").unwrap();
        assert!(dir.path().join("report.txt.bin").exists());
        assert_eq!(backend.get("report.txt").unwrap(), Some(b"first".to_vec()));

        backend.put("report.txt", b"second").unwrap();
        assert_eq!(backend.get("report.txt").unwrap(), Some(b"second".to_vec()));
        assert!(backend.exists("report.txt").unwrap());
    }

    #[test]
    fn test_file_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.put("a", b"1").unwrap();
        backend.put("a", b"2").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.bin".to_string()]);
    }

    #[test]
    fn test_file_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        for name in ["", "..", "../escape", "a/b"] {
            assert!(backend.put(name, b"x").is_err(), "{name:?}");
        }
        assert!(backend.entry_path(".salt").is_ok());
    }

    #[test]
    fn test_file_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let backend = FileBackend::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(backend.root(), nested.as_path());
        assert_eq!(backend.name(), "file");
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).unwrap());

        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 4096]).collect();
        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    for _ in 0..10 {
                        backend.put("shared", &payload).unwrap();
                        let read = backend.get("shared").unwrap().unwrap();
                        assert_eq!(read.len(), 4096);
                        assert!(read.iter().all(|b| *b == read[0]));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let last = backend.get("shared").unwrap().unwrap();
        assert!(payloads.contains(&last));
    }

    #[test]
    fn test_backends_sharing_a_root() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(FileBackend::open(dir.path()).unwrap());
        let second = Arc::new(FileBackend::open(dir.path()).unwrap());

        for round in 0..50u8 {
            let handles: Vec<_> = [Arc::clone(&first), Arc::clone(&second)]
                .into_iter()
                .enumerate()
                .map(|(i, backend)| {
                    let payload = vec![round.wrapping_add(i as u8); 1024];
                    thread::spawn(move || backend.put("shared", &payload))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }

            let read = first.get("shared").unwrap().unwrap();
            assert_eq!(read.len(), 1024);
            assert!(read.iter().all(|b| *b == read[0]));
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["shared.bin".to_string()]);
    }

    #[test]
    fn test_lock_table_drains() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        for i in 0..20 {
            backend.put(&format!("entry-{i}"), b"x").unwrap();
        }
        assert!(backend.put_new("entry-0", b"y").is_ok());
        assert!(backend.locks.is_empty());
    }

    #[test]
    fn test_file_put_new() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        assert!(backend.put_new(".salt", b"first").unwrap());
        assert!(!backend.put_new(".salt", b"second").unwrap());
        assert_eq!(backend.get(".salt").unwrap(), Some(b"first".to_vec()));

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![".salt.bin".to_string()]);
    }

    #[test]
    fn test_file_put_new_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let backends: Vec<_> = (0..4)
            .map(|_| Arc::new(FileBackend::open(dir.path()).unwrap()))
            .collect();

        let handles: Vec<_> = backends
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, backend)| thread::spawn(move || backend.put_new("once", &[i as u8]).unwrap()))
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|created| *created)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(backends[0].get("once").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_longest_name_fits_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let name = "a".repeat(crate::store::MAX_RESOURCE_NAME_LEN);

        backend.put(&name, b"x").unwrap();
        backend.put(&name, b"y").unwrap();
        assert_eq!(backend.get(&name).unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn test_memory_backend() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        backend.put("a", b"1").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"1".to_vec()));
        assert!(backend.exists("a").unwrap());
        assert!(!backend.exists("b").unwrap());
        assert!(!backend.put_new("a", b"2").unwrap());
        assert!(backend.put_new("b", b"3").unwrap());
        assert_eq!(backend.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(backend.len(), 2);
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_arc_backend_delegates() {
        let backend: Arc<dyn BlobBackend> = Arc::new(InMemoryBackend::new());
        backend.put("a", b"1").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"1".to_vec()));
    }
}
