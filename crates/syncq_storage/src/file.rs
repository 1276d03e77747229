//! File-based storage backend for persistent storage.
//!
//! Directory layout:
//!
//! ```text
//! <dir>/
//! ├─ LOCK               # Advisory lock for single-writer
//! ├─ sync_queue.json    # One file per key
//! └─ sync_queue.json.tmp  (only while a write is in flight)
//! ```

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const VALUE_EXT: &str = "json";
const TEMP_EXT: &str = "json.tmp";

/// A directory-based storage backend.
///
/// Each key maps to one file. Writes are crash-safe: the new value is written
/// to a temporary file, synced, and renamed over the old one, so a reader
/// after a crash sees either the previous or the new value.
///
/// # Thread Safety
///
/// Writes are serialized by an internal lock. The directory itself is
/// protected by an exclusive advisory lock held for the lifetime of the
/// backend, so only one process can own a queue directory at a time.
///
/// # Example
///
/// ```no_run
/// use syncq_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("queue_dir")).unwrap();
/// backend.put("sync_queue", b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a file backend rooted at the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The path exists but is not a directory
    /// - Another process holds the lock (returns `Locked`)
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path.display().to_string()));
        }

        // Leftovers from a write interrupted by a crash.
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().ends_with(TEMP_EXT) {
                fs::remove_file(entry.path())?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the backend's root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{VALUE_EXT}"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{TEMP_EXT}"))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.value_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        let temp = self.temp_path(key);
        {
            let mut file = File::create(&temp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.value_path(key))?;
        self.sync_directory()
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        match fs::remove_file(self.value_path(key)) {
            Ok(()) => {
                self.sync_directory()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let suffix = format!(".{VALUE_EXT}");
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(key) = name.strip_suffix(&suffix) {
                if validate_key(key).is_ok() {
                    keys.push(key.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
