//! Directory-backed segment store.
//!
//! File system layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK                  # holder identity, exclusive advisory lock
//! ├─ ENTRY                 # resume segment number (8 bytes)
//! ├─ 0000000000000001.seg  # one file per segment
//! └─ 0000000000000002.seg
//! ```
//!
//! The LOCK file prevents two processes from opening the same store; the
//! ENTRY file carries the scroll's resume pointer across reopens.

use crate::error::{StorageError, StorageResult};
use crate::file::{segment_file_name, FileSegment};
use crate::segment::{Segment, SegmentNumber, SegmentStore};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const ENTRY_FILE: &str = "ENTRY";
const ENTRY_TEMP: &str = "ENTRY.tmp";

/// Default extension for segment files.
pub const DEFAULT_EXTENSION: &str = ".seg";

/// A segment store over a directory of files.
///
/// Holds an exclusive lock on the directory for its lifetime; a second
/// open fails with [`StorageError::Locked`]. Dropping the store releases
/// the lock.
#[derive(Debug)]
pub struct DirStore {
    path: PathBuf,
    capacity: usize,
    extension: String,
    _lock_file: File,
}

impl DirStore {
    /// Opens or creates a store at `path` with the given per-segment
    /// capacity and the default `.seg` extension.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another holder has the store,
    /// [`StorageError::InvalidCapacity`] for a zero capacity, or an I/O
    /// error.
    pub fn open(path: &Path, capacity: usize) -> StorageResult<Self> {
        Self::open_with_extension(path, capacity, DEFAULT_EXTENSION)
    }

    /// Opens or creates a store with a custom segment file extension.
    ///
    /// # Errors
    ///
    /// See [`DirStore::open`].
    pub fn open_with_extension(
        path: &Path,
        capacity: usize,
        extension: &str,
    ) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidCapacity { capacity });
        }

        fs::create_dir_all(path)?;

        let lock_path = path.join(LOCK_FILE);
        let mut lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        // Holder identity, plain text, for post-mortem inspection.
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        lock_file.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            capacity,
            extension: extension.to_string(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store's directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn segment_path(&self, number: SegmentNumber) -> PathBuf {
        self.path.join(segment_file_name(number, &self.extension))
    }
}

impl SegmentStore for DirStore {
    fn create(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>> {
        let path = self.segment_path(number);
        Ok(Box::new(FileSegment::create(&path, number, self.capacity)?))
    }

    fn open(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>> {
        let path = self.segment_path(number);
        if !path.exists() {
            return Err(StorageError::SegmentMissing { number });
        }
        Ok(Box::new(FileSegment::open(&path, number, self.capacity)?))
    }

    fn remove(&mut self, number: SegmentNumber) -> StorageResult<()> {
        let path = self.segment_path(number);
        if !path.exists() {
            return Err(StorageError::SegmentMissing { number });
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    fn exists(&self, number: SegmentNumber) -> bool {
        self.segment_path(number).exists()
    }

    fn entry_number(&self) -> StorageResult<Option<SegmentNumber>> {
        let entry_path = self.path.join(ENTRY_FILE);
        if !entry_path.exists() {
            return Ok(None);
        }

        let mut raw = Vec::new();
        File::open(&entry_path)?.read_to_end(&mut raw)?;
        if raw.len() != 8 {
            return Err(StorageError::Corrupted(format!(
                "entry record has {} bytes, expected 8",
                raw.len()
            )));
        }

        let number = u64::from_ne_bytes(
            raw.as_slice()
                .try_into()
                .map_err(|_| StorageError::Corrupted("bad entry record".into()))?,
        );
        Ok(Some(number))
    }

    fn set_entry_number(&mut self, number: SegmentNumber) -> StorageResult<()> {
        // Write-then-rename so a crash never leaves a torn entry record.
        let temp_path = self.path.join(ENTRY_TEMP);
        let entry_path = self.path.join(ENTRY_FILE);

        let mut file = File::create(&temp_path)?;
        file.write_all(&number.to_ne_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &entry_path)?;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let store = DirStore::open(&path, 64).unwrap();
        assert!(path.is_dir());
        assert!(path.join("LOCK").exists());
        drop(store);
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let _store = DirStore::open(&path, 64).unwrap();
        let result = DirStore::open(&path, 64);
        assert!(matches!(result, Err(StorageError::Locked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        {
            let _store = DirStore::open(&path, 64).unwrap();
        }
        let _store = DirStore::open(&path, 64).unwrap();
    }

    #[test]
    fn zero_capacity_rejected() {
        let temp = tempdir().unwrap();
        let result = DirStore::open(&temp.path().join("store"), 0);
        assert!(matches!(result, Err(StorageError::InvalidCapacity { .. })));
    }

    #[test]
    fn segment_files_use_hex_names() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let mut store = DirStore::open(&path, 64).unwrap();
        store.create(0x1f).unwrap();

        assert!(path.join("000000000000001f.seg").exists());
        assert!(store.exists(0x1f));
    }

    #[test]
    fn segment_roundtrip_across_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        {
            let mut store = DirStore::open(&path, 64).unwrap();
            let mut seg = store.create(1).unwrap();
            seg.write(b"persistent").unwrap();
            seg.set_mode(crate::SegmentMode::Closed).unwrap();
        }

        let mut store = DirStore::open(&path, 64).unwrap();
        let mut seg = store.open(1).unwrap();
        let mut buf = [0u8; 10];
        assert_eq!(seg.read(&mut buf).unwrap(), 10);
        assert_eq!(&buf, b"persistent");
    }

    #[test]
    fn entry_number_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        {
            let mut store = DirStore::open(&path, 64).unwrap();
            assert_eq!(store.entry_number().unwrap(), None);
            store.set_entry_number(5).unwrap();
        }

        let store = DirStore::open(&path, 64).unwrap();
        assert_eq!(store.entry_number().unwrap(), Some(5));
    }

    #[test]
    fn remove_missing_fails() {
        let temp = tempdir().unwrap();
        let mut store = DirStore::open(&temp.path().join("store"), 64).unwrap();
        let result = store.remove(99);
        assert!(matches!(result, Err(StorageError::SegmentMissing { .. })));
    }
}
