//! File-backed segments.
//!
//! One file per segment: a 16-byte header at offset 0, content after.
//! The OS handle is bound to the segment's mode - `Closed` releases it,
//! reopening restores it - and `Drop` flushes the header best-effort so
//! state survives every exit path.

use crate::error::{StorageError, StorageResult};
use crate::mode::{transition, ModeAction, SegmentMode};
use crate::segment::{Segment, SegmentHeader, SegmentNumber, HEADER_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Formats a segment file name: 16 lowercase hex digits plus `ext`.
#[must_use]
pub(crate) fn segment_file_name(number: SegmentNumber, ext: &str) -> String {
    format!("{number:016x}{ext}")
}

/// A segment stored in a single file.
#[derive(Debug)]
pub struct FileSegment {
    number: SegmentNumber,
    path: PathBuf,
    capacity: usize,
    header: SegmentHeader,
    mode: SegmentMode,
    file: Option<File>,
    /// Total content bytes ever written (consumed space is not reused).
    content_len: u64,
}

impl FileSegment {
    /// Creates a new segment file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be created.
    pub fn create(path: &Path, number: SegmentNumber, capacity: usize) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        let header = SegmentHeader::empty();
        file.write_all(&header.encode())?;

        Ok(Self {
            number,
            path: path.to_path_buf(),
            capacity,
            header,
            mode: SegmentMode::Idle,
            file: Some(file),
            content_len: 0,
        })
    }

    /// Opens an existing segment file, resuming from its header.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the file is shorter than
    /// its header claims it should be.
    pub fn open(path: &Path, number: SegmentNumber, capacity: usize) -> StorageResult<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(StorageError::Corrupted(format!(
                "segment file {} shorter than header",
                path.display()
            )));
        }

        let mut raw = [0u8; HEADER_SIZE];
        file.read_exact(&mut raw)?;
        let header = SegmentHeader::decode(&raw)?;

        let content_len = file_len - HEADER_SIZE as u64;
        if header.start_offset > content_len {
            return Err(StorageError::Corrupted(format!(
                "start offset {} beyond content length {}",
                header.start_offset, content_len
            )));
        }

        Ok(Self {
            number,
            path: path.to_path_buf(),
            capacity,
            header,
            mode: SegmentMode::Idle,
            file: Some(file),
            content_len,
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&mut self) -> StorageResult<&mut File> {
        self.file.as_mut().ok_or(StorageError::Closed)
    }

    fn flush_header(&mut self) -> StorageResult<()> {
        let header = self.header;
        let file = self.handle()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_all()?;
        Ok(())
    }

    fn apply(&mut self, action: ModeAction) -> StorageResult<()> {
        match action {
            ModeAction::None => {}
            ModeAction::SeekToStart => {
                let pos = HEADER_SIZE as u64 + self.header.start_offset;
                self.handle()?.seek(SeekFrom::Start(pos))?;
            }
            ModeAction::SeekToEnd => {
                self.handle()?.seek(SeekFrom::End(0))?;
            }
            ModeAction::FlushAndRelease => {
                self.flush_header()?;
                self.file = None;
            }
            ModeAction::ReopenForRead | ModeAction::ReopenForWrite => {
                let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
                self.file = Some(file);
                let follow = if action == ModeAction::ReopenForRead {
                    ModeAction::SeekToStart
                } else {
                    ModeAction::SeekToEnd
                };
                self.apply(follow)?;
            }
        }
        Ok(())
    }

    /// Moves into `mode` if not already there, so reads and writes can be
    /// issued without the caller re-stating the obvious transition.
    fn ensure_mode(&mut self, mode: SegmentMode) -> StorageResult<()> {
        if self.mode != mode {
            self.set_mode(mode)?;
        }
        Ok(())
    }
}

impl Segment for FileSegment {
    fn number(&self) -> SegmentNumber {
        self.number
    }

    fn next_number(&self) -> SegmentNumber {
        self.header.next_number
    }

    fn set_next_number(&mut self, next: SegmentNumber) -> StorageResult<()> {
        // Persisted on close; kept in memory until then.
        self.header.next_number = next;
        Ok(())
    }

    fn mode(&self) -> SegmentMode {
        self.mode
    }

    fn set_mode(&mut self, mode: SegmentMode) -> StorageResult<()> {
        let action = transition(self.mode, mode)?;
        self.apply(action)?;
        self.mode = mode;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        if self.mode == SegmentMode::Closed {
            return Err(StorageError::Closed);
        }
        self.ensure_mode(SegmentMode::Read)?;

        let n = buf.len().min(self.len());
        if n > 0 {
            self.handle()?.read_exact(&mut buf[..n])?;
            self.header.start_offset += n as u64;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> StorageResult<usize> {
        if self.mode == SegmentMode::Closed {
            return Err(StorageError::Closed);
        }
        self.ensure_mode(SegmentMode::Write)?;

        let room = (self.capacity as u64).saturating_sub(self.content_len) as usize;
        let n = buf.len().min(room);
        if n > 0 {
            self.handle()?.write_all(&buf[..n])?;
            self.content_len += n as u64;
        }
        Ok(n)
    }

    fn clear(&mut self) -> StorageResult<()> {
        if self.file.is_none() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            self.file = Some(file);
        }
        let file = self.handle()?;
        file.set_len(HEADER_SIZE as u64)?;
        file.seek(SeekFrom::End(0))?;
        self.header.start_offset = 0;
        self.content_len = 0;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn len(&self) -> usize {
        (self.content_len - self.header.start_offset) as usize
    }
}

impl Drop for FileSegment {
    fn drop(&mut self) {
        // Errors here have nowhere to go; dispose paths flush explicitly.
        let _ = self.flush_header();
    }
}
