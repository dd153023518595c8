//! File-based volume for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::volume::Volume;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-backed volume.
///
/// Data survives process restarts. An advisory exclusive lock is taken on
/// open and held until the volume is dropped, so two processes cannot work
/// on the same log at the same time.
///
/// # Durability
///
/// - `flush()` pushes buffered data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Example
///
/// ```no_run
/// use evtlog_storage::{FileVolume, Volume};
/// use std::path::Path;
///
/// let mut volume = FileVolume::create(Path::new("app.evt")).unwrap();
/// volume.set_len(0x20000).unwrap();
/// volume.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileVolume {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileVolume {
    /// Opens an existing file as a volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be opened for
    /// reading and writing, or is locked by another process.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(path, file)
    }

    /// Opens a file as a volume, creating it when missing.
    ///
    /// An existing file is kept as-is; sizing it is the caller's business.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created, or is
    /// locked by another process.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file)
    }

    fn from_file(path: &Path, file: File) -> StorageResult<Self> {
        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.display().to_string(),
            });
        }
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Volume for FileVolume {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let end = offset.saturating_add(buf.len() as u64);
        if offset > self.size || end > self.size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len: buf.len(),
                size: self.size,
            });
        }
        if buf.is_empty() {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        let end = offset + data.len() as u64;
        if end > self.size {
            self.size = end;
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        self.file.set_len(len)?;
        self.size = len;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
