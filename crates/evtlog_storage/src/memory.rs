//! In-memory volume for testing and ephemeral storage.

use crate::error::{StorageError, StorageResult};
use crate::volume::Volume;

/// A volume held entirely in memory.
///
/// Useful for tests and for working on a log image without touching disk.
/// `flush` and `sync` are no-ops.
#[derive(Debug, Default)]
pub struct MemoryVolume {
    data: Vec<u8>,
}

impl MemoryVolume {
    /// Creates a new, empty volume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a volume over an existing byte image.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the full byte image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Volume for MemoryVolume {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let size = self.data.len() as u64;
        let end = offset.saturating_add(buf.len() as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len: buf.len(),
                size,
            });
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset as usize + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.len() as u64)
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        self.data.resize(len as usize, 0);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let mut volume = MemoryVolume::new();
        volume.write_at(0, b"hello world").unwrap();
        assert_eq!(volume.size().unwrap(), 11);

        let mut buf = [0u8; 5];
        volume.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn write_with_gap_zero_fills() {
        let mut volume = MemoryVolume::new();
        volume.write_at(4, b"x").unwrap();
        assert_eq!(volume.as_bytes(), b"\0\0\0\0x");
    }

    #[test]
    fn read_past_end_fails() {
        let mut volume = MemoryVolume::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 2];
        assert!(matches!(
            volume.read_at(2, &mut buf),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn set_len_truncates_and_extends() {
        let mut volume = MemoryVolume::from_bytes(vec![1, 2, 3, 4]);
        volume.set_len(2).unwrap();
        assert_eq!(volume.as_bytes(), &[1, 2]);
        volume.set_len(4).unwrap();
        assert_eq!(volume.as_bytes(), &[1, 2, 0, 0]);
    }
}
