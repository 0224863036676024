//! File-operations traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{IoError, IoResult};
use super::options::OpenOptions;

/// A named collection of files the buffer manager can open.
///
/// Implementations must hand out handles that are safe to share across
/// threads; the buffer manager issues concurrent reads and writes against a
/// single handle.
pub trait FileSystem: Send + Sync {
    /// Opens the file at `path` with the given options.
    fn open(&self, path: &Path, options: OpenOptions) -> IoResult<Arc<dyn FileOps>>;

    /// Returns the canonical form of `path`.
    ///
    /// Canonical paths are the keys of the buffer manager's file registry:
    /// two spellings of the same file must canonicalize identically so they
    /// alias one open file-state.
    fn canonicalize(&self, path: &Path) -> IoResult<PathBuf>;
}

/// Blocking, position-based operations on one open file.
///
/// All operations take `&self`; implementations synchronize internally.
/// Dropping the last reference closes the file.
pub trait FileOps: Send + Sync + std::fmt::Debug {
    /// Reads into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes read, which is less than `buf.len()`
    /// when EOF falls inside the requested range and zero at or past EOF.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize>;

    /// Writes `buf` at `offset`, extending the file if the range lies past
    /// the current end. Returns the number of bytes written.
    fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize>;

    /// Writes all of `buf` at `offset`.
    fn write_all_at(&self, buf: &[u8], offset: u64) -> IoResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write_at(&buf[written..], offset + written as u64)?;
            if n == 0 {
                return Err(IoError::short_write(buf.len(), written));
            }
            written += n;
        }
        Ok(())
    }

    /// Truncates or extends the file to `size` bytes. Extension zero-fills.
    fn set_len(&self, size: u64) -> IoResult<()>;

    /// Returns the current file size in bytes.
    fn size(&self) -> IoResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Minimal FileOps whose write_at accepts a bounded chunk per call,
    /// to exercise the write_all_at loop.
    #[derive(Debug)]
    struct ChunkedSink {
        data: Mutex<Vec<u8>>,
        chunk: usize,
    }

    impl FileOps for ChunkedSink {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize> {
            let data = self.data.lock();
            let offset = offset as usize;
            if offset >= data.len() {
                return Ok(0);
            }
            let n = buf.len().min(data.len() - offset);
            buf[..n].copy_from_slice(&data[offset..offset + n]);
            Ok(n)
        }

        fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize> {
            let mut data = self.data.lock();
            let offset = offset as usize;
            let n = buf.len().min(self.chunk);
            if data.len() < offset + n {
                data.resize(offset + n, 0);
            }
            data[offset..offset + n].copy_from_slice(&buf[..n]);
            Ok(n)
        }

        fn set_len(&self, size: u64) -> IoResult<()> {
            self.data.lock().resize(size as usize, 0);
            Ok(())
        }

        fn size(&self) -> IoResult<u64> {
            Ok(self.data.lock().len() as u64)
        }
    }

    #[test]
    fn test_write_all_at_loops_over_short_writes() {
        let sink = ChunkedSink {
            data: Mutex::new(Vec::new()),
            chunk: 3,
        };
        sink.write_all_at(b"0123456789", 2).unwrap();

        let mut buf = [0u8; 10];
        assert_eq!(sink.read_at(&mut buf, 2).unwrap(), 10);
        assert_eq!(&buf, b"0123456789");
        assert_eq!(sink.size().unwrap(), 12);
    }
}
