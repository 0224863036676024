//! Standard file I/O backend built on `std::fs`.
//!
//! This is the default backend for conventional POSIX-like filesystems. It
//! wraps each file in a mutex and issues seek-then-read/write pairs, which
//! keeps it platform-neutral; the buffer manager serializes per-page I/O
//! anyway, so per-file locking is not the bottleneck.

use std::fs::File as StdFile;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{IoError, IoResult};
use super::ops::{FileOps, FileSystem};
use super::options::OpenOptions;

/// File-system backend backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StandardFileSystem;

impl StandardFileSystem {
    /// Creates a new standard file-system backend.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StandardFileSystem {
    fn open(&self, path: &Path, options: OpenOptions) -> IoResult<Arc<dyn FileOps>> {
        let file = StandardFile::open(path, options)?;
        Ok(Arc::new(file))
    }

    fn canonicalize(&self, path: &Path) -> IoResult<PathBuf> {
        match std::fs::canonicalize(path) {
            Ok(canonical) => Ok(canonical),
            // The file may not exist yet (open with create). Resolve the
            // parent directory instead and re-attach the file name.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
                let name = path
                    .file_name()
                    .ok_or_else(|| IoError::from_io_with_path(err, path))?;
                let parent = match parent {
                    Some(parent) => std::fs::canonicalize(parent)
                        .map_err(|e| IoError::from_io_with_path(e, path))?,
                    None => std::env::current_dir().map_err(IoError::from)?,
                };
                Ok(parent.join(name))
            }
            Err(err) => Err(IoError::from_io_with_path(err, path)),
        }
    }
}

/// One open file on the standard filesystem.
pub struct StandardFile {
    /// The underlying file, wrapped in a mutex for thread-safe access.
    file: Mutex<StdFile>,
    /// The file path, kept for error context.
    path: PathBuf,
    /// Whether the file was opened with write access.
    writable: bool,
}

impl StandardFile {
    /// Opens a file with the specified options.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let writable = options.is_write();
        let file = options
            .to_std_options()
            .open(&path)
            .map_err(|e| IoError::from_io_with_path(e, &path))?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            writable,
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileOps for StandardFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let n = file.read(buf)?;
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "write",
                mode: "read-only",
            });
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let n = file.write(buf)?;
        Ok(n)
    }

    fn set_len(&self, size: u64) -> IoResult<()> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "set_len",
                mode: "read-only",
            });
        }
        let file = self.file.lock();
        file.set_len(size)?;
        Ok(())
    }

    fn size(&self) -> IoResult<u64> {
        let file = self.file.lock();
        let meta = file.metadata()?;
        Ok(meta.len())
    }
}

impl std::fmt::Debug for StandardFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardFile")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish()
    }
}
