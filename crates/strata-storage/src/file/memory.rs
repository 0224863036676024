//! In-memory file-system backend.
//!
//! Hosted environments without a real filesystem run the buffer manager on
//! top of this backend. File contents live in process memory and survive
//! buffer-manager restarts for as long as the `MemoryFileSystem` itself is
//! kept alive, which is also what makes it convenient for tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::error::{IoError, IoResult};
use super::ops::{FileOps, FileSystem};
use super::options::OpenOptions;

/// File-system backend keeping all file contents in memory.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Arc<RwLock<Vec<u8>>>>>,
}

impl MemoryFileSystem {
    /// Creates a new, empty in-memory file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of files.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Returns the size of the file at `path`, if it exists.
    pub fn size_of(&self, path: &Path) -> Option<u64> {
        let key = normalize(path);
        let files = self.files.lock();
        files.get(&key).map(|data| data.read().len() as u64)
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &Path, options: OpenOptions) -> IoResult<Arc<dyn FileOps>> {
        let key = normalize(path);
        let mut files = self.files.lock();

        let data = match files.get(&key) {
            Some(_) if options.create_new => return Err(IoError::already_exists(key)),
            Some(data) => {
                if options.truncate {
                    data.write().clear();
                }
                Arc::clone(data)
            }
            None => {
                if !(options.create || options.create_new) {
                    return Err(IoError::not_found(key));
                }
                let data = Arc::new(RwLock::new(Vec::new()));
                files.insert(key.clone(), Arc::clone(&data));
                data
            }
        };

        Ok(Arc::new(MemoryFile {
            data,
            writable: options.is_write(),
        }))
    }

    fn canonicalize(&self, path: &Path) -> IoResult<PathBuf> {
        Ok(normalize(path))
    }
}

/// Lexical path normalization: absolute, `.` and `..` resolved.
///
/// There is no directory tree to consult, so `..` simply pops the previous
/// component.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// One open file in a [`MemoryFileSystem`].
pub struct MemoryFile {
    data: Arc<RwLock<Vec<u8>>>,
    writable: bool,
}

impl FileOps for MemoryFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize> {
        let data = self.data.read();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "write",
                mode: "read-only",
            });
        }
        let mut data = self.data.write();
        let offset = offset as usize;
        let end = offset + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn set_len(&self, size: u64) -> IoResult<()> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "set_len",
                mode: "read-only",
            });
        }
        self.data.write().resize(size as usize, 0);
        Ok(())
    }

    fn size(&self) -> IoResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}

impl std::fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFile")
            .field("size", &self.data.read().len())
            .field("writable", &self.writable)
            .finish()
    }
}
