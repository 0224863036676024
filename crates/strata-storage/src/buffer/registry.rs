//! File registry: canonical path → file id → open file-state.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_common::types::FileId;

use crate::file::FileOps;

/// Mutable part of a file-state, behind the per-file mutex.
///
/// In the lock hierarchy this mutex ranks below the directory mutex and is
/// never held across I/O issued by other components.
pub(crate) struct FileInner {
    /// Current file size in bytes. Updated by truncate and by write-backs
    /// that extend the file.
    pub size: u64,
    /// Page indices of this file that currently occupy a frame.
    pub resident: HashSet<u64>,
}

/// One open file shared by every handle to the same canonical path.
pub(crate) struct FileState {
    id: FileId,
    path: PathBuf,
    ops: Arc<dyn FileOps>,
    /// Outstanding `FileHandle` count. Mutated only under the directory
    /// mutex; the last release closes the file.
    handles: AtomicUsize,
    inner: Mutex<FileInner>,
}

impl FileState {
    pub(crate) fn new(id: FileId, path: PathBuf, ops: Arc<dyn FileOps>, size: u64) -> Self {
        Self {
            id,
            path,
            ops,
            handles: AtomicUsize::new(0),
            inner: Mutex::new(FileInner {
                size,
                resident: HashSet::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> FileId {
        self.id
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub(crate) fn ops(&self) -> &Arc<dyn FileOps> {
        &self.ops
    }

    #[inline]
    pub(crate) fn inner(&self) -> &Mutex<FileInner> {
        &self.inner
    }

    pub(crate) fn add_handle(&self) {
        self.handles.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one handle and returns the number remaining.
    pub(crate) fn release_handle(&self) -> usize {
        let old = self.handles.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "released file handle that was never added");
        old - 1
    }
}

impl std::fmt::Debug for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FileState")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("size", &inner.size)
            .field("resident", &inner.resident.len())
            .finish()
    }
}

/// Registry of open files, mutated only under the directory mutex.
///
/// File ids are dense: allocation takes the smallest free id, and closing a
/// file returns its id to the free list. A fresh buffer manager therefore
/// hands out 0, 1, 2, … in open order.
#[derive(Default)]
pub(crate) struct FileRegistry {
    by_path: HashMap<PathBuf, FileId>,
    files: HashMap<FileId, Arc<FileState>>,
    free_ids: BTreeSet<u16>,
    next_id: u16,
}

impl FileRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Looks up an open file by canonical path.
    pub(crate) fn get_by_path(&self, path: &Path) -> Option<Arc<FileState>> {
        let id = self.by_path.get(path)?;
        self.files.get(id).cloned()
    }

    /// Registers a newly opened file and assigns it the smallest free id.
    pub(crate) fn insert(
        &mut self,
        path: PathBuf,
        ops: Arc<dyn FileOps>,
        size: u64,
    ) -> Arc<FileState> {
        let id = match self.free_ids.pop_first() {
            Some(id) => FileId::new(id),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                FileId::new(id)
            }
        };
        let state = Arc::new(FileState::new(id, path.clone(), ops, size));
        self.by_path.insert(path, id);
        self.files.insert(id, Arc::clone(&state));
        state
    }

    /// Removes a closed file and returns its id to the free list.
    pub(crate) fn remove(&mut self, id: FileId) {
        if let Some(state) = self.files.remove(&id) {
            self.by_path.remove(state.path());
            self.free_ids.insert(id.as_u16());
        }
    }

    /// Number of open files.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileSystem, MemoryFileSystem, OpenOptions};

    fn open_ops(fs: &MemoryFileSystem, path: &str) -> Arc<dyn FileOps> {
        fs.open(Path::new(path), OpenOptions::for_create()).unwrap()
    }

    #[test]
    fn test_dense_id_assignment() {
        let fs = MemoryFileSystem::new();
        let mut registry = FileRegistry::new();

        let a = registry.insert("/a.db".into(), open_ops(&fs, "/a.db"), 0);
        let b = registry.insert("/b.db".into(), open_ops(&fs, "/b.db"), 0);
        let c = registry.insert("/c.db".into(), open_ops(&fs, "/c.db"), 0);

        assert_eq!(a.id(), FileId::new(0));
        assert_eq!(b.id(), FileId::new(1));
        assert_eq!(c.id(), FileId::new(2));
    }

    #[test]
    fn test_id_reuse_smallest_first() {
        let fs = MemoryFileSystem::new();
        let mut registry = FileRegistry::new();

        registry.insert("/a.db".into(), open_ops(&fs, "/a.db"), 0);
        let b = registry.insert("/b.db".into(), open_ops(&fs, "/b.db"), 0);
        registry.insert("/c.db".into(), open_ops(&fs, "/c.db"), 0);

        registry.remove(b.id());
        registry.remove(FileId::new(0));

        // Reopen: smallest free id first.
        let d = registry.insert("/d.db".into(), open_ops(&fs, "/d.db"), 0);
        let e = registry.insert("/e.db".into(), open_ops(&fs, "/e.db"), 0);
        let f = registry.insert("/f.db".into(), open_ops(&fs, "/f.db"), 0);
        assert_eq!(d.id(), FileId::new(0));
        assert_eq!(e.id(), FileId::new(1));
        assert_eq!(f.id(), FileId::new(3));
    }

    #[test]
    fn test_lookup_by_path() {
        let fs = MemoryFileSystem::new();
        let mut registry = FileRegistry::new();

        let a = registry.insert("/a.db".into(), open_ops(&fs, "/a.db"), 128);
        let found = registry.get_by_path(Path::new("/a.db")).unwrap();
        assert_eq!(found.id(), a.id());
        assert_eq!(found.inner().lock().size, 128);

        assert!(registry.get_by_path(Path::new("/missing.db")).is_none());
    }

    #[test]
    fn test_remove_clears_both_maps() {
        let fs = MemoryFileSystem::new();
        let mut registry = FileRegistry::new();

        let a = registry.insert("/a.db".into(), open_ops(&fs, "/a.db"), 0);
        registry.remove(a.id());

        assert_eq!(registry.len(), 0);
        assert!(registry.get_by_path(Path::new("/a.db")).is_none());
    }

    #[test]
    fn test_handle_counting() {
        let fs = MemoryFileSystem::new();
        let state = FileState::new(FileId::new(0), "/h.db".into(), open_ops(&fs, "/h.db"), 0);

        state.add_handle();
        state.add_handle();
        assert_eq!(state.release_handle(), 1);
        assert_eq!(state.release_handle(), 0);
    }
}
