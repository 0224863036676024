//! File handles.

use std::path::Path;
use std::sync::Arc;

use strata_common::types::FileId;

use super::error::BufferResult;
use super::latch::PageGuard;
use super::manager::Shared;
use super::registry::FileState;

/// A handle to one open file.
///
/// Handles to the same canonical path share one file-state; each handle
/// counts as a reference and dropping the last one flushes the file's
/// dirty frames and closes it. The file id stays stable for the handle's
/// lifetime; after the file is fully closed the id may be reused.
pub struct FileHandle {
    shared: Arc<Shared>,
    state: Arc<FileState>,
}

impl FileHandle {
    pub(crate) fn new(shared: Arc<Shared>, state: Arc<FileState>) -> Self {
        Self { shared, state }
    }

    /// Returns the file's id.
    #[inline]
    pub fn file_id(&self) -> FileId {
        self.state.id()
    }

    /// Returns the canonical path of the file.
    #[inline]
    pub fn path(&self) -> &Path {
        self.state.path()
    }

    /// Returns the current file size in bytes.
    pub fn size(&self) -> u64 {
        self.state.inner().lock().size
    }

    /// Fixes the page at `page_index`, loading it if necessary.
    ///
    /// Indices past the current end of file are valid: the page arrives
    /// zero-filled in memory, and a dirty write-back extends the file.
    /// That is the normal way new pages are allocated.
    ///
    /// With `exclusive` the returned guard allows mutation and excludes
    /// every other fix of the page; otherwise any number of shared guards
    /// coexist. Blocks while the pool is saturated with pinned pages.
    pub fn fix_page(&self, page_index: u64, exclusive: bool) -> BufferResult<PageGuard> {
        self.shared.fix_page(&self.state, page_index, exclusive)
    }

    /// Resizes the file to `new_size` bytes.
    ///
    /// Resident frames past the new end of file are dropped, dirty or not;
    /// callers shrinking a file flush first if they want those contents.
    /// Extension zero-fills.
    pub fn truncate(&self, new_size: u64) -> BufferResult<()> {
        self.shared.truncate_file(&self.state, new_size)
    }

    /// Writes back this file's dirty resident frames.
    pub fn flush(&self) -> BufferResult<()> {
        self.shared.flush_file(&self.state)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.shared.close_file(&self.state);
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("file_id", &self.file_id())
            .field("path", &self.path())
            .finish()
    }
}
