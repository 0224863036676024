//! Core identifier types for the buffer manager.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// File identifier - a dense small integer assigned at file-open time.
///
/// Ids are allocated smallest-free-first, so the first files opened against
/// a fresh buffer manager receive 0, 1, 2, …. Closing a file returns its id
/// for reuse by a later open.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FileId(u16);

impl FileId {
    /// Creates a new `FileId` from a raw u16 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for FileId {
    #[inline]
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

impl From<FileId> for u16 {
    #[inline]
    fn from(id: FileId) -> Self {
        id.0
    }
}

/// Page identifier - a (file, page-index) pair.
///
/// Uniquely identifies one page across every file the buffer manager has
/// open; it is the key of the frame table. The page index is an offset in
/// page units, so page *i* of a file covers the byte range
/// `[i << page_size_bits, (i + 1) << page_size_bits)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId {
    file_id: FileId,
    page_index: u64,
}

impl PageId {
    /// Creates a new `PageId` for the given file and page index.
    #[inline]
    #[must_use]
    pub const fn new(file_id: FileId, page_index: u64) -> Self {
        Self {
            file_id,
            page_index,
        }
    }

    /// Returns the owning file's id.
    #[inline]
    #[must_use]
    pub const fn file_id(self) -> FileId {
        self.file_id
    }

    /// Returns the page index within the file, in page units.
    #[inline]
    #[must_use]
    pub const fn page_index(self) -> u64 {
        self.page_index
    }

    /// Returns the byte offset of this page for the given page-size shift.
    #[inline]
    #[must_use]
    pub const fn byte_offset(self, page_size_bits: u8) -> u64 {
        self.page_index << page_size_bits
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}:{})", self.file_id, self.page_index)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.page_index)
    }
}
