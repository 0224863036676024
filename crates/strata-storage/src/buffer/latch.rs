//! Page handles: scoped pins with the frame latch held.

use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock};
use strata_common::types::PageId;

use super::frame::Frame;
use super::manager::Shared;

/// The frame latch, held in the mode the page was fixed in.
pub(crate) enum Latch {
    Shared(ArcRwLockReadGuard<RawRwLock, Vec<u8>>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, Vec<u8>>),
}

/// A fixed page.
///
/// The guard owns one pin on the frame and the frame latch in the requested
/// mode, so the page cannot be evicted and its bytes stay at a stable
/// address for the guard's whole lifetime. Dropping (or
/// [`release`](Self::release)-ing) the guard gives both back; when the last
/// pin goes, the frame re-enters the replacement queues.
///
/// Mutation is only possible through an exclusive guard, and modified pages
/// must be flagged with [`mark_dirty`](Self::mark_dirty) to be written
/// back.
pub struct PageGuard {
    shared: Arc<Shared>,
    frame: Arc<Frame>,
    /// Present from construction until drop.
    latch: Option<Latch>,
}

impl PageGuard {
    pub(crate) fn new(shared: Arc<Shared>, frame: Arc<Frame>, latch: Latch) -> Self {
        Self {
            shared,
            frame,
            latch: Some(latch),
        }
    }

    fn latch(&self) -> &Latch {
        match &self.latch {
            Some(latch) => latch,
            None => unreachable!("page guard used after release"),
        }
    }

    /// Returns the id of the fixed page.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.frame.page_id()
    }

    /// Returns true if the page was fixed exclusively.
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        matches!(self.latch(), Latch::Exclusive(_))
    }

    /// Returns the page bytes; exactly one page long.
    #[inline]
    pub fn data(&self) -> &[u8] {
        match self.latch() {
            Latch::Shared(guard) => guard,
            Latch::Exclusive(guard) => guard,
        }
    }

    /// Returns the page bytes for writing.
    ///
    /// Call [`mark_dirty`](Self::mark_dirty) afterwards or the change will
    /// not be written back.
    ///
    /// # Panics
    ///
    /// Panics if the page was fixed in shared mode.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        match self.latch.as_mut() {
            Some(Latch::Exclusive(guard)) => guard,
            Some(Latch::Shared(_)) => {
                panic!("data_mut on a page fixed in shared mode")
            }
            None => unreachable!("page guard used after release"),
        }
    }

    /// Flags the frame for write-back.
    ///
    /// # Panics
    ///
    /// Panics if the page was fixed in shared mode.
    pub fn mark_dirty(&mut self) {
        assert!(
            self.is_exclusive(),
            "mark_dirty on a page fixed in shared mode"
        );
        self.frame.set_dirty();
    }

    /// Releases the pin and latch. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        // Latch first, pin second: the unpin takes the directory mutex and
        // may hand the frame to the replacement queues, so the latch must
        // already be free.
        self.latch = None;
        self.shared.unpin_frame(&self.frame);
    }
}

impl std::fmt::Debug for PageGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id())
            .field("exclusive", &self.is_exclusive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{BufferConfig, BufferManager};
    use crate::file::MemoryFileSystem;
    use std::sync::Arc;

    fn test_buffer() -> BufferManager {
        let fs = Arc::new(MemoryFileSystem::new());
        BufferManager::new(fs, BufferConfig::new().with_capacity(4)).unwrap()
    }

    #[test]
    fn test_guard_pins_and_unpins() {
        let buffer = test_buffer();
        let file = buffer.open_file("/guard.db").unwrap();

        let page = file.fix_page(0, false).unwrap();
        assert_eq!(buffer.frames()[0].pin_count, 1);

        page.release();
        assert_eq!(buffer.frames()[0].pin_count, 0);
    }

    #[test]
    fn test_shared_guards_coexist() {
        let buffer = test_buffer();
        let file = buffer.open_file("/shared.db").unwrap();

        let a = file.fix_page(0, false).unwrap();
        let b = file.fix_page(0, false).unwrap();
        assert_eq!(buffer.frames()[0].pin_count, 2);
        assert_eq!(a.data().len(), b.data().len());
    }

    #[test]
    fn test_exclusive_write_visible_after_release() {
        let buffer = test_buffer();
        let file = buffer.open_file("/write.db").unwrap();

        {
            let mut page = file.fix_page(0, true).unwrap();
            assert!(page.is_exclusive());
            page.data_mut()[..5].copy_from_slice(b"hello");
            page.mark_dirty();
        }

        let page = file.fix_page(0, false).unwrap();
        assert!(!page.is_exclusive());
        assert_eq!(&page.data()[..5], b"hello");
    }

    #[test]
    #[should_panic(expected = "mark_dirty on a page fixed in shared mode")]
    fn test_mark_dirty_requires_exclusive() {
        let buffer = test_buffer();
        let file = buffer.open_file("/ro.db").unwrap();

        let mut page = file.fix_page(0, false).unwrap();
        page.mark_dirty();
    }

    #[test]
    #[should_panic(expected = "data_mut on a page fixed in shared mode")]
    fn test_data_mut_requires_exclusive() {
        let buffer = test_buffer();
        let file = buffer.open_file("/ro2.db").unwrap();

        let mut page = file.fix_page(0, false).unwrap();
        let _ = page.data_mut();
    }

    #[test]
    fn test_data_address_stable_while_fixed() {
        let buffer = test_buffer();
        let file = buffer.open_file("/stable.db").unwrap();

        let page = file.fix_page(0, false).unwrap();
        let before = page.data().as_ptr();
        // Evictions of other pages must not move this one.
        for index in 1..10 {
            file.fix_page(index, false).unwrap();
        }
        assert_eq!(before, page.data().as_ptr());
    }
}
