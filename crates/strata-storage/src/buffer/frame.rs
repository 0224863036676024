//! Buffer frame - one resident page and its metadata.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use strata_common::types::PageId;

use super::registry::FileState;

/// Load state of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameState {
    /// The frame is reserved in the frame table while its page is read.
    Loading = 0,
    /// The page is in memory and the frame serves fixes.
    Resident = 1,
    /// The frame's bytes are being written back.
    Writing = 2,
}

impl FrameState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Loading,
            1 => Self::Resident,
            _ => Self::Writing,
        }
    }
}

/// Which replacement queue a frame belongs to when unpinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum QueueKind {
    /// Admitted and accessed once: eligible for FIFO eviction.
    Fifo = 0,
    /// Accessed at least twice since admission.
    Lru = 1,
}

/// A frame holds a single page in memory.
///
/// The data buffer doubles as the frame's latch: shared fixes hold its read
/// half, exclusive fixes its write half, and the buffer `Arc` lets a page
/// handle own the guard for its whole lifetime.
///
/// The dirty bit is atomic because it is set under the exclusive latch
/// without the directory mutex; the remaining metadata is mutated only
/// under the directory mutex and read from snapshots.
pub(crate) struct Frame {
    /// Identity of the resident page. Immutable for the frame's lifetime.
    page_id: PageId,
    /// Owning file; keeps the I/O handle alive for write-back.
    file: Arc<FileState>,
    /// Page bytes behind the frame latch.
    data: Arc<RwLock<Vec<u8>>>,
    /// Number of outstanding page handles.
    pin_count: AtomicU32,
    /// Contents differ from the file and must be written back.
    dirty: AtomicBool,
    /// Load state.
    state: AtomicU8,
    /// Replacement queue this frame joins when its pin count reaches zero.
    queue: AtomicU8,
    /// The page was fixed again while resident; promotes FIFO → LRU.
    refixed: AtomicBool,
}

impl Frame {
    /// Creates a loading placeholder, pinned once by the loading thread.
    pub(crate) fn new_loading(page_id: PageId, file: Arc<FileState>) -> Self {
        Self {
            page_id,
            file,
            data: Arc::new(RwLock::new(Vec::new())),
            pin_count: AtomicU32::new(1),
            dirty: AtomicBool::new(false),
            state: AtomicU8::new(FrameState::Loading as u8),
            queue: AtomicU8::new(QueueKind::Fifo as u8),
            refixed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub(crate) fn file(&self) -> &Arc<FileState> {
        &self.file
    }

    #[inline]
    pub(crate) fn state(&self) -> FrameState {
        FrameState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: FrameState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "unpinned frame with pin_count = 0");
        old - 1
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub(crate) fn queue_kind(&self) -> QueueKind {
        if self.queue.load(Ordering::Acquire) == QueueKind::Fifo as u8 {
            QueueKind::Fifo
        } else {
            QueueKind::Lru
        }
    }

    #[inline]
    pub(crate) fn set_queue_kind(&self, kind: QueueKind) {
        self.queue.store(kind as u8, Ordering::Release);
    }

    /// Records an access to an already-resident frame.
    #[inline]
    pub(crate) fn mark_refixed(&self) {
        self.refixed.store(true, Ordering::Release);
    }

    /// Consumes the refixed flag.
    #[inline]
    pub(crate) fn take_refixed(&self) -> bool {
        self.refixed.swap(false, Ordering::AcqRel)
    }

    /// Acquires the frame latch in shared mode. May block on an exclusive
    /// holder.
    pub(crate) fn latch_shared(&self) -> ArcRwLockReadGuard<RawRwLock, Vec<u8>> {
        self.data.read_arc()
    }

    /// Acquires the frame latch in exclusive mode. May block on any holder.
    pub(crate) fn latch_exclusive(&self) -> ArcRwLockWriteGuard<RawRwLock, Vec<u8>> {
        self.data.write_arc()
    }

    /// Claims the latch of a frame that is known to have no holders.
    ///
    /// The eviction path calls this under the directory mutex after the
    /// frame has been removed from the frame table with a zero pin count,
    /// so no holder exists and none can appear.
    pub(crate) fn claim_latch(&self) -> ArcRwLockWriteGuard<RawRwLock, Vec<u8>> {
        match self.data.try_write_arc() {
            Some(guard) => guard,
            None => unreachable!("latch held on an unpinned, unmapped frame"),
        }
    }

    /// Returns a point-in-time description of the frame.
    pub(crate) fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            page_id: self.page_id,
            pin_count: self.pin_count(),
            dirty: self.is_dirty(),
            state: self.state(),
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("page_id", &self.page_id)
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("state", &self.state())
            .finish()
    }
}

/// Point-in-time view of one frame, for introspection and tests.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Identity of the resident page.
    pub page_id: PageId,
    /// Number of outstanding page handles.
    pub pin_count: u32,
    /// Whether the frame holds unwritten modifications.
    pub dirty: bool,
    /// Load state at snapshot time.
    pub state: FrameState,
}
