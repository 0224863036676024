//! Buffer manager implementation.
//!
//! One mutex, the directory mutex, protects the frame table, the two
//! replacement queues, and the file registry. Page I/O runs outside it; the
//! only structure ever locked while it is held is a frame latch, and only
//! for frames that are not reachable through the frame table (the eviction
//! hand-off) or that cannot have an exclusive holder (write-back of an
//! unpinned frame).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{ArcRwLockWriteGuard, Condvar, Mutex};
use strata_common::types::PageId;

use super::config::BufferConfig;
use super::error::{BufferError, BufferResult};
use super::eviction::TwoQueueReplacer;
use super::frame::{Frame, FrameSnapshot, FrameState, QueueKind};
use super::handle::FileHandle;
use super::latch::{Latch, PageGuard};
use super::registry::{FileRegistry, FileState};
use super::BufferStats;
use crate::file::{FileOps, FileSystem, IoResult, OpenOptions};

/// Everything behind the directory mutex.
pub(crate) struct Directory {
    /// Maps each resident page to its frame.
    frames: HashMap<PageId, Arc<Frame>>,
    /// FIFO and LRU queues of evictable frames.
    queues: TwoQueueReplacer,
    /// Open files.
    registry: FileRegistry,
}

/// State shared by the buffer manager and every handle it gives out.
pub(crate) struct Shared {
    config: BufferConfig,
    fs: Arc<dyn FileSystem>,
    dir: Mutex<Directory>,
    /// Signalled on every unpin that reaches zero, every admission, and
    /// every load completion or abort. Waiters re-check their predicate
    /// against the directory.
    cond: Condvar,
    fixes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    write_backs: AtomicU64,
}

impl Shared {
    /// Fixes a page: pins its frame, loading it first if necessary, and
    /// returns a handle holding the frame latch in the requested mode.
    pub(crate) fn fix_page(
        self: &Arc<Self>,
        file: &Arc<FileState>,
        page_index: u64,
        exclusive: bool,
    ) -> BufferResult<PageGuard> {
        let page_id = PageId::new(file.id(), page_index);
        let page_size = self.config.page_size();
        self.fixes.fetch_add(1, Ordering::Relaxed);

        // Directory phase: find the frame, or reserve a slot for it.
        let mut dir = self.dir.lock();
        let mut victim = None;
        let frame = loop {
            if let Some(existing) = dir.frames.get(&page_id) {
                if existing.state() != FrameState::Resident {
                    // Another thread is loading this page.
                    self.cond.wait(&mut dir);
                    continue;
                }
                let existing = Arc::clone(existing);
                existing.mark_refixed();
                if existing.pin() == 1 {
                    // First pin: the frame leaves its queue.
                    dir.queues.remove(&page_id);
                }
                drop(dir);
                self.hits.fetch_add(1, Ordering::Relaxed);
                let latch = if exclusive {
                    Latch::Exclusive(existing.latch_exclusive())
                } else {
                    Latch::Shared(existing.latch_shared())
                };
                return Ok(PageGuard::new(Arc::clone(self), existing, latch));
            }

            if dir.frames.len() >= self.config.page_capacity {
                let Some(victim_id) = dir.queues.pop_victim() else {
                    // Every frame is pinned; wait for an unpin.
                    self.cond.wait(&mut dir);
                    continue;
                };
                let Some(victim_frame) = dir.frames.remove(&victim_id) else {
                    unreachable!("queued frame missing from the frame table");
                };
                // The victim has no pins and is no longer reachable, so
                // claiming its latch cannot block and no new fixer can
                // find it. The write-back below runs without the
                // directory mutex.
                let latch = victim_frame.claim_latch();
                victim_frame
                    .file()
                    .inner()
                    .lock()
                    .resident
                    .remove(&victim_id.page_index());
                victim = Some((victim_frame, latch));
            }

            // Reserve the slot; concurrent fixers of the same page wait
            // until the load completes.
            let frame = Arc::new(Frame::new_loading(page_id, Arc::clone(file)));
            dir.frames.insert(page_id, Arc::clone(&frame));
            file.inner().lock().resident.insert(page_index);
            break frame;
        };
        drop(dir);

        // I/O phase, without the directory mutex.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut buf = if let Some((victim_frame, mut victim_latch)) = victim {
            if victim_frame.is_dirty() {
                if let Err(err) = self.write_back(&victim_frame, &victim_latch) {
                    drop(victim_latch);
                    self.abort_load_restore_victim(page_id, file, victim_frame);
                    return Err(err.into());
                }
                victim_frame.clear_dirty();
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
            // Recycle the victim's buffer for the incoming page.
            std::mem::take(&mut *victim_latch)
        } else {
            Vec::new()
        };
        buf.clear();
        buf.resize(page_size, 0);

        let offset = page_id.byte_offset(self.config.page_size_bits);
        if let Err(err) = read_page(file.ops().as_ref(), &mut buf, offset) {
            self.abort_load(page_id, file);
            return Err(err.into());
        }

        // Install the bytes and take the latch before the frame becomes
        // visible as resident; neither can contend.
        let mut write_latch = frame.latch_exclusive();
        *write_latch = buf;
        let latch = if exclusive {
            Latch::Exclusive(write_latch)
        } else {
            Latch::Shared(ArcRwLockWriteGuard::downgrade(write_latch))
        };

        // Admission: publish the frame and wake waiters. It joins the FIFO
        // queue once its pin count first returns to zero.
        let dir = self.dir.lock();
        frame.set_state(FrameState::Resident);
        self.cond.notify_all();
        drop(dir);

        Ok(PageGuard::new(Arc::clone(self), frame, latch))
    }

    /// Removes a failed load's placeholder and wakes waiters so they retry.
    fn abort_load(&self, page_id: PageId, file: &Arc<FileState>) {
        let mut dir = self.dir.lock();
        dir.frames.remove(&page_id);
        file.inner().lock().resident.remove(&page_id.page_index());
        self.cond.notify_all();
    }

    /// Undoes a failed eviction: the placeholder goes away and the victim,
    /// still dirty, is re-admitted at the FIFO tail.
    fn abort_load_restore_victim(
        &self,
        page_id: PageId,
        file: &Arc<FileState>,
        victim: Arc<Frame>,
    ) {
        let mut dir = self.dir.lock();
        dir.frames.remove(&page_id);
        file.inner().lock().resident.remove(&page_id.page_index());

        let victim_id = victim.page_id();
        victim
            .file()
            .inner()
            .lock()
            .resident
            .insert(victim_id.page_index());
        victim.set_queue_kind(QueueKind::Fifo);
        victim.take_refixed();
        dir.queues.push_fifo(victim_id);
        dir.frames.insert(victim_id, victim);
        self.cond.notify_all();
    }

    /// Drops one pin; the last pin re-enqueues the frame.
    ///
    /// A frame admitted through FIFO that was fixed again while resident
    /// moves to the LRU queue here; every other frame returns to the tail
    /// of the queue it came from.
    pub(crate) fn unpin_frame(&self, frame: &Arc<Frame>) {
        let mut dir = self.dir.lock();
        if frame.unpin() > 0 {
            return;
        }
        debug_assert!(dir.frames.contains_key(&frame.page_id()));

        if frame.queue_kind() == QueueKind::Fifo && frame.take_refixed() {
            frame.set_queue_kind(QueueKind::Lru);
        }
        match frame.queue_kind() {
            QueueKind::Fifo => dir.queues.push_fifo(frame.page_id()),
            QueueKind::Lru => dir.queues.push_lru(frame.page_id()),
        }
        debug_assert!(dir.queues.len() <= dir.frames.len());
        self.cond.notify_all();
    }

    /// Writes a frame's bytes to its file, extending the file when the
    /// page lies past the current end.
    fn write_back(&self, frame: &Frame, data: &[u8]) -> IoResult<()> {
        let offset = frame.page_id().byte_offset(self.config.page_size_bits);
        let file = frame.file();
        file.ops().write_all_at(data, offset)?;

        let mut inner = file.inner().lock();
        inner.size = inner.size.max(offset + data.len() as u64);
        drop(inner);

        self.write_backs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes back one frame if it is resident and dirty.
    ///
    /// Runs under the directory mutex. Taking the shared latch can only
    /// wait for an exclusive page handle, and that handle releases its
    /// latch before it touches the directory.
    fn flush_frame(&self, frame: &Arc<Frame>) -> BufferResult<()> {
        if frame.state() != FrameState::Resident || !frame.is_dirty() {
            return Ok(());
        }
        frame.set_state(FrameState::Writing);
        let data = frame.latch_shared();
        let result = self.write_back(frame, &data);
        drop(data);
        frame.set_state(FrameState::Resident);
        result?;
        frame.clear_dirty();
        Ok(())
    }

    /// Writes back every dirty resident frame.
    pub(crate) fn flush_all(&self) -> BufferResult<()> {
        let dir = self.dir.lock();
        for frame in dir.frames.values() {
            self.flush_frame(frame)?;
        }
        Ok(())
    }

    /// Writes back the dirty resident frames of one file.
    pub(crate) fn flush_file(&self, file: &Arc<FileState>) -> BufferResult<()> {
        let dir = self.dir.lock();
        let resident: Vec<u64> = file.inner().lock().resident.iter().copied().collect();
        for page_index in resident {
            let page_id = PageId::new(file.id(), page_index);
            if let Some(frame) = dir.frames.get(&page_id) {
                self.flush_frame(frame)?;
            }
        }
        Ok(())
    }

    /// Opens a file, aliasing the existing file-state if the canonical
    /// path is already open.
    pub(crate) fn open_file(self: &Arc<Self>, path: &Path) -> BufferResult<FileHandle> {
        let canonical = self.fs.canonicalize(path)?;
        let mut dir = self.dir.lock();
        let state = match dir.registry.get_by_path(&canonical) {
            Some(state) => state,
            None => {
                let ops = self.fs.open(&canonical, OpenOptions::for_create())?;
                let size = ops.size()?;
                let state = dir.registry.insert(canonical, ops, size);
                tracing::debug!(file = %state.id(), path = %state.path().display(), "opened file");
                state
            }
        };
        state.add_handle();
        Ok(FileHandle::new(Arc::clone(self), state))
    }

    /// Releases one file handle; the last release flushes and closes the
    /// file.
    ///
    /// # Panics
    ///
    /// Panics if the file still has a pinned page: dropping the final
    /// handle while page handles are outstanding is a usage error.
    pub(crate) fn close_file(&self, state: &Arc<FileState>) {
        let mut dir = self.dir.lock();
        if state.release_handle() > 0 {
            return;
        }

        let resident: Vec<u64> = state.inner().lock().resident.drain().collect();
        for page_index in resident {
            let page_id = PageId::new(state.id(), page_index);
            let Some(frame) = dir.frames.remove(&page_id) else {
                continue;
            };
            assert_eq!(
                frame.pin_count(),
                0,
                "file {} closed with page {} still pinned",
                state.id(),
                page_id
            );
            dir.queues.remove(&page_id);
            if frame.is_dirty() {
                let data = frame.latch_shared();
                if let Err(err) = self.write_back(&frame, &data) {
                    tracing::error!(page = %page_id, error = %err, "write-back failed while closing file");
                }
            }
        }

        dir.registry.remove(state.id());
        self.cond.notify_all();
        tracing::debug!(file = %state.id(), "closed file");
    }

    /// Resizes a file, dropping resident frames past the new end.
    ///
    /// # Panics
    ///
    /// Panics if a dropped frame is still pinned; callers must release
    /// (and, if shrinking, flush) affected pages first.
    pub(crate) fn truncate_file(&self, state: &Arc<FileState>, new_size: u64) -> BufferResult<()> {
        let first_dropped = new_size.div_ceil(self.config.page_size() as u64);

        let mut dir = self.dir.lock();
        let doomed: Vec<u64> = state
            .inner()
            .lock()
            .resident
            .iter()
            .copied()
            .filter(|&index| index >= first_dropped)
            .collect();
        for page_index in doomed {
            let page_id = PageId::new(state.id(), page_index);
            if let Some(frame) = dir.frames.remove(&page_id) {
                assert_eq!(
                    frame.pin_count(),
                    0,
                    "truncate dropped page {page_id} while it was pinned"
                );
                dir.queues.remove(&page_id);
            }
            state.inner().lock().resident.remove(&page_index);
        }
        self.cond.notify_all();
        drop(dir);

        let mut inner = state.inner().lock();
        state.ops().set_len(new_size)?;
        inner.size = new_size;
        Ok(())
    }

    pub(crate) fn config(&self) -> &BufferConfig {
        &self.config
    }
}

/// Reads one page, zero-filling everything past EOF.
///
/// `buf` must be zeroed on entry; short reads leave the tail untouched.
fn read_page(ops: &dyn FileOps, buf: &mut [u8], offset: u64) -> IoResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = ops.read_at(&mut buf[filled..], offset + filled as u64)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(())
}

/// The paged buffer manager.
///
/// Cheap to share: handles returned by [`open_file`](Self::open_file) keep
/// the underlying state alive, so the manager value itself may be dropped
/// before them.
pub struct BufferManager {
    shared: Arc<Shared>,
}

impl BufferManager {
    /// Creates a buffer manager over the given file system.
    pub fn new(fs: Arc<dyn FileSystem>, config: BufferConfig) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                fs,
                dir: Mutex::new(Directory {
                    frames: HashMap::new(),
                    queues: TwoQueueReplacer::new(),
                    registry: FileRegistry::new(),
                }),
                cond: Condvar::new(),
                fixes: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
                write_backs: AtomicU64::new(0),
            }),
        })
    }

    /// Opens the file at `path`, creating it if it does not exist.
    ///
    /// Opening an already-open path returns a new handle aliasing the same
    /// file-state; the file id is assigned on first open and is the
    /// smallest free id.
    pub fn open_file(&self, path: impl AsRef<Path>) -> BufferResult<FileHandle> {
        self.shared.open_file(path.as_ref())
    }

    /// Writes back all dirty resident frames across all files.
    ///
    /// Returns after every write completed. With nothing dirty, no I/O is
    /// issued.
    pub fn flush(&self) -> BufferResult<()> {
        self.shared.flush_all()
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.shared.config.page_size()
    }

    /// Returns the maximum number of resident frames.
    pub fn page_capacity(&self) -> usize {
        self.shared.config.page_capacity
    }

    /// Returns the number of frames currently in the frame table.
    pub fn frame_count(&self) -> usize {
        self.shared.dir.lock().frames.len()
    }

    /// Returns the FIFO queue contents, eviction candidate first.
    pub fn fifo_page_ids(&self) -> Vec<PageId> {
        self.shared.dir.lock().queues.fifo_snapshot()
    }

    /// Returns the LRU queue contents, least recently used first.
    pub fn lru_page_ids(&self) -> Vec<PageId> {
        self.shared.dir.lock().queues.lru_snapshot()
    }

    /// Returns a snapshot of every frame, ordered by page id.
    pub fn frames(&self) -> Vec<FrameSnapshot> {
        let dir = self.shared.dir.lock();
        let mut snapshots: Vec<FrameSnapshot> =
            dir.frames.values().map(|frame| frame.snapshot()).collect();
        snapshots.sort_by_key(|snap| snap.page_id);
        snapshots
    }

    /// Returns activity counters and current occupancy.
    pub fn stats(&self) -> BufferStats {
        let dir = self.shared.dir.lock();
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in dir.frames.values() {
            if frame.pin_count() > 0 {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }
        BufferStats {
            fixes: self.shared.fixes.load(Ordering::Relaxed),
            hits: self.shared.hits.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            evictions: self.shared.evictions.load(Ordering::Relaxed),
            write_backs: self.shared.write_backs.load(Ordering::Relaxed),
            resident_frames: dir.frames.len(),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }
}

impl std::fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferManager")
            .field("page_size", &self.page_size())
            .field("page_capacity", &self.page_capacity())
            .field("frame_count", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFileSystem;
    use strata_common::types::FileId;

    fn test_manager(capacity: usize) -> (Arc<MemoryFileSystem>, BufferManager) {
        let fs = Arc::new(MemoryFileSystem::new());
        let config = BufferConfig::new().with_capacity(capacity);
        let buffer = BufferManager::new(Arc::clone(&fs) as Arc<dyn FileSystem>, config).unwrap();
        (fs, buffer)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let fs = Arc::new(MemoryFileSystem::new());
        let config = BufferConfig::new().with_capacity(0);
        assert!(matches!(
            BufferManager::new(fs, config),
            Err(BufferError::Config { .. })
        ));
    }

    #[test]
    fn test_fix_write_read_roundtrip() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/round.db").unwrap();

        {
            let mut page = file.fix_page(0, true).unwrap();
            page.data_mut()[..8].copy_from_slice(&42u64.to_le_bytes());
            page.mark_dirty();
        }

        let page = file.fix_page(0, false).unwrap();
        assert_eq!(&page.data()[..8], &42u64.to_le_bytes());
        assert_eq!(page.data().len(), buffer.page_size());
    }

    #[test]
    fn test_fix_past_eof_zero_fills() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/zero.db").unwrap();

        let page = file.fix_page(100, false).unwrap();
        assert!(page.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_same_path_aliases_one_file() {
        let (_fs, buffer) = test_manager(4);
        let a = buffer.open_file("/alias.db").unwrap();
        let b = buffer.open_file("/x/../alias.db").unwrap();
        assert_eq!(a.file_id(), b.file_id());

        // A write through one handle is visible through the other.
        {
            let mut page = a.fix_page(0, true).unwrap();
            page.data_mut()[0] = 7;
            page.mark_dirty();
        }
        let page = b.fix_page(0, false).unwrap();
        assert_eq!(page.data()[0], 7);
    }

    #[test]
    fn test_admission_and_promotion() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/queues.db").unwrap();
        let id = |index| PageId::new(file.file_id(), index);

        file.fix_page(0, false).unwrap();
        assert_eq!(buffer.fifo_page_ids(), vec![id(0)]);
        assert!(buffer.lru_page_ids().is_empty());

        file.fix_page(0, false).unwrap();
        assert!(buffer.fifo_page_ids().is_empty());
        assert_eq!(buffer.lru_page_ids(), vec![id(0)]);
    }

    #[test]
    fn test_pinned_page_not_queued() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/pin.db").unwrap();

        let page = file.fix_page(0, false).unwrap();
        assert!(buffer.fifo_page_ids().is_empty());
        let frames = buffer.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pin_count, 1);
        assert_eq!(frames[0].state, FrameState::Resident);

        drop(page);
        assert_eq!(buffer.fifo_page_ids().len(), 1);
        assert_eq!(buffer.frames()[0].pin_count, 0);
    }

    #[test]
    fn test_eviction_respects_capacity() {
        let (_fs, buffer) = test_manager(2);
        let file = buffer.open_file("/cap.db").unwrap();

        for index in 0..5 {
            file.fix_page(index, false).unwrap();
            assert!(buffer.frame_count() <= 2);
        }
        let stats = buffer.stats();
        assert_eq!(stats.misses, 5);
        assert_eq!(stats.evictions, 3);
    }

    #[test]
    fn test_dirty_eviction_persists() {
        let (_fs, buffer) = test_manager(1);
        let file = buffer.open_file("/spill.db").unwrap();

        {
            let mut page = file.fix_page(0, true).unwrap();
            page.data_mut()[..2].copy_from_slice(b"hi");
            page.mark_dirty();
        }
        // Fixing another page evicts page 0 and writes it back.
        file.fix_page(1, false).unwrap();
        assert_eq!(buffer.stats().write_backs, 1);

        let page = file.fix_page(0, false).unwrap();
        assert_eq!(&page.data()[..2], b"hi");
    }

    #[test]
    fn test_flush_clears_dirty_and_is_idempotent() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/flush.db").unwrap();

        {
            let mut page = file.fix_page(0, true).unwrap();
            page.data_mut()[0] = 1;
            page.mark_dirty();
        }
        assert_eq!(buffer.stats().dirty_frames, 1);

        buffer.flush().unwrap();
        assert_eq!(buffer.stats().dirty_frames, 0);
        assert_eq!(buffer.stats().write_backs, 1);

        buffer.flush().unwrap();
        assert_eq!(buffer.stats().write_backs, 1);
    }

    #[test]
    fn test_close_writes_back_and_frees_id() {
        let (fs, buffer) = test_manager(4);
        {
            let file = buffer.open_file("/close.db").unwrap();
            let mut page = file.fix_page(0, true).unwrap();
            page.data_mut()[..3].copy_from_slice(b"end");
            page.mark_dirty();
            drop(page);
        }
        // Handle dropped: frames are gone, contents persisted.
        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(fs.size_of(Path::new("/close.db")).unwrap(), 8192);

        // The freed id is assigned to the next open.
        let other = buffer.open_file("/other.db").unwrap();
        assert_eq!(other.file_id(), FileId::new(0));
    }

    #[test]
    fn test_stats_hits_and_misses() {
        let (_fs, buffer) = test_manager(4);
        let file = buffer.open_file("/stats.db").unwrap();

        file.fix_page(0, false).unwrap();
        file.fix_page(0, false).unwrap();
        file.fix_page(1, false).unwrap();

        let stats = buffer.stats();
        assert_eq!(stats.fixes, 3);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_ratio() - 1.0 / 3.0).abs() < 1e-9);
    }
}
