//! Paged buffer manager.
//!
//! The buffer manager keeps a bounded number of fixed-size pages resident
//! in memory and mediates every access to them:
//!
//! - **Pin/unpin**: pages are fixed through scoped handles; a pinned page
//!   cannot be evicted and its bytes stay at a stable address.
//! - **Latching**: each frame carries a reader/writer latch; exclusive
//!   fixes serialize with every other access to the same page.
//! - **Replacement**: a two-queue policy; frames enter a FIFO list on
//!   admission and are promoted to an LRU list on their second access.
//!   Victims come from the FIFO head, then the LRU head.
//! - **Write-back**: dirty frames are persisted before eviction and on
//!   flush; clean frames are discarded.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      BufferManager                       │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │           directory mutex (one Mutex)              │  │
//! │  │  frame table   HashMap<PageId, Arc<Frame>>         │  │
//! │  │  replacer      FIFO + LRU queues of evictables     │  │
//! │  │  registry      path → FileId → FileState           │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │         │ fix_page                  │ open_file          │
//! │         ▼                           ▼                    │
//! │     PageGuard  ──pins──▶  Frame    FileHandle            │
//! │                           (latch, dirty, pin count)      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_storage::buffer::{BufferConfig, BufferManager};
//! use strata_storage::file::StandardFileSystem;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let fs = Arc::new(StandardFileSystem::new());
//!     let buffer = BufferManager::new(fs, BufferConfig::new())?;
//!
//!     let file = buffer.open_file("data.db")?;
//!     let mut page = file.fix_page(0, true)?;
//!     page.data_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
//!     page.mark_dirty();
//!     drop(page);
//!
//!     buffer.flush()?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod eviction;
mod frame;
mod handle;
mod latch;
mod manager;
mod registry;

pub use config::BufferConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{FrameSnapshot, FrameState};
pub use handle::FileHandle;
pub use latch::PageGuard;
pub use manager::BufferManager;

/// Counters describing the buffer manager's activity since construction.
#[derive(Debug, Clone, Default)]
pub struct BufferStats {
    /// Total number of page fixes.
    pub fixes: u64,
    /// Fixes served from a resident frame.
    pub hits: u64,
    /// Fixes that had to load the page.
    pub misses: u64,
    /// Frames whose buffer was reclaimed for another page.
    pub evictions: u64,
    /// Dirty frames written back (flush, eviction, close).
    pub write_backs: u64,
    /// Frames currently resident.
    pub resident_frames: usize,
    /// Resident frames with at least one pin.
    pub pinned_frames: usize,
    /// Resident frames with unwritten modifications.
    pub dirty_frames: usize,
}

impl BufferStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fixes == 0 {
            0.0
        } else {
            self.hits as f64 / self.fixes as f64
        }
    }
}
