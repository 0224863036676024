//! File-operations capability consumed by the buffer manager.
//!
//! This module abstracts the backing store behind a pair of traits so the
//! buffer manager runs unchanged against different environments:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         FileSystem / FileOps            │
//! │   (open, read_at, write_at, set_len)    │
//! └─────────────────────────────────────────┘
//!              │                   │
//!              ▼                   ▼
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │  StandardFileSystem │  │  MemoryFileSystem   │
//! │  (std::fs, on disk) │  │  (in-process, RAM)  │
//! └─────────────────────┘  └─────────────────────┘
//! ```
//!
//! All operations are blocking and position-based (pread/pwrite style), so
//! a single handle can be shared by concurrent threads. Short reads at EOF
//! are expected; callers zero-fill the tail.

mod error;
mod memory;
mod ops;
mod options;
mod std_io;

pub use error::{IoError, IoResult};
pub use memory::{MemoryFile, MemoryFileSystem};
pub use ops::{FileOps, FileSystem};
pub use options::OpenOptions;
pub use std_io::{StandardFile, StandardFileSystem};
