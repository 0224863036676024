//! # strata-storage
//!
//! Paged file-system buffer manager for the strata analytics engine.
//!
//! The buffer manager mediates between byte-granular clients and an
//! underlying file system, delivering fixed-size pages through a pin/unpin
//! interface with bounded resident memory, write-back persistence, and safe
//! concurrent access. The backing file system is abstracted behind the
//! [`file::FileSystem`] capability so the same cache runs against a real
//! filesystem or an in-memory one.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer manager: frame table, replacement, file registry, handles
pub mod buffer;

/// File-operations capability and its backends
pub mod file;
