//! Core type definitions.

mod ids;

pub use ids::{FileId, PageId};
