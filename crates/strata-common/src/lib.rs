//! # strata-common
//!
//! Common types and constants for the strata buffer manager.
//!
//! This crate provides the foundational pieces shared by every layer:
//!
//! - **Types**: strongly-typed identifiers (`FileId`, `PageId`)
//! - **Constants**: system-wide defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{FileId, PageId};
//!
//! let file = FileId::new(0);
//! let page = PageId::new(file, 42);
//! assert_eq!(page.page_index(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{FileId, PageId};
