//! Buffer manager configuration.

use strata_common::constants::{
    DEFAULT_PAGE_CAPACITY, DEFAULT_PAGE_SIZE_BITS, MAX_PAGE_SIZE_BITS, MIN_PAGE_SIZE_BITS,
};

/// Configuration for the buffer manager.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Maximum number of resident page frames.
    pub page_capacity: usize,
    /// Page-size shift: pages are `1 << page_size_bits` bytes.
    pub page_size_bits: u8,
}

impl BufferConfig {
    /// Creates the default configuration (1024 frames of 8 KiB pages).
    pub fn new() -> Self {
        Self {
            page_capacity: DEFAULT_PAGE_CAPACITY,
            page_size_bits: DEFAULT_PAGE_SIZE_BITS,
        }
    }

    /// Sets the number of resident page frames.
    #[must_use]
    pub fn with_capacity(mut self, page_capacity: usize) -> Self {
        self.page_capacity = page_capacity;
        self
    }

    /// Sets the page-size shift.
    #[must_use]
    pub fn with_page_size_bits(mut self, page_size_bits: u8) -> Self {
        self.page_size_bits = page_size_bits;
        self
    }

    /// Returns the page size in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        1usize << self.page_size_bits
    }

    /// Returns the total memory used by a full pool.
    pub fn memory_usage(&self) -> usize {
        self.page_capacity * self.page_size()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.page_capacity == 0 {
            return Err("page_capacity must be > 0");
        }
        if self.page_size_bits < MIN_PAGE_SIZE_BITS {
            return Err("page_size_bits below supported minimum");
        }
        if self.page_size_bits > MAX_PAGE_SIZE_BITS {
            return Err("page_size_bits above supported maximum");
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new()
    }
}
