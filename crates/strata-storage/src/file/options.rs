//! File open options.

use std::fs;

/// Options for opening files.
///
/// A cut-down mirror of `std::fs::OpenOptions` that both file-system
/// backends understand.
///
/// # Example
///
/// ```rust
/// use strata_storage::file::OpenOptions;
///
/// let options = OpenOptions::new().read(true).write(true).create(true);
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Open for reading.
    pub(crate) read: bool,
    /// Open for writing.
    pub(crate) write: bool,
    /// Truncate existing file.
    pub(crate) truncate: bool,
    /// Create file if it doesn't exist.
    pub(crate) create: bool,
    /// Create file, fail if it exists.
    pub(crate) create_new: bool,
}

impl OpenOptions {
    /// Creates a new set of options with every flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: false,
            write: false,
            truncate: false,
            create: false,
            create_new: false,
        }
    }

    /// Sets the option for read access.
    #[must_use]
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Sets the option for write access.
    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Sets the option for truncating an existing file on open.
    #[must_use]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Sets the option to create the file if it doesn't exist.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Sets the option to create a new file, failing if it exists.
    #[must_use]
    pub fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    /// Returns true if write access is enabled.
    #[inline]
    pub fn is_write(&self) -> bool {
        self.write
    }

    /// Converts to `std::fs::OpenOptions`.
    pub fn to_std_options(&self) -> fs::OpenOptions {
        let mut opts = fs::OpenOptions::new();
        opts.read(self.read)
            .write(self.write)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        opts
    }

    /// Preset for read-only access.
    #[must_use]
    pub fn for_read() -> Self {
        Self::new().read(true)
    }

    /// Preset for read-write access to an existing file.
    #[must_use]
    pub fn for_write() -> Self {
        Self::new().read(true).write(true)
    }

    /// Preset for read-write access, creating the file if missing.
    #[must_use]
    pub fn for_create() -> Self {
        Self::new().read(true).write(true).create(true)
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = OpenOptions::new();
        assert!(!opts.read);
        assert!(!opts.write);
        assert!(!opts.create);
    }

    #[test]
    fn test_builder() {
        let opts = OpenOptions::new().read(true).write(true).create(true);
        assert!(opts.read);
        assert!(opts.is_write());
        assert!(opts.create);
    }

    #[test]
    fn test_presets() {
        assert!(!OpenOptions::for_read().is_write());
        assert!(OpenOptions::for_write().is_write());

        let opts = OpenOptions::for_create();
        assert!(opts.read && opts.write && opts.create && !opts.create_new);
    }
}
