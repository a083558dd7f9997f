//! Port for the remote file store holding course documents.
//!
//! The store is a flat key-value space of `/`-separated paths. Each file is
//! created, read or replaced atomically; there are no guarantees across
//! files. The `store` crate supplies implementations.

use thiserror::Error;

/// Errors raised by a [`FileStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path is empty, absolute, or escapes the store root.
    #[error("Invalid store path \"{path}\"")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// The backing medium failed.
    #[error("Store I/O failed for \"{path}\": {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// What a [`FileStore::write`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist and was created.
    Created,
    /// The file existed and was overwritten.
    Replaced,
    /// The file existed and `overwrite` was false; nothing changed.
    Skipped,
}

/// Create, read and list operations over a remote file store.
pub trait FileStore {
    /// Returns the contents of `path`, or `None` if it does not exist.
    fn read(&self, path: &str) -> Result<Option<String>, StoreError>;

    /// Writes `contents` to `path`. An existing file is replaced only when
    /// `overwrite` is set.
    fn write(&mut self, path: &str, contents: &str, overwrite: bool) -> Result<WriteOutcome, StoreError>;

    /// Lists every file path starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

impl<S: FileStore + ?Sized> FileStore for &mut S {
    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        (**self).read(path)
    }

    fn write(&mut self, path: &str, contents: &str, overwrite: bool) -> Result<WriteOutcome, StoreError> {
        (**self).write(path, contents, overwrite)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).list(prefix)
    }
}

/// Checks that `path` is a relative, normalised store path.
pub fn validate_path(path: &str) -> Result<(), StoreError> {
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPath {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("lab1/forms/a_b.json").is_ok());
        assert!(validate_path("status.json").is_ok());
        for bad in ["", "/etc/passwd", "lab1/../secret", "lab1//x", "a\\b", "./x"] {
            assert!(validate_path(bad).is_err(), "{bad}");
        }
    }
}
