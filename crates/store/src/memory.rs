use std::collections::BTreeMap;

use grading::store::validate_path;
use grading::{FileStore, StoreError, WriteOutcome};

/// A [`FileStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files stored.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        validate_path(path)?;
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &str, contents: &str, overwrite: bool) -> Result<WriteOutcome, StoreError> {
        validate_path(path)?;
        let outcome = match self.files.get(path) {
            None => WriteOutcome::Created,
            Some(_) if overwrite => WriteOutcome::Replaced,
            Some(_) => return Ok(WriteOutcome::Skipped),
        };
        self.files.insert(path.to_string(), contents.to_string());
        Ok(outcome)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .files
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }
}
