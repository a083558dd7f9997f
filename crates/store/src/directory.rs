use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use grading::store::validate_path;
use grading::{FileStore, StoreError, WriteOutcome};
use tracing::debug;

const TEMP_SUFFIX: &str = ".tmp";

/// A [`FileStore`] rooted at a local directory.
///
/// Store paths map onto files below the root; parent directories are created
/// on write. Writes go through a temporary sibling file and a rename so a
/// reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens a store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| io_error(&root.display().to_string(), source))?;
        Ok(Self { root })
    }

    /// The directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        validate_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, segment| acc.join(segment)))
    }

    fn collect(&self, dir: &Path, relative: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            let path = if relative.is_empty() {
                name
            } else {
                format!("{relative}/{name}")
            };
            if entry.file_type()?.is_dir() {
                self.collect(&entry.path(), &path, out)?;
            } else {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl FileStore for DirectoryStore {
    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        let file = self.resolve(path)?;
        match fs::read_to_string(&file) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(path, source)),
        }
    }

    fn write(&mut self, path: &str, contents: &str, overwrite: bool) -> Result<WriteOutcome, StoreError> {
        let file = self.resolve(path)?;
        let outcome = if file.exists() {
            if !overwrite {
                debug!(path, "file exists; not overwriting");
                return Ok(WriteOutcome::Skipped);
            }
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Created
        };

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
        }
        let mut temp = file.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        let written = fs::File::create(&temp)
            .and_then(|mut handle| {
                handle.write_all(contents.as_bytes())?;
                handle.flush()
            })
            .and_then(|()| fs::rename(&temp, &file));
        if let Err(source) = written {
            let _ = fs::remove_file(&temp);
            return Err(io_error(path, source));
        }

        debug!(path, ?outcome, "wrote file");
        Ok(outcome)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut paths = Vec::new();
        self.collect(&self.root, "", &mut paths)
            .map_err(|source| io_error(prefix, source))?;
        paths.retain(|path| path.starts_with(prefix));
        paths.sort();
        Ok(paths)
    }
}

fn io_error(path: &str, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path()).unwrap();

        assert_eq!(store.write("lab1/forms/a_b.json", "{}", false).unwrap(), WriteOutcome::Created);
        assert!(dir.path().join("lab1").join("forms").join("a_b.json").is_file());
        assert_eq!(store.read("lab1/forms/a_b.json").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.read("lab1/forms/c.json").unwrap(), None);
    }

    #[test]
    fn test_overwrite_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path()).unwrap();
        store.write("status.json", "1", false).unwrap();
        assert_eq!(store.write("status.json", "2", false).unwrap(), WriteOutcome::Skipped);
        assert_eq!(store.read("status.json").unwrap().as_deref(), Some("1"));
        assert_eq!(store.write("status.json", "3", true).unwrap(), WriteOutcome::Replaced);
        assert_eq!(store.read("status.json").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_list_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path()).unwrap();
        for path in ["lab1/reports/b_grades.md", "lab1/reports/a_grades.md", "lab2/weights.json"] {
            store.write(path, "", true).unwrap();
        }
        assert_eq!(
            store.list("lab1/").unwrap(),
            vec!["lab1/reports/a_grades.md", "lab1/reports/b_grades.md"]
        );
        assert!(store.list("").unwrap().iter().all(|p| !p.ends_with(".tmp")));
    }

    #[test]
    fn test_open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("grades");
        let store = DirectoryStore::open(&root).unwrap();
        assert!(store.root().is_dir());
    }
}
