//! Loading the course configuration files from the course directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grading::{CourseConfig, RubricCatalog, StudentLogin};
use indexmap::IndexMap;
use tracing::debug;
use workflow::CourseSettings;

pub const RUBRIC_CONFIG_FILE: &str = "rubric_config.json";
pub const COURSE_CONFIG_FILE: &str = "course_config.json";
pub const SETTINGS_FILE: &str = "coursework.json";

/// Everything read from the course directory before a command runs.
#[derive(Debug)]
pub struct CourseFiles {
    pub root: PathBuf,
    pub catalog: RubricCatalog,
    pub course: CourseConfig,
    pub settings: CourseSettings,
}

impl CourseFiles {
    pub fn load(root: &Path) -> Result<Self> {
        let catalog = RubricCatalog::from_json(&read(&root.join(RUBRIC_CONFIG_FILE))?)
            .with_context(|| format!("Invalid {RUBRIC_CONFIG_FILE}"))?;
        let course = CourseConfig::from_json(&read(&root.join(COURSE_CONFIG_FILE))?)
            .with_context(|| format!("Invalid {COURSE_CONFIG_FILE}"))?;
        let settings = CourseSettings::from_json(&read(&root.join(SETTINGS_FILE))?)
            .with_context(|| format!("Invalid {SETTINGS_FILE}"))?;
        debug!(
            rubrics = catalog.len(),
            assessments = course.len(),
            course = %settings.name,
            "loaded course configuration"
        );
        Ok(Self {
            root: root.to_path_buf(),
            catalog,
            course,
            settings,
        })
    }

    /// Resolves a path given on the command line or in the course config
    /// against the course directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parses a roster: one login per line, blank lines and `#` comments skipped.
pub fn parse_roster(text: &str) -> Vec<StudentLogin> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(StudentLogin::new)
        .collect()
}

/// Parses partner requests: a JSON object from login to request text.
pub fn parse_requests(json: &str) -> Result<IndexMap<StudentLogin, String>> {
    serde_json::from_str(json).context("Partner requests must be a JSON object of login to text")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster() {
        let roster = parse_roster("# section 1\nann\n\n  bob \ncat\n");
        let names: Vec<&str> = roster.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["ann", "bob", "cat"]);
    }

    #[test]
    fn test_parse_requests() {
        let requests = parse_requests(r#"{"ann": "bob", "bob": "ann, cat"}"#).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], "ann, cat");
        assert!(parse_requests("[1, 2]").is_err());
    }

    #[test]
    fn test_load_course_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(RUBRIC_CONFIG_FILE), r#"{"code": {"name": "Code"}}"#).unwrap();
        fs::write(
            dir.path().join(COURSE_CONFIG_FILE),
            r#"{"lab1": {"weight": 1.0, "main-file": "lab1.md"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{"name": "DSCI 100"}"#).unwrap();

        let files = CourseFiles::load(dir.path()).unwrap();
        assert_eq!(files.settings.name, "DSCI 100");
        assert_eq!(files.resolve(Path::new("lab1.md")), dir.path().join("lab1.md"));

        fs::remove_file(dir.path().join(SETTINGS_FILE)).unwrap();
        let err = CourseFiles::load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains(SETTINGS_FILE));
    }
}
