//! The rubric catalog: reusable, named scoring criteria.
//!
//! Loaded once from configuration and passed explicitly to the
//! [`RubricSnippetParser`](crate::RubricSnippetParser).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::weights::validate_weights;
use crate::{GradingError, RubricKey};

/// One named rubric type.
///
/// A rubric is either single-row (one criterion worth the assigned points)
/// or multi-row, in which case each row receives `fraction × points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCatalogEntry {
    /// Display name used in grading form criterion labels.
    pub name: String,

    /// Ordered sub-rows and their fractional weights. Fractions sum to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<IndexMap<String, f64>>,
}

impl RubricCatalogEntry {
    /// A single-row rubric.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: None,
        }
    }

    /// A multi-row rubric.
    pub fn with_rows<K: Into<String>>(
        name: impl Into<String>,
        rows: impl IntoIterator<Item = (K, f64)>,
    ) -> Self {
        Self {
            name: name.into(),
            rows: Some(rows.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Expands `points` into `(criterion label, absolute weight)` pairs.
    ///
    /// Row weights are rounded to five decimals to keep float noise out of the
    /// persisted weight documents.
    pub fn criteria(&self, points: f64) -> Vec<(String, f64)> {
        match &self.rows {
            Some(rows) => rows
                .iter()
                .map(|(row, fraction)| {
                    (
                        format!("{}: {}", self.name, row),
                        crate::types::round_to(fraction * points, 5),
                    )
                })
                .collect(),
            None => vec![(self.name.clone(), points)],
        }
    }
}

/// Mapping from rubric key to catalog entry.
///
/// Construction through [`RubricCatalog::new`] or [`RubricCatalog::from_json`]
/// guarantees every multi-row entry's fractions sum to 1.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RubricCatalog {
    entries: IndexMap<RubricKey, RubricCatalogEntry>,
}

impl RubricCatalog {
    /// Builds a catalog, validating the row fractions of every entry.
    pub fn new(
        entries: impl IntoIterator<Item = (RubricKey, RubricCatalogEntry)>,
    ) -> Result<Self, GradingError> {
        let catalog = Self {
            entries: entries.into_iter().collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses and validates a catalog from its JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        let entries: IndexMap<RubricKey, RubricCatalogEntry> =
            serde_json::from_str(json).map_err(|source| GradingError::MalformedDocument {
                document: "rubric catalog",
                source,
            })?;
        Self::new(entries)
    }

    fn validate(&self) -> Result<(), GradingError> {
        for (key, entry) in &self.entries {
            if let Some(rows) = &entry.rows {
                validate_weights(&format!("rubric \"{key}\""), rows.values().copied())?;
            }
        }
        Ok(())
    }

    /// Looks up a rubric by key.
    pub fn get(&self, key: &str) -> Option<&RubricCatalogEntry> {
        self.entries.get(key)
    }

    /// Number of rubrics in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "code": {"name": "Code Quality"},
        "writing": {"name": "Writing", "rows": {"clarity": 0.6, "grammar": 0.4}}
    }"#;

    #[test]
    fn test_load_catalog() {
        let catalog = RubricCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("code").unwrap().name, "Code Quality");
        assert!(catalog.get("spark").is_none());
    }

    #[test]
    fn test_rows_must_sum_to_one() {
        let json = r#"{"writing": {"name": "Writing", "rows": {"clarity": 0.6, "grammar": 0.3}}}"#;
        let err = RubricCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, GradingError::WeightSum { .. }));
    }

    #[test]
    fn test_malformed_catalog() {
        let err = RubricCatalog::from_json(r#"{"code": 3}"#).unwrap_err();
        assert!(matches!(err, GradingError::MalformedDocument { .. }));
    }

    #[test]
    fn test_row_expansion_conserves_points() {
        let entry = RubricCatalogEntry::with_rows(
            "Mechanics",
            [("accuracy", 0.5), ("reasoning", 0.3), ("style", 0.2)],
        );
        for points in [1.0, 2.5, 3.0, 7.0, 10.0] {
            let total: f64 = entry.criteria(points).iter().map(|(_, w)| w).sum();
            assert!((total - points).abs() < 1e-5, "points {points} gave {total}");
        }
    }

    #[test]
    fn test_single_row_expansion() {
        let entry = RubricCatalogEntry::single("Code Quality");
        assert_eq!(entry.criteria(2.0), vec![("Code Quality".to_string(), 2.0)]);
    }
}
