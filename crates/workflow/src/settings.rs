//! Course-wide settings from `coursework.json`.

use grading::{GradeMapping, GradingError, PeerReviewShare, ReportMode};
use serde::Deserialize;

/// Settings shared by every assessment of a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseSettings {
    /// Course name, used in report headings and as the course key in `status.json`.
    pub name: String,

    /// Remaps raw scores before weighting.
    #[serde(rename = "grade-mapping", default)]
    pub grade_mapping: Option<GradeMapping>,

    /// Returned reports show only the overall table.
    #[serde(rename = "score-only", default = "default_score_only")]
    pub score_only: bool,

    /// Share of each assessment total given to peer review.
    #[serde(rename = "peer-review-share", default)]
    pub peer_review_share: PeerReviewShare,
}

fn default_score_only() -> bool {
    true
}

impl CourseSettings {
    /// Settings with defaults for everything but the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grade_mapping: None,
            score_only: default_score_only(),
            peer_review_share: PeerReviewShare::default(),
        }
    }

    /// Parses `coursework.json`.
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        serde_json::from_str(json).map_err(|source| GradingError::MalformedDocument {
            document: "course settings",
            source,
        })
    }

    /// Report layout implied by `score_only`.
    pub fn report_mode(&self) -> ReportMode {
        if self.score_only {
            ReportMode::ScoreOnly
        } else {
            ReportMode::Detailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CourseSettings::from_json(r#"{"name": "DSCI 100"}"#).unwrap();
        assert_eq!(settings.name, "DSCI 100");
        assert!(settings.grade_mapping.is_none());
        assert_eq!(settings.report_mode(), ReportMode::ScoreOnly);
        assert_eq!(settings.peer_review_share, PeerReviewShare::default());
    }

    #[test]
    fn test_full_settings() {
        let settings = CourseSettings::from_json(
            r#"{"name": "CPSC 340", "score-only": false, "peer-review-share": 0.2,
                "grade-mapping": {"0": 0, "1": 0.5, "2": 1}}"#,
        )
        .unwrap();
        assert_eq!(settings.report_mode(), ReportMode::Detailed);
        assert_eq!(settings.peer_review_share.as_f64(), 0.2);
        let mapping = settings.grade_mapping.unwrap();
        assert_eq!(mapping.map(1.0).unwrap(), 0.5);
    }

    #[test]
    fn test_invalid_share_rejected() {
        assert!(CourseSettings::from_json(r#"{"name": "x", "peer-review-share": 1.5}"#).is_err());
    }
}
