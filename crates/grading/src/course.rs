//! Course configuration and the final weighted course grade.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{Cell, MarkdownTable};
use crate::weights::validate_weights;
use crate::{AssessmentName, GradingError};

/// Label of the final row of a course grade report.
pub const COURSE_GRADE_LABEL: &str = "Course Grade";

const MAX_COURSE_GRADE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-assessment entry of `course_config.json`.
///
/// Scheduling metadata the grading engine does not use is ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Fraction of the course grade.
    pub weight: f64,

    /// Peer reviews each group performs; `0` disables peer review.
    #[serde(rename = "peer-review", default)]
    pub peer_review: u32,

    /// Largest group a partner request may form.
    #[serde(rename = "max-group-size", default, skip_serializing_if = "Option::is_none")]
    pub max_group_size: Option<usize>,

    /// Assessment document the rubric directives are read from.
    #[serde(rename = "main-file", default, skip_serializing_if = "Option::is_none")]
    pub main_file: Option<String>,
}

impl AssessmentConfig {
    /// Returns `true` if groups review each other's work.
    pub fn peer_review_enabled(&self) -> bool {
        self.peer_review > 0
    }
}

/// The ordered set of assessments making up a course.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseConfig {
    assessments: IndexMap<AssessmentName, AssessmentConfig>,
}

impl CourseConfig {
    /// Builds a configuration from assessments in course order.
    pub fn new(assessments: impl IntoIterator<Item = (AssessmentName, AssessmentConfig)>) -> Self {
        Self {
            assessments: assessments.into_iter().collect(),
        }
    }

    /// Parses `course_config.json` and checks each entry with [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        let config: Self = serde_json::from_str(json).map_err(|source| GradingError::MalformedDocument {
            document: "course configuration",
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every weight is a finite, non-negative fraction and every
    /// `max-group-size` admits at least one student.
    ///
    /// The weight sum is checked separately by [`CourseGradeAggregator::new`].
    pub fn validate(&self) -> Result<(), GradingError> {
        for (name, assessment) in &self.assessments {
            if !assessment.weight.is_finite() || assessment.weight < 0.0 {
                return Err(GradingError::InvalidConfiguration {
                    message: format!("assessment \"{name}\" has invalid weight {}", assessment.weight),
                });
            }
            if assessment.max_group_size == Some(0) {
                return Err(GradingError::InvalidConfiguration {
                    message: format!("assessment \"{name}\" has a max-group-size of 0"),
                });
            }
        }
        Ok(())
    }

    /// Looks up one assessment.
    pub fn assessment(&self, name: &str) -> Option<&AssessmentConfig> {
        self.assessments.get(name)
    }

    /// Iterates over assessments in course order.
    pub fn assessments(&self) -> impl Iterator<Item = (&AssessmentName, &AssessmentConfig)> {
        self.assessments.iter()
    }

    /// Assessment names in course order.
    pub fn names(&self) -> impl Iterator<Item = &AssessmentName> {
        self.assessments.keys()
    }

    /// Number of assessments.
    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    /// Returns `true` if no assessments are configured.
    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// A student's final course grade.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseGradeReport {
    /// Rendered `Assessment | Weight | Grade` table.
    pub report: String,
    /// Weighted grade, capped at 100 and rounded to an integer.
    pub grade: u32,
}

/// Combines per-assessment grades into a course grade.
#[derive(Debug, Clone)]
pub struct CourseGradeAggregator {
    weights: IndexMap<AssessmentName, f64>,
}

impl CourseGradeAggregator {
    /// Builds an aggregator, failing if the course weights do not sum to 1.
    pub fn new(config: &CourseConfig) -> Result<Self, GradingError> {
        let weights: IndexMap<AssessmentName, f64> = config
            .assessments()
            .map(|(name, assessment)| (name.clone(), assessment.weight))
            .collect();
        validate_weights("course", weights.values().copied())?;
        Ok(Self { weights })
    }

    /// Computes `Σ grade·weight / Σ weight` over every configured assessment.
    ///
    /// Grades are percentages. Every configured assessment needs a grade;
    /// extra entries in `grades` are ignored.
    pub fn aggregate(
        &self,
        grades: &IndexMap<AssessmentName, f64>,
    ) -> Result<CourseGradeReport, GradingError> {
        let mut table = MarkdownTable::new(["Assessment", "Weight", "Grade"]);
        let (mut numerator, mut denominator) = (0.0, 0.0);

        for (name, &weight) in &self.weights {
            let grade = *grades
                .get(name)
                .ok_or_else(|| GradingError::MissingAssessmentGrade {
                    assessment: name.to_string(),
                })?;
            numerator += grade * weight;
            denominator += weight;
            table.push_row(vec![name.as_str().into(), weight.into(), grade.into()]);
        }

        let weighted = if denominator == 0.0 { 0.0 } else { numerator / denominator };
        let grade = weighted.min(MAX_COURSE_GRADE).max(0.0).round_ties_even() as u32;
        debug!(weighted, grade, "computed course grade");

        table.push_row(vec![
            COURSE_GRADE_LABEL.into(),
            Cell::empty(),
            Cell::Text(format!("**{grade}%**")),
        ]);

        Ok(CourseGradeReport {
            report: table.render(),
            grade,
        })
    }
}
