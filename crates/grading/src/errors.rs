//! Error types for the grading domain.
//!
//! [`GradingError`] covers every condition that aborts a single computation
//! (one assessment document, one group's form, one course report). None of
//! these are retryable: the inputs are already resident and every computation
//! is deterministic, so the caller must fix the offending document or
//! configuration and run again. Other groups and assessments are unaffected.
//!
//! Store failures live in [`crate::store::StoreError`] next to the port they
//! belong to.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors produced by the grading and grouping engine.
///
/// Variants fall into four families:
///
/// - **Assessment documents**: [`DuplicateExercise`](Self::DuplicateExercise),
///   [`UnknownRubric`](Self::UnknownRubric),
///   [`DeprecatedRubric`](Self::DeprecatedRubric),
///   [`InvalidPoints`](Self::InvalidPoints),
///   [`InvalidDirective`](Self::InvalidDirective).
/// - **Grading forms**: [`PartialGrading`](Self::PartialGrading),
///   [`InvalidScore`](Self::InvalidScore),
///   [`MissingWeight`](Self::MissingWeight),
///   [`UnmappedScore`](Self::UnmappedScore).
/// - **Configuration**: [`WeightSum`](Self::WeightSum),
///   [`InvalidConfiguration`](Self::InvalidConfiguration),
///   [`MissingAssessmentGrade`](Self::MissingAssessmentGrade).
/// - **Internal invariants**:
///   [`GroupInvariantViolation`](Self::GroupInvariantViolation).
#[derive(Debug, Error)]
pub enum GradingError {
    /// Two rubric directives resolved to the same exercise name.
    ///
    /// Produced by: rubric snippet parser.
    #[error("The exercise name \"{exercise}\" appears more than once in the assessment document")]
    DuplicateExercise {
        /// The colliding exercise name.
        exercise: String,
    },

    /// A directive referenced a rubric key absent from the catalog.
    ///
    /// Produced by: rubric snippet parser.
    #[error("Unrecognized rubric \"{rubric}\" in exercise \"{exercise}\"")]
    UnknownRubric {
        /// The unrecognised catalog key.
        rubric: String,
        /// Exercise containing the directive.
        exercise: String,
    },

    /// A directive used the retired `spark` rubric.
    ///
    /// Extra credit is expressed by putting "optional" or "bonus" in the
    /// exercise name instead.
    #[error(
        "The \"spark\" rubric is no longer accepted (exercise \"{exercise}\"); \
         mark the exercise as optional or bonus in its name instead"
    )]
    DeprecatedRubric {
        /// Exercise containing the directive.
        exercise: String,
    },

    /// The point value attached to a rubric key is not a number.
    ///
    /// Produced by: rubric snippet parser.
    #[error("Failed to convert \"{token}\" to a number of points for rubric \"{rubric}\" in exercise \"{exercise}\"")]
    InvalidPoints {
        /// Rubric key whose value failed to parse.
        rubric: String,
        /// Exercise containing the directive.
        exercise: String,
        /// The original token, preserved for diagnostics.
        token: String,
    },

    /// A directive's inline mapping could not be read.
    #[error("Malformed rubric directive \"{directive}\": {reason}")]
    InvalidDirective {
        /// Raw text of the directive literal.
        directive: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Some, but not all, criteria of an exercise have been graded.
    ///
    /// Produced by: score aggregator. Grading is atomic per exercise.
    #[error("Exercise \"{exercise}\" is only partially graded")]
    PartialGrading {
        /// Exercise with mixed graded and ungraded criteria.
        exercise: String,
    },

    /// A filled-in score is negative, non-finite or not a number.
    ///
    /// Produced by: score aggregator.
    #[error("Invalid score \"{value}\" for \"{criterion}\" in exercise \"{exercise}\"")]
    InvalidScore {
        /// Exercise containing the criterion.
        exercise: String,
        /// Criterion label.
        criterion: String,
        /// The offending value as written in the form.
        value: String,
    },

    /// A graded criterion has no entry in the weight schema.
    #[error("No weight recorded for \"{criterion}\" in exercise \"{exercise}\"")]
    MissingWeight {
        /// Exercise containing the criterion.
        exercise: String,
        /// Criterion label.
        criterion: String,
    },

    /// A raw score has no entry in the configured grade mapping.
    #[error("Score {score} has no entry in the grade mapping")]
    UnmappedScore {
        /// The raw score that failed to map.
        score: f64,
    },

    /// A weight mapping that must sum to 1.0 does not.
    ///
    /// Produced at load/use time for catalog rows and course weights. Weights
    /// are never normalised automatically.
    #[error("Weights for {context} sum to {sum}, expected 1.0")]
    WeightSum {
        /// Which mapping failed (e.g. `rubric "writing"`, `course`).
        context: String,
        /// The observed sum.
        sum: f64,
    },

    /// A configuration entry holds a value outside its allowed range.
    ///
    /// Produced by: `CourseConfig::validate`.
    #[error("Configuration error: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A course report was requested without a grade for every assessment.
    #[error("No grade available for assessment \"{assessment}\"")]
    MissingAssessmentGrade {
        /// Assessment named in the course configuration.
        assessment: String,
    },

    /// Group resolution failed to partition the roster exactly once.
    ///
    /// Indicates a logic bug rather than a user error; the caller must abort
    /// instead of writing a grade book from the result.
    #[error("Group resolution did not partition the roster: {details}")]
    GroupInvariantViolation {
        /// Which logins were missing, duplicated or unexpected.
        details: String,
    },

    /// A grading or weight document is not valid JSON for its schema.
    #[error("Malformed {document}: {source}")]
    MalformedDocument {
        /// Kind of document being read (e.g. `"grading form"`).
        document: &'static str,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

impl GradingError {
    /// Returns `true` if the error points at a bug in this crate rather than
    /// at a document or configuration the caller can fix.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::GroupInvariantViolation { .. })
    }
}
