//! Error type for workflow operations.

use grading::{GradingError, StoreError};
use thiserror::Error;

/// Errors produced while running a workflow step.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A grading computation failed.
    #[error(transparent)]
    Grading(#[from] GradingError),

    /// The file store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored document is not valid JSON for its type.
    #[error("Malformed JSON in \"{path}\": {source}")]
    Json {
        /// Store path of the document.
        path: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A document the step depends on has not been created yet.
    #[error("Required file \"{path}\" does not exist")]
    MissingFile {
        /// Store path that was expected.
        path: String,
    },

    /// The assessment is not in the course configuration.
    #[error("Unknown assessment \"{assessment}\"")]
    UnknownAssessment {
        /// Name that was looked up.
        assessment: String,
    },

    /// The course is not in a state where the step may run.
    #[error("Not ready: {reason}")]
    NotReady {
        /// Which precondition failed.
        reason: String,
    },

    /// One student's course grade could not be computed, so no final
    /// report was written.
    #[error("Cannot compute the course grade of {student}: {source}")]
    CourseGrade {
        /// Login of the student.
        student: String,
        /// The aggregation failure.
        #[source]
        source: GradingError,
    },

    /// One group's form could not be scored, so nothing was returned.
    #[error("Cannot score group {group}: {source}")]
    Scoring {
        /// Canonical name of the group.
        group: String,
        /// The scoring failure.
        #[source]
        source: GradingError,
    },
}
