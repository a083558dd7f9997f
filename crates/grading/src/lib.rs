//! Grading and grouping engine for GitHub-hosted coursework.
//!
//! This crate turns rubric directives in assessment documents into grading
//! forms, reconciles partner requests into groups, and aggregates filled-in
//! forms into assessment and course grades with Markdown reports. Every
//! operation is a pure transformation over in-memory values.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines the [`FileStore`] port; the `store` crate implements it and the
//! `workflow` crate drives both.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`StudentLogin`, `ExerciseName`, etc.) |
//! | [`types`] | Shared value types (`PeerReviewShare`, `GradeMapping`, `Diagnostic`, etc.) |
//! | [`errors`] | The [`GradingError`] taxonomy |
//! | [`weights`] | Weight-sum validation |
//! | [`catalog`] | The rubric catalog |
//! | [`headers`] | Exercise-name inference per document kind |
//! | [`forms`] | Grading form and weight documents |
//! | [`rubric`] | The rubric snippet parser |
//! | [`groups`] | Partner-request resolution |
//! | [`scoring`] | Assessment scoring and reports |
//! | [`course`] | Course configuration and course grades |
//! | [`stats`] | Per-exercise averages and summary statistics |
//! | [`review`] | Peer-review assignment |
//! | [`table`] | Markdown table rendering |
//! | [`store`] | The remote file store port |

pub mod catalog;
pub mod course;
pub mod errors;
pub mod forms;
pub mod groups;
pub mod headers;
pub mod identifiers;
pub mod review;
pub mod rubric;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod table;
pub mod types;
pub mod weights;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use catalog::{RubricCatalog, RubricCatalogEntry};
pub use course::{AssessmentConfig, CourseConfig, CourseGradeAggregator, CourseGradeReport};
pub use errors::GradingError;
pub use forms::{ExerciseForm, ExerciseWeights, GradeEntry, GradingSchema, WeightSchema};
pub use groups::{Group, GroupResolution, GroupResolver};
pub use headers::{DocumentKind, HeaderLocator, LatexHeaders, MarkdownHeaders};
pub use identifiers::{AssessmentName, ExerciseName, RubricKey, StudentLogin};
pub use review::{PeerReviewAssignments, ReviewAssignment};
pub use rubric::{ParsedAssessment, RubricSnippetParser};
pub use scoring::{
    classify, AssessmentReport, ExerciseStatus, ReportMode, ScoreAggregator, SubmissionStatus,
};
pub use stats::{ExerciseAverages, SummaryStatistics};
pub use store::{FileStore, StoreError, WriteOutcome};
pub use types::{
    AssessmentStatus, Diagnostic, DiagnosticCategory, DiagnosticSeverity, GradeMapping,
    PeerReviewShare,
};
pub use weights::validate_weights;
