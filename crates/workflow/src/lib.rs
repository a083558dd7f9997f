//! Coursework grading workflow.
//!
//! [`Gradebook`] drives the grading engine over a course's grades repository:
//! it resolves groups, generates blank grading forms, scores filled-in forms
//! into reports, tabulates grades and statistics, and writes final course
//! reports. Every document lives at a fixed path (see [`layout`]) in a
//! [`FileStore`](grading::FileStore).
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The gradebook sequences calls between business
//! logic in the [`grading`] crate and the file store port. It contains no
//! grading rules of its own.

pub mod errors;
pub mod gradebook;
pub mod layout;
pub mod settings;

pub use errors::WorkflowError;
pub use gradebook::{FormsSummary, GradeTable, Gradebook, ReturnSummary, TabulateSummary};
pub use settings::CourseSettings;
