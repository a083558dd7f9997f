//! Turning a filled-in grading form into an assessment grade.
//!
//! Scoring runs in two passes. First every exercise is classified as graded,
//! ungraded, or partially graded; only then are scores aggregated. This keeps
//! the "nothing was graded, so nothing was submitted" outcome separate from
//! the hard error of a half-finished form.
//!
//! Per exercise the numerator is the sum of (optionally mapped) scores and
//! the denominator the sum of criterion weights, except that the
//! [`BONUS_ALIAS`] criterion never adds to the denominator. At the assessment
//! level, bonus exercises add their numerator but not their denominator.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::forms::{ExerciseForm, ExerciseWeights, GradeEntry, BONUS_ALIAS};
use crate::table::{Cell, MarkdownTable};
use crate::{ExerciseName, GradeMapping, GradingError, GradingSchema, WeightSchema};

/// Report text returned when no exercise has been graded.
pub const NOT_SUBMITTED_REPORT: &str =
    "Assignment not graded by TA, presumably because it was not submitted (please notify us if otherwise!).";

const TOTAL_LABEL: &str = "**Total**";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How far grading of one exercise has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseStatus {
    /// At least one criterion is scored and none is left unfilled.
    Graded,
    /// No criterion is scored.
    Ungraded,
    /// Some criteria are scored and some are unfilled.
    PartiallyGraded,
}

/// Classifies an exercise by its scoreable criteria.
///
/// Any non-sentinel value counts as graded here; whether it is a valid score
/// is checked during aggregation.
pub fn classify(form: &ExerciseForm) -> ExerciseStatus {
    let (mut filled, mut unfilled) = (0usize, 0usize);
    for (_, entry) in form.criteria() {
        if entry.is_unfilled() {
            unfilled += 1;
        } else {
            filled += 1;
        }
    }
    match (filled, unfilled) {
        (0, _) => ExerciseStatus::Ungraded,
        (_, 0) => ExerciseStatus::Graded,
        _ => ExerciseStatus::PartiallyGraded,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Whether the form contained any grading at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Grades were entered and aggregated.
    Graded,
    /// Nothing was graded; the group is presumed not to have submitted.
    NotSubmitted,
}

/// One scored criterion as shown in a detailed report.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionResult {
    /// Criterion label.
    pub criterion: String,
    /// Score as entered by the grader.
    pub raw: f64,
    /// Score after the grade mapping (equal to `raw` without one).
    pub scaled: f64,
    /// Weight counted toward the exercise denominator.
    pub out_of: f64,
}

/// Aggregated result for one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseResult {
    /// Exercise name.
    pub name: ExerciseName,
    /// Per-criterion rows, alphabetically by label. Zero bonus-alias scores are omitted.
    pub criteria: Vec<CriterionResult>,
    /// Sum of scaled scores.
    pub numerator: f64,
    /// Sum of counted weights.
    pub denominator: f64,
    /// Extra-credit exercise.
    pub is_bonus: bool,
    /// Grader feedback for the exercise.
    pub feedback: String,
}

impl ExerciseResult {
    /// Fractional grade: `numerator / denominator`, or the bare numerator
    /// when nothing counts toward the denominator.
    pub fn fraction(&self) -> f64 {
        if self.denominator == 0.0 {
            self.numerator
        } else {
            self.numerator / self.denominator
        }
    }
}

/// Output of [`ScoreAggregator::score`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentReport {
    /// Whether anything was graded.
    pub status: SubmissionStatus,
    /// Rendered Markdown report.
    pub report: String,
    /// Percentage grade, unrounded.
    pub grade: f64,
    /// Exercise name → fractional grade.
    pub exercise_grades: IndexMap<ExerciseName, f64>,
    /// Per-exercise breakdown, in form order.
    pub exercises: Vec<ExerciseResult>,
    /// Sum of all exercise numerators.
    pub numerator: f64,
    /// Sum of non-bonus exercise denominators.
    pub denominator: f64,
}

impl AssessmentReport {
    fn not_submitted() -> Self {
        Self {
            status: SubmissionStatus::NotSubmitted,
            report: NOT_SUBMITTED_REPORT.to_string(),
            grade: 0.0,
            exercise_grades: IndexMap::new(),
            exercises: Vec::new(),
            numerator: 0.0,
            denominator: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// How much of the breakdown a rendered report shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Only the overall per-exercise table, with feedback.
    #[default]
    ScoreOnly,
    /// Per-exercise criterion tables followed by the overall evaluation.
    Detailed,
}

/// Computes assessment grades and reports from filled-in forms.
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    grade_mapping: Option<GradeMapping>,
    mode: ReportMode,
}

impl ScoreAggregator {
    /// An aggregator using raw scores and score-only reports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaps raw scores through `mapping` before weighting.
    pub fn with_grade_mapping(mut self, mapping: GradeMapping) -> Self {
        self.grade_mapping = Some(mapping);
        self
    }

    /// Selects the report layout.
    pub fn with_mode(mut self, mode: ReportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Scores one group's form against the assessment weights.
    ///
    /// Returns the not-submitted result when no exercise has any grade.
    /// A partially graded exercise, or an ungraded regular exercise in an
    /// otherwise graded form, fails with [`GradingError::PartialGrading`].
    pub fn score(
        &self,
        form: &GradingSchema,
        weights: &WeightSchema,
    ) -> Result<AssessmentReport, GradingError> {
        let mut statuses = Vec::with_capacity(form.len());
        for (name, exercise) in form.exercises() {
            let status = classify(exercise);
            if status == ExerciseStatus::PartiallyGraded {
                return Err(GradingError::PartialGrading {
                    exercise: name.to_string(),
                });
            }
            statuses.push(status);
        }

        if !statuses.contains(&ExerciseStatus::Graded) {
            debug!("no grades entered; treating as not submitted");
            return Ok(AssessmentReport::not_submitted());
        }

        let mut exercises = Vec::with_capacity(form.len());
        for ((name, exercise), status) in form.exercises().zip(statuses) {
            let exercise_weights =
                weights
                    .exercise(name.as_str())
                    .ok_or_else(|| GradingError::MissingWeight {
                        exercise: name.to_string(),
                        criterion: "*".to_string(),
                    })?;
            let is_bonus = exercise_weights.is_bonus || name.is_bonus();

            let result = match status {
                ExerciseStatus::Graded => self.score_exercise(name, exercise, exercise_weights, is_bonus)?,
                _ if is_bonus || exercise.criteria().next().is_none() => {
                    debug!(exercise = %name, "ungraded exercise scored as zero");
                    ExerciseResult {
                        name: name.clone(),
                        criteria: Vec::new(),
                        numerator: 0.0,
                        denominator: 0.0,
                        is_bonus,
                        feedback: exercise.feedback().to_string(),
                    }
                }
                _ => {
                    return Err(GradingError::PartialGrading {
                        exercise: name.to_string(),
                    })
                }
            };
            exercises.push(result);
        }

        let numerator: f64 = exercises.iter().map(|e| e.numerator).sum();
        let denominator: f64 = exercises
            .iter()
            .filter(|e| !e.is_bonus)
            .map(|e| e.denominator)
            .sum();
        // Only bonus work was weighted: the raw numerator stands in for the fraction.
        let grade = if denominator == 0.0 {
            numerator * 100.0
        } else {
            numerator / denominator * 100.0
        };

        let exercise_grades = exercises
            .iter()
            .map(|e| (e.name.clone(), e.fraction()))
            .collect();

        let report = self.render(&exercises, numerator, denominator, grade, form.overall_feedback());

        Ok(AssessmentReport {
            status: SubmissionStatus::Graded,
            report,
            grade,
            exercise_grades,
            exercises,
            numerator,
            denominator,
        })
    }

    fn score_exercise(
        &self,
        name: &ExerciseName,
        form: &ExerciseForm,
        weights: &ExerciseWeights,
        is_bonus: bool,
    ) -> Result<ExerciseResult, GradingError> {
        let mut entries: Vec<(&str, &GradeEntry)> = form.criteria().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut result = ExerciseResult {
            name: name.clone(),
            criteria: Vec::with_capacity(entries.len()),
            numerator: 0.0,
            denominator: 0.0,
            is_bonus,
            feedback: form.feedback().to_string(),
        };

        for (criterion, entry) in entries {
            let raw = parse_score(name, criterion, entry)?;
            if criterion == BONUS_ALIAS && raw == 0.0 {
                continue;
            }

            let weight = weights
                .weight(criterion)
                .ok_or_else(|| GradingError::MissingWeight {
                    exercise: name.to_string(),
                    criterion: criterion.to_string(),
                })?;
            let scaled = match &self.grade_mapping {
                Some(mapping) => mapping.map(raw)?,
                None => raw,
            };
            let out_of = if criterion == BONUS_ALIAS { 0.0 } else { weight };

            result.numerator += scaled;
            result.denominator += out_of;
            result.criteria.push(CriterionResult {
                criterion: criterion.trim_end().trim_end_matches('-').trim_end().to_string(),
                raw,
                scaled,
                out_of,
            });
        }

        if result.denominator == 0.0 && !result.criteria.is_empty() {
            warn!(exercise = %name, "exercise has no weighted criteria; using raw numerator as its grade");
        }
        Ok(result)
    }

    fn render(
        &self,
        exercises: &[ExerciseResult],
        numerator: f64,
        denominator: f64,
        grade: f64,
        overall_feedback: Option<&str>,
    ) -> String {
        let mut out = String::new();

        let mut overall = match self.mode {
            ReportMode::ScoreOnly => {
                MarkdownTable::new(["Exercise Name", "Points Earned", "Out Of", "Feedback"])
            }
            ReportMode::Detailed => MarkdownTable::new(["Exercise Name", "Points Earned", "Out Of"]),
        };

        for exercise in exercises {
            match self.mode {
                ReportMode::ScoreOnly => overall.push_row(vec![
                    exercise.name.as_str().into(),
                    exercise.numerator.into(),
                    exercise.denominator.into(),
                    exercise.feedback.as_str().into(),
                ]),
                ReportMode::Detailed => {
                    out.push_str(&render_exercise(exercise));
                    let shown_out_of = if exercise.is_bonus { 0.0 } else { exercise.denominator };
                    overall.push_row(vec![
                        exercise.name.as_str().into(),
                        exercise.numerator.into(),
                        shown_out_of.into(),
                    ]);
                }
            }
        }
        overall.push_row(vec![TOTAL_LABEL.into(), numerator.into(), denominator.into(), Cell::empty()]);

        if self.mode == ReportMode::Detailed {
            out.push_str("\n\n## Overall Evaluation\n\n");
        }
        out.push_str(&overall.render());
        out.push_str(&format!(
            "\n\nFinal grade: {numerator:.1}/{denominator:.1} = **{grade:.0}%**\n"
        ));

        if let Some(feedback) = overall_feedback.filter(|f| !f.is_empty()) {
            out.push_str("\n\n## Overall Feedback\n\n");
            out.push_str(feedback);
        }
        out
    }
}

fn render_exercise(exercise: &ExerciseResult) -> String {
    let mut out = format!("#### {}\n\n", exercise.name);

    let mut table = MarkdownTable::new(["Rubric", "Raw Score", "Scaled Score", "Points Earned", "Out Of"]);
    for row in &exercise.criteria {
        table.push_row(vec![
            row.criterion.as_str().into(),
            row.raw.into(),
            format!("{:.0}%", row.scaled * 100.0).into(),
            row.scaled.into(),
            row.out_of.into(),
        ]);
    }
    if exercise.criteria.len() > 1 {
        table.push_row(vec![
            TOTAL_LABEL.into(),
            Cell::empty(),
            Cell::empty(),
            exercise.numerator.into(),
            exercise.denominator.into(),
        ]);
    }
    if !table.is_empty() {
        out.push_str(&table.render());
    }

    if !exercise.feedback.is_empty() {
        out.push_str(&format!("\n\n**Feedback:** {}\n\n", exercise.feedback));
    }
    out.push_str("\n\n");
    out
}

/// Reads a filled-in criterion as a non-negative, finite score.
fn parse_score(exercise: &ExerciseName, criterion: &str, entry: &GradeEntry) -> Result<f64, GradingError> {
    let invalid = |value: String| GradingError::InvalidScore {
        exercise: exercise.to_string(),
        criterion: criterion.to_string(),
        value,
    };
    let score = match entry {
        GradeEntry::Score(value) => *value,
        GradeEntry::Text(text) => text.trim().parse::<f64>().map_err(|_| invalid(text.clone()))?,
        GradeEntry::Flag(flag) => return Err(invalid(flag.to_string())),
        GradeEntry::Unfilled => return Err(invalid(crate::forms::UNFILLED_SENTINEL.to_string())),
    };
    if score.is_finite() && score >= 0.0 {
        Ok(score)
    } else {
        Err(invalid(score.to_string()))
    }
}
