//! Rubric directives embedded in assessment documents.
//!
//! Authors annotate each exercise with a directive such as
//! `rubric={code: 2, writing: 1}`. The parser finds every directive, names
//! its exercise from the nearest preceding header (or an explicit `name`
//! key), and expands the rubric keys through the [`RubricCatalog`] into a
//! blank [`GradingSchema`] and a parallel [`WeightSchema`].

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::forms::{
    ExerciseForm, ExerciseWeights, GradeEntry, FEEDBACK_KEY, IS_BONUS_KEY, PEER_REVIEW_CRITERION,
    PEER_REVIEW_EXERCISE,
};
use crate::headers::DocumentKind;
use crate::{
    ExerciseName, GradingError, GradingSchema, PeerReviewShare, RubricCatalog, RubricKey,
    WeightSchema,
};

/// Exercise name used when no header precedes a directive.
pub const UNTITLED_EXERCISE: &str = "Untitled Exercise";

/// Directive key that overrides header-based exercise naming.
pub const NAME_KEY: &str = "name";

/// Retired rubric key; extra credit is now expressed through the exercise name.
pub const DEPRECATED_SPARK_KEY: &str = "spark";

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\brub(?:r(?:ic)?)?[ \t]*[=:]?[ \t]*(\{[^\n]*\})").expect("valid regex")
});

// `{code:1}` is a single plain scalar in YAML flow style; a space after the
// colon makes it a key/value pair.
static TIGHT_COLON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":(\S)").expect("valid regex"));

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// The contents of one directive: an optional explicit name and the rubric
/// keys with their (still unparsed) point values, in written order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSnippet {
    /// Explicit exercise name from a `name` key.
    pub name: Option<String>,
    /// Rubric keys and their point tokens.
    pub rubrics: Vec<(RubricKey, Value)>,
}

impl ExerciseSnippet {
    /// Reads the inline mapping literal of a directive.
    pub fn parse(literal: &str) -> Result<Self, GradingError> {
        let normalised = TIGHT_COLON.replace_all(&literal.replace('\t', ""), ": $1").into_owned();
        let invalid = |reason: String| GradingError::InvalidDirective {
            directive: literal.to_string(),
            reason,
        };

        let value: Value =
            serde_yaml::from_str(&normalised).map_err(|err| invalid(err.to_string()))?;
        let Value::Mapping(mapping) = value else {
            return Err(invalid("expected an inline mapping such as {code: 2}".into()));
        };

        let mut name = None;
        let mut rubrics = Vec::with_capacity(mapping.len());
        for (key, points) in mapping {
            let key = scalar_text(&key)
                .and_then(RubricKey::new)
                .ok_or_else(|| invalid(format!("rubric key {key:?} is not a name")))?;
            if key.as_str() == NAME_KEY {
                name = Some(
                    scalar_text(&points)
                        .ok_or_else(|| invalid("exercise name must be text".into()))?,
                );
            } else if rubrics.iter().any(|(seen, _)| *seen == key) {
                return Err(invalid(format!("rubric \"{key}\" appears more than once")));
            } else {
                rubrics.push((key, points));
            }
        }
        Ok(Self { name, rubrics })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_points(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| n.to_string()),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| s.clone()),
        other => Err(scalar_text(other).unwrap_or_else(|| format!("{other:?}"))),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Blank grading form and weights produced from one assessment document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAssessment {
    /// Form with every scoreable slot set to the unfilled sentinel.
    pub form: GradingSchema,
    /// Absolute criterion weights, parallel to `form`.
    pub weights: WeightSchema,
    /// Sum of all directive points (excluding peer review).
    pub total_points: f64,
}

/// Expands rubric directives into grading forms using a fixed catalog.
#[derive(Debug, Clone)]
pub struct RubricSnippetParser {
    catalog: RubricCatalog,
    peer_review_share: PeerReviewShare,
}

impl RubricSnippetParser {
    /// Creates a parser using the default peer-review share.
    pub fn new(catalog: RubricCatalog) -> Self {
        Self {
            catalog,
            peer_review_share: PeerReviewShare::default(),
        }
    }

    /// Overrides the share of the assessment total given to peer review.
    pub fn with_peer_review_share(mut self, share: PeerReviewShare) -> Self {
        self.peer_review_share = share;
        self
    }

    /// The catalog this parser expands against.
    pub fn catalog(&self) -> &RubricCatalog {
        &self.catalog
    }

    /// Parses every directive in `text`.
    ///
    /// Exercises appear in document order. With `peer_review` set, a trailing
    /// `PEER REVIEW` exercise is added and weighted so that it forms the
    /// configured share of the final total.
    pub fn parse(
        &self,
        text: &str,
        peer_review: bool,
        kind: DocumentKind,
    ) -> Result<ParsedAssessment, GradingError> {
        let locator = kind.header_locator();
        let mut parsed = ParsedAssessment::default();

        for caps in DIRECTIVE.captures_iter(text) {
            let (Some(whole), Some(literal)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let snippet = ExerciseSnippet::parse(literal.as_str())?;

            let raw_name = match snippet.name.clone() {
                Some(explicit) => explicit,
                None => locator
                    .find_preceding_header(text, whole.start())
                    .unwrap_or_else(|| UNTITLED_EXERCISE.to_string()),
            };
            let exercise = ExerciseName::new(raw_name)
                .unwrap_or_else(|| ExerciseName::from_static(UNTITLED_EXERCISE));

            if parsed.form.contains(exercise.as_str()) {
                return Err(GradingError::DuplicateExercise {
                    exercise: exercise.to_string(),
                });
            }

            let (form, weights, points) = self.expand(&exercise, &snippet)?;
            debug!(exercise = %exercise, points, "parsed rubric directive");
            parsed.form.insert(exercise.clone(), form);
            parsed.weights.insert(exercise, weights);
            parsed.total_points += points;
        }

        if peer_review {
            if parsed.form.contains(PEER_REVIEW_EXERCISE) {
                return Err(GradingError::DuplicateExercise {
                    exercise: PEER_REVIEW_EXERCISE.to_string(),
                });
            }
            let weight = self.peer_review_share.weight_for(parsed.total_points);
            let exercise = ExerciseName::from_static(PEER_REVIEW_EXERCISE);

            let mut form = ExerciseForm::new();
            form.set(PEER_REVIEW_CRITERION, GradeEntry::Unfilled);
            form.set(FEEDBACK_KEY, GradeEntry::Text(String::new()));

            let mut weights = ExerciseWeights::default();
            weights.criteria.insert(PEER_REVIEW_CRITERION.to_string(), weight);

            info!(weight, share = %self.peer_review_share, "added peer review exercise");
            parsed.form.insert(exercise.clone(), form);
            parsed.weights.insert(exercise, weights);
        }

        Ok(parsed)
    }

    /// Expands one directive into its form, weights and total points.
    fn expand(
        &self,
        exercise: &ExerciseName,
        snippet: &ExerciseSnippet,
    ) -> Result<(ExerciseForm, ExerciseWeights, f64), GradingError> {
        let mut form = ExerciseForm::new();
        let mut weights = ExerciseWeights::default();
        let mut total = 0.0;

        for (key, token) in &snippet.rubrics {
            let points = parse_points(token).map_err(|token| GradingError::InvalidPoints {
                rubric: key.to_string(),
                exercise: exercise.to_string(),
                token,
            })?;
            if key.as_str() == DEPRECATED_SPARK_KEY {
                return Err(GradingError::DeprecatedRubric {
                    exercise: exercise.to_string(),
                });
            }
            let entry = self
                .catalog
                .get(key.as_str())
                .ok_or_else(|| GradingError::UnknownRubric {
                    rubric: key.to_string(),
                    exercise: exercise.to_string(),
                })?;

            for (criterion, weight) in entry.criteria(points) {
                form.set(criterion.clone(), GradeEntry::Unfilled);
                weights.criteria.insert(criterion, weight);
            }
            total += points;
        }

        form.set(FEEDBACK_KEY, GradeEntry::Text(String::new()));

        if exercise.is_bonus() {
            info!(exercise = %exercise, "found bonus exercise");
            form.set(IS_BONUS_KEY, GradeEntry::Flag(true));
            weights.is_bonus = true;
        }

        Ok((form, weights, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RubricCatalogEntry;

    fn parser() -> RubricSnippetParser {
        let catalog = RubricCatalog::new([
            (RubricKey::new("code").unwrap(), RubricCatalogEntry::single("Code Quality")),
            (
                RubricKey::new("writing").unwrap(),
                RubricCatalogEntry::with_rows("Writing", [("clarity", 0.6), ("grammar", 0.4)]),
            ),
            (RubricKey::new("accuracy").unwrap(), RubricCatalogEntry::single("Accuracy")),
        ])
        .unwrap();
        RubricSnippetParser::new(catalog)
    }

    #[test]
    fn test_snippet_accepts_tight_colons() {
        let snippet = ExerciseSnippet::parse("{code:1,writing:2}").unwrap();
        let keys: Vec<&str> = snippet.rubrics.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["code", "writing"]);
        assert!(snippet.name.is_none());
    }

    #[test]
    fn test_snippet_explicit_name() {
        let snippet = ExerciseSnippet::parse("{name: Warm-up, code: 1}").unwrap();
        assert_eq!(snippet.name.as_deref(), Some("Warm-up"));
        assert_eq!(snippet.rubrics.len(), 1);
    }

    #[test]
    fn test_snippet_must_be_well_formed() {
        let err = ExerciseSnippet::parse("{code: 1").unwrap_err();
        assert!(matches!(err, GradingError::InvalidDirective { .. }));
    }

    #[test]
    fn test_header_names_exercises() {
        let text = "# Exercise 1\nrubric={code: 2}\n\n# Exercise 2\nrub={accuracy: 3}\n";
        let parsed = parser().parse(text, false, DocumentKind::Markdown).unwrap();
        let names: Vec<&str> = parsed.form.exercises().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Exercise 1", "Exercise 2"]);
        assert_eq!(parsed.total_points, 5.0);
    }

    #[test]
    fn test_untitled_exercise() {
        let parsed = parser()
            .parse("rubric: {code: 1}", false, DocumentKind::Markdown)
            .unwrap();
        assert!(parsed.form.contains(UNTITLED_EXERCISE));
    }

    #[test]
    fn test_duplicate_exercise_rejected() {
        let text = "# Q1\nrubric={code: 1}\nrubric={accuracy: 1}\n";
        let err = parser().parse(text, false, DocumentKind::Markdown).unwrap_err();
        assert!(matches!(err, GradingError::DuplicateExercise { exercise } if exercise == "Q1"));
    }

    #[test]
    fn test_explicit_name_avoids_collision() {
        let text = "# Q1\nrubric={code: 1}\nrubric={name: Q1 part b, accuracy: 1}\n";
        let parsed = parser().parse(text, false, DocumentKind::Markdown).unwrap();
        assert!(parsed.form.contains("Q1 part b"));
    }

    #[test]
    fn test_invalid_points_keeps_token() {
        let err = parser()
            .parse("# Q\nrubric={code: lots}", false, DocumentKind::Markdown)
            .unwrap_err();
        match err {
            GradingError::InvalidPoints { rubric, token, .. } => {
                assert_eq!(rubric, "code");
                assert_eq!(token, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spark_rejected() {
        let err = parser()
            .parse("# Q\nrubric={spark: 1}", false, DocumentKind::Markdown)
            .unwrap_err();
        assert!(matches!(err, GradingError::DeprecatedRubric { .. }));
    }

    #[test]
    fn test_unknown_rubric_rejected() {
        let err = parser()
            .parse("# Q\nrubric={style: 1}", false, DocumentKind::Markdown)
            .unwrap_err();
        assert!(matches!(err, GradingError::UnknownRubric { rubric, .. } if rubric == "style"));
    }

    #[test]
    fn test_bonus_exercise_flagged() {
        let text = "# Exercise 5 (optional)\nrubric={code: 1}\n";
        let parsed = parser().parse(text, false, DocumentKind::Markdown).unwrap();
        let weights = parsed.weights.exercise("Exercise 5 (optional)").unwrap();
        assert!(weights.is_bonus);
        let form = parsed.form.exercise("Exercise 5 (optional)").unwrap();
        assert_eq!(form.get(IS_BONUS_KEY), Some(&GradeEntry::Flag(true)));
    }

    #[test]
    fn test_latex_document() {
        let text = "\\section{Question 1}\n% rubric={accuracy: 4}\n";
        let parsed = parser().parse(text, false, DocumentKind::Latex).unwrap();
        assert_eq!(
            parsed.weights.exercise("Question 1").unwrap().weight("Accuracy"),
            Some(4.0)
        );
    }

    #[test]
    fn test_peer_review_appended() {
        let text = "# Q1\nrubric={code: 10, accuracy: 7}\n";
        let parsed = parser().parse(text, true, DocumentKind::Markdown).unwrap();
        let names: Vec<&str> = parsed.form.exercises().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Q1", PEER_REVIEW_EXERCISE]);

        let review = parsed.form.exercise(PEER_REVIEW_EXERCISE).unwrap();
        assert_eq!(review.get(PEER_REVIEW_CRITERION), Some(&GradeEntry::Unfilled));
        assert_eq!(review.feedback(), "");

        let w = parsed
            .weights
            .exercise(PEER_REVIEW_EXERCISE)
            .unwrap()
            .weight(PEER_REVIEW_CRITERION)
            .unwrap();
        assert_eq!(w, 3.0);
    }

    #[test]
    fn test_peer_review_header_clash() {
        let text = "# PEER REVIEW\nrubric={code: 1}\n";
        assert!(parser().parse(text, false, DocumentKind::Markdown).is_ok());
        let err = parser().parse(text, true, DocumentKind::Markdown).unwrap_err();
        assert!(matches!(err, GradingError::DuplicateExercise { exercise } if exercise == PEER_REVIEW_EXERCISE));
    }
}
