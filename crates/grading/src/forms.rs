//! Grading form and weight documents.
//!
//! A [`GradingSchema`] is the JSON form a grader fills in for one group; a
//! [`WeightSchema`] holds the absolute point weight of every criterion. Both
//! are produced by the rubric snippet parser and persisted by the caller; the
//! score aggregator reads them back. Key order is preserved so re-serialised
//! documents stay readable and reproducible.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ExerciseName, GradingError};

/// Wire token marking a criterion nobody has graded yet.
pub const UNFILLED_SENTINEL: &str = "FILL_THIS_IN_WITH_GRADE";

/// Criterion key holding free-text feedback for one exercise.
pub const FEEDBACK_KEY: &str = "feedback";

/// Criterion key flagging a bonus exercise.
pub const IS_BONUS_KEY: &str = "is_bonus";

/// Top-level form slot for feedback on the whole assessment.
pub const OVERALL_FEEDBACK_KEY: &str = "Overall feedback";

/// Criterion a grader may add to award extra credit on a regular exercise.
/// Its weight never counts toward the exercise denominator.
pub const BONUS_ALIAS: &str = "Spark (bonus)";

/// Name of the synthetic exercise appended when peer review is enabled.
pub const PEER_REVIEW_EXERCISE: &str = "PEER REVIEW";

/// Criterion label inside the peer-review exercise.
pub const PEER_REVIEW_CRITERION: &str = "Peer Review";

// ---------------------------------------------------------------------------
// Grade entries
// ---------------------------------------------------------------------------

/// One slot of a grading form.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeEntry {
    /// Not yet graded; serialised as [`UNFILLED_SENTINEL`].
    Unfilled,
    /// A numeric score.
    Score(f64),
    /// Free text: feedback, or a score typed as a string (`"2"`).
    Text(String),
    /// A boolean marker such as `is_bonus`.
    Flag(bool),
}

impl GradeEntry {
    /// Returns `true` for the unfilled sentinel.
    pub fn is_unfilled(&self) -> bool {
        matches!(self, Self::Unfilled)
    }
}

impl Serialize for GradeEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unfilled => serializer.serialize_str(UNFILLED_SENTINEL),
            Self::Score(value) => serializer.serialize_f64(*value),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Flag(flag) => serializer.serialize_bool(*flag),
        }
    }
}

impl<'de> Deserialize<'de> for GradeEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl Visitor<'_> for EntryVisitor {
            type Value = GradeEntry;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a score, a string, or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<GradeEntry, E> {
                Ok(GradeEntry::Flag(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<GradeEntry, E> {
                Ok(GradeEntry::Score(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<GradeEntry, E> {
                Ok(GradeEntry::Score(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<GradeEntry, E> {
                Ok(GradeEntry::Score(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GradeEntry, E> {
                if v == UNFILLED_SENTINEL {
                    Ok(GradeEntry::Unfilled)
                } else {
                    Ok(GradeEntry::Text(v.to_string()))
                }
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}

// ---------------------------------------------------------------------------
// Grading form
// ---------------------------------------------------------------------------

/// The criteria of one exercise in a grading form, in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseForm {
    entries: IndexMap<String, GradeEntry>,
}

impl ExerciseForm {
    /// Creates an empty exercise form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `criterion` to `entry`, keeping its original position if present.
    pub fn set(&mut self, criterion: impl Into<String>, entry: GradeEntry) {
        self.entries.insert(criterion.into(), entry);
    }

    /// Returns the entry for `criterion`.
    pub fn get(&self, criterion: &str) -> Option<&GradeEntry> {
        self.entries.get(criterion)
    }

    /// Iterates over every entry, including `feedback` and `is_bonus`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &GradeEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over scoreable criteria only.
    pub fn criteria(&self) -> impl Iterator<Item = (&str, &GradeEntry)> {
        self.entries()
            .filter(|(k, _)| *k != FEEDBACK_KEY && *k != IS_BONUS_KEY)
    }

    /// The exercise's feedback text, empty if absent.
    pub fn feedback(&self) -> &str {
        match self.entries.get(FEEDBACK_KEY) {
            Some(GradeEntry::Text(text)) => text,
            _ => "",
        }
    }
}

/// A full grading form for one group and one assessment.
///
/// Serialises as a JSON object of exercise forms, followed by the optional
/// `"Overall feedback"` string slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradingSchema {
    exercises: IndexMap<ExerciseName, ExerciseForm>,
    overall_feedback: Option<String>,
}

impl GradingSchema {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends (or replaces) an exercise.
    pub fn insert(&mut self, exercise: ExerciseName, form: ExerciseForm) {
        self.exercises.insert(exercise, form);
    }

    /// Returns `true` if `exercise` already has a form.
    pub fn contains(&self, exercise: &str) -> bool {
        self.exercises.contains_key(exercise)
    }

    /// Looks up an exercise.
    pub fn exercise(&self, exercise: &str) -> Option<&ExerciseForm> {
        self.exercises.get(exercise)
    }

    /// Mutable access to an exercise, for filling the form in.
    pub fn exercise_mut(&mut self, exercise: &str) -> Option<&mut ExerciseForm> {
        self.exercises.get_mut(exercise)
    }

    /// Iterates over exercises in document order.
    pub fn exercises(&self) -> impl Iterator<Item = (&ExerciseName, &ExerciseForm)> {
        self.exercises.iter()
    }

    /// Number of exercises.
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    /// Returns `true` if the form has no exercises.
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Feedback on the whole assessment, if the slot exists.
    pub fn overall_feedback(&self) -> Option<&str> {
        self.overall_feedback.as_deref()
    }

    /// Sets the whole-assessment feedback slot.
    pub fn set_overall_feedback(&mut self, feedback: impl Into<String>) {
        self.overall_feedback = Some(feedback.into());
    }

    /// Parses a form from its persisted JSON.
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        serde_json::from_str(json).map_err(|source| GradingError::MalformedDocument {
            document: "grading form",
            source,
        })
    }

    /// Renders the form as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, GradingError> {
        serde_json::to_string_pretty(self).map_err(|source| GradingError::MalformedDocument {
            document: "grading form",
            source,
        })
    }
}

impl Serialize for GradingSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.exercises.len() + usize::from(self.overall_feedback.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, form) in &self.exercises {
            map.serialize_entry(name, form)?;
        }
        if let Some(feedback) = &self.overall_feedback {
            map.serialize_entry(OVERALL_FEEDBACK_KEY, feedback)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GradingSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = GradingSchema;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a grading form object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<GradingSchema, A::Error> {
                let mut schema = GradingSchema::new();
                while let Some(key) = access.next_key::<String>()? {
                    if key == OVERALL_FEEDBACK_KEY {
                        schema.overall_feedback = Some(access.next_value()?);
                        continue;
                    }
                    let name = ExerciseName::new(key)
                        .ok_or_else(|| de::Error::custom("exercise name must not be empty"))?;
                    let form: ExerciseForm = access.next_value()?;
                    schema.exercises.insert(name, form);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Absolute point weights of one exercise's criteria.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseWeights {
    /// Criterion label → points.
    #[serde(flatten)]
    pub criteria: IndexMap<String, f64>,

    /// Extra-credit exercise: its denominator is left out of the assessment total.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_bonus: bool,
}

impl ExerciseWeights {
    /// Weight of `criterion`, if recorded.
    pub fn weight(&self, criterion: &str) -> Option<f64> {
        self.criteria.get(criterion).copied()
    }

    /// Sum of all criterion weights.
    pub fn total(&self) -> f64 {
        self.criteria.values().sum()
    }
}

/// Criterion weights for every exercise of an assessment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSchema {
    exercises: IndexMap<ExerciseName, ExerciseWeights>,
}

impl WeightSchema {
    /// Creates an empty weight schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends (or replaces) an exercise's weights.
    pub fn insert(&mut self, exercise: ExerciseName, weights: ExerciseWeights) {
        self.exercises.insert(exercise, weights);
    }

    /// Looks up an exercise's weights.
    pub fn exercise(&self, exercise: &str) -> Option<&ExerciseWeights> {
        self.exercises.get(exercise)
    }

    /// Iterates over exercises in document order.
    pub fn exercises(&self) -> impl Iterator<Item = (&ExerciseName, &ExerciseWeights)> {
        self.exercises.iter()
    }

    /// Sum of all criterion weights across non-bonus exercises.
    pub fn total(&self) -> f64 {
        self.exercises
            .values()
            .filter(|w| !w.is_bonus)
            .map(ExerciseWeights::total)
            .sum()
    }

    /// Parses weights from their persisted JSON.
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        serde_json::from_str(json).map_err(|source| GradingError::MalformedDocument {
            document: "weight schema",
            source,
        })
    }

    /// Renders the weights as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, GradingError> {
        serde_json::to_string_pretty(self).map_err(|source| GradingError::MalformedDocument {
            document: "weight schema",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ExerciseName {
        ExerciseName::new(s).unwrap()
    }

    #[test]
    fn test_form_round_trips_sentinel_and_overall_feedback() {
        let json = r#"{
            "Exercise 1": {"Code Quality": "FILL_THIS_IN_WITH_GRADE", "feedback": ""},
            "Overall feedback": ""
        }"#;
        let form = GradingSchema::from_json(json).unwrap();
        assert_eq!(form.len(), 1);
        assert_eq!(form.overall_feedback(), Some(""));
        let exercise = form.exercise("Exercise 1").unwrap();
        assert_eq!(exercise.get("Code Quality"), Some(&GradeEntry::Unfilled));

        let rendered = form.to_json_pretty().unwrap();
        assert!(rendered.contains("\"FILL_THIS_IN_WITH_GRADE\""));
        assert!(rendered.trim_end().ends_with("\"Overall feedback\": \"\"\n}"));
    }

    #[test]
    fn test_entries_parse_numbers_text_and_flags() {
        let json = r#"{"Q": {"a": 2, "b": 1.5, "c": "3", "is_bonus": true, "feedback": "nice"}}"#;
        let form = GradingSchema::from_json(json).unwrap();
        let q = form.exercise("Q").unwrap();
        assert_eq!(q.get("a"), Some(&GradeEntry::Score(2.0)));
        assert_eq!(q.get("b"), Some(&GradeEntry::Score(1.5)));
        assert_eq!(q.get("c"), Some(&GradeEntry::Text("3".into())));
        assert_eq!(q.get("is_bonus"), Some(&GradeEntry::Flag(true)));
        assert_eq!(q.feedback(), "nice");
        let criteria: Vec<&str> = q.criteria().map(|(k, _)| k).collect();
        assert_eq!(criteria, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_form_preserves_exercise_order() {
        let mut form = GradingSchema::new();
        form.insert(name("Zeta"), ExerciseForm::new());
        form.insert(name("Alpha"), ExerciseForm::new());
        let names: Vec<&str> = form.exercises().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_weights_bonus_flag() {
        let json = r#"{"Q1": {"Code": 2, "Writing: clarity": 1.8}, "Q2 (optional)": {"Code": 1, "is_bonus": true}}"#;
        let weights = WeightSchema::from_json(json).unwrap();
        let q1 = weights.exercise("Q1").unwrap();
        assert!(!q1.is_bonus);
        assert_eq!(q1.weight("Writing: clarity"), Some(1.8));
        assert!(weights.exercise("Q2 (optional)").unwrap().is_bonus);
        assert!((weights.total() - 3.8).abs() < 1e-12);

        let rendered = serde_json::to_value(&weights).unwrap();
        assert_eq!(rendered["Q2 (optional)"]["is_bonus"], serde_json::json!(true));
        assert!(rendered["Q1"].get("is_bonus").is_none());
    }

    #[test]
    fn test_malformed_form() {
        let err = GradingSchema::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, GradingError::MalformedDocument { document: "grading form", .. }));
    }
}
