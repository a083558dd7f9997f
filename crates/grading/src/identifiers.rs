//! Newtype domain identifiers.
//!
//! Every named concept in the grading domain is a distinct newtype wrapping a
//! `String`. This prevents accidentally interchanging, for example, an
//! [`ExerciseName`] with an [`AssessmentName`] even though both are plain text
//! in the underlying JSON documents.

use serde::{de, Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, Borrow<str>,
// and a Deserialize impl that goes through new().
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Self::new(value)
                    .ok_or_else(|| de::Error::custom(concat!(stringify!($name), " must not be empty")))
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: people
// ---------------------------------------------------------------------------

string_id! {
    /// A student's account login, as supplied by the authoritative roster.
    ///
    /// Stored case-preserving; partner requests are matched against the roster
    /// case-insensitively (see [`StudentLogin::matches_ignore_case`]).
    StudentLogin
}

impl StudentLogin {
    /// Returns `true` if `candidate` names this login, ignoring case and
    /// surrounding whitespace.
    pub fn matches_ignore_case(&self, candidate: &str) -> bool {
        self.0.to_lowercase() == candidate.trim().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Identifiers: coursework structure
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies an assessment (a lab, quiz, homework) by its configured key
    /// in the course configuration, e.g. `"lab1"`.
    AssessmentName
}

string_id! {
    /// The name of one exercise within an assessment document.
    ///
    /// Inferred from the nearest preceding section header or given explicitly
    /// in a rubric directive. Unique within one assessment.
    ExerciseName
}

impl ExerciseName {
    /// Wraps one of this crate's fixed, non-empty exercise names.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    /// Returns `true` if this exercise carries extra-credit semantics: its
    /// name contains "optional" or "bonus", case-insensitively.
    pub fn is_bonus(&self) -> bool {
        let lower = self.0.to_lowercase();
        lower.contains("optional") || lower.contains("bonus")
    }
}

string_id! {
    /// A key into the rubric catalog, as written inside a directive
    /// (e.g. `code`, `writing`).
    RubricKey
}
