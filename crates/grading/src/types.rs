//! Shared value types for the grading domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. the peer-review share lies strictly
//! between 0 and 1) and participate in domain computations.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::GradingError;

// ---------------------------------------------------------------------------
// Weight types
// ---------------------------------------------------------------------------

/// Fraction of an assessment's total weight given to peer review once the
/// synthetic peer-review exercise has been added.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PeerReviewShare(f64);

impl PeerReviewShare {
    /// The share used when a course does not configure one.
    pub const DEFAULT: PeerReviewShare = PeerReviewShare(0.15);

    /// Creates a [`PeerReviewShare`], returning `None` unless `value` lies
    /// strictly inside `(0.0, 1.0)`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the share as an `f64`.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Weight the peer-review exercise needs so that it makes up this share
    /// of the post-inclusion total, rounded to two decimals.
    ///
    /// Solves `w / (total + w) = p` for `w`, i.e. `w = total * p / (1 - p)`.
    pub fn weight_for(self, total_points: f64) -> f64 {
        round_to(total_points * self.0 / (1.0 - self.0), 2)
    }
}

impl Default for PeerReviewShare {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for PeerReviewShare {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("peer review share {value} must lie in (0, 1)"))
    }
}

impl From<PeerReviewShare> for f64 {
    fn from(share: PeerReviewShare) -> f64 {
        share.0
    }
}

impl std::fmt::Display for PeerReviewShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Grade mapping
// ---------------------------------------------------------------------------

/// Lookup table remapping a raw rubric score to a scaled score before it is
/// weighted (e.g. `{"0": 0, "1": 0.5, "2": 0.8, "3": 1}`).
///
/// Deserialises from a JSON object whose keys are numeric strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradeMapping {
    entries: Vec<(f64, f64)>,
}

impl GradeMapping {
    const KEY_TOLERANCE: f64 = 1e-9;

    /// Builds a mapping from `(raw, scaled)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the scaled score for `raw`.
    pub fn map(&self, raw: f64) -> Result<f64, GradingError> {
        self.entries
            .iter()
            .find(|(key, _)| (key - raw).abs() < Self::KEY_TOLERANCE)
            .map(|(_, scaled)| *scaled)
            .ok_or(GradingError::UnmappedScore { score: raw })
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for GradeMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = indexmap::IndexMap::<String, f64>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(key, scaled)| {
                key.trim()
                    .parse::<f64>()
                    .map(|k| (k, scaled))
                    .map_err(|_| de::Error::custom(format!("grade mapping key \"{key}\" is not a number")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

// ---------------------------------------------------------------------------
// Assessment lifecycle
// ---------------------------------------------------------------------------

/// Where an assessment is in its lifecycle, as recorded in `status.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Not yet released to students.
    Unavailable,
    /// Released; submissions are being collected.
    Open,
    /// Deadline passed; grading forms are being filled in.
    Closed,
    /// Grade reports have been returned to students.
    Returned,
}

impl AssessmentStatus {
    /// Returns `true` once grading forms are expected to be complete.
    pub fn is_graded(self) -> bool {
        matches!(self, Self::Closed | Self::Returned)
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unavailable => "unavailable",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Returned => "returned",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for AssessmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unavailable" => Ok(Self::Unavailable),
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown assessment status \"{other}\"")),
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Severity level for a [`Diagnostic`] finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    /// The input was adjusted (e.g. a request ignored); the result is still valid.
    Warning,
    /// Contextual information with no effect on the result.
    Informational,
}

/// What a [`Diagnostic`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    /// A partner request was not matched by every implied co-member.
    Unreciprocated,
    /// A partner request asked for a group larger than allowed.
    GroupTooLarge,
    /// A requested name is not on the roster.
    UnknownStudent,
    /// A student listed themself as a partner.
    SelfRequest,
}

/// A structured, non-fatal finding produced while resolving groups.
///
/// Findings are returned alongside the result so the caller can show them to
/// course staff; warnings are also emitted as `tracing` warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of this finding.
    pub severity: DiagnosticSeverity,

    /// Category tag.
    pub category: DiagnosticCategory,

    /// Human-readable description of the finding.
    pub message: String,
}

impl Diagnostic {
    /// Creates a warning-level diagnostic.
    pub fn warning(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            category,
            message: message.into(),
        }
    }

    /// Creates an informational diagnostic.
    pub fn informational(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Informational,
            category,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
