//! Grade statistics across groups and students.
//!
//! Zero grades are left out everywhere; they are treated as missing
//! submissions.

use indexmap::IndexMap;

use crate::scoring::{AssessmentReport, SubmissionStatus};
use crate::table::{Cell, MarkdownTable};
use crate::ExerciseName;

// ---------------------------------------------------------------------------
// Per-exercise averages
// ---------------------------------------------------------------------------

/// Running mean of each exercise's fractional grade within one assessment.
#[derive(Debug, Clone, Default)]
pub struct ExerciseAverages {
    totals: IndexMap<ExerciseName, (f64, usize)>,
}

impl ExerciseAverages {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one group's exercise grades. Returns `false` (and records
    /// nothing) when the group's assessment grade is zero.
    pub fn record(&mut self, report: &AssessmentReport) -> bool {
        if report.status == SubmissionStatus::NotSubmitted || report.grade == 0.0 {
            return false;
        }
        for (name, fraction) in &report.exercise_grades {
            let entry = self.totals.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += fraction;
            entry.1 += 1;
        }
        true
    }

    /// Mean fractional grade per exercise, in first-seen order.
    pub fn averages(&self) -> IndexMap<ExerciseName, f64> {
        self.totals
            .iter()
            .map(|(name, (sum, count))| (name.clone(), sum / *count as f64))
            .collect()
    }

    /// Returns `true` if no group has been recorded.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Renders `Exercise Name | Average Grade` with whole percentages.
    pub fn render(&self) -> String {
        let mut table = MarkdownTable::new(["Exercise Name", "Average Grade"]);
        for (name, average) in self.averages() {
            table.push_row(vec![name.as_str().into(), (average * 100.0).round_ties_even().into()]);
        }
        table.render()
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Distribution of the non-zero grades of one assessment (or the course).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStatistics {
    /// Number of non-zero grades summarised.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Middle grade, or the mean of the two middle grades.
    pub median: f64,
    /// Sample standard deviation; `None` with fewer than two grades.
    pub std_dev: Option<f64>,
    /// Lowest non-zero grade.
    pub min: f64,
    /// Highest grade.
    pub max: f64,
}

impl SummaryStatistics {
    /// Summarises `grades`, ignoring zeros. Returns `None` if no non-zero
    /// grade remains.
    pub fn from_grades(grades: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = grades.into_iter().filter(|g| *g != 0.0).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        };
        let std_dev = (count > 1).then(|| {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        });

        Some(Self {
            count,
            mean,
            median,
            std_dev,
            min: values[0],
            max: values[count - 1],
        })
    }
}

/// Renders the course-wide statistics page: a heading followed by one
/// `Assessment | Mean | Median | SD | Min | Max` row per entry, rounded to
/// whole numbers.
pub fn render_summary(course_name: &str, rows: &[(String, SummaryStatistics)]) -> String {
    let mut table = MarkdownTable::new(["Assessment", "Mean", "Median", "SD", "Min", "Max"]);
    for (label, stats) in rows {
        let sd = stats
            .std_dev
            .map(|sd| Cell::Number(sd.round_ties_even()))
            .unwrap_or_else(Cell::empty);
        table.push_row(vec![
            label.as_str().into(),
            stats.mean.round_ties_even().into(),
            stats.median.round_ties_even().into(),
            sd,
            stats.min.round_ties_even().into(),
            stats.max.round_ties_even().into(),
        ]);
    }
    format!("## {course_name} grade statistics\n\n{}", table.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(grade: f64, exercises: &[(&str, f64)]) -> AssessmentReport {
        AssessmentReport {
            status: SubmissionStatus::Graded,
            report: String::new(),
            grade,
            exercise_grades: exercises
                .iter()
                .map(|(n, g)| (ExerciseName::new(*n).unwrap(), *g))
                .collect(),
            exercises: Vec::new(),
            numerator: 0.0,
            denominator: 0.0,
        }
    }

    #[test]
    fn test_averages_skip_zero_grades() {
        let mut averages = ExerciseAverages::new();
        assert!(averages.record(&report(80.0, &[("Q1", 1.0), ("Q2", 0.5)])));
        assert!(averages.record(&report(60.0, &[("Q1", 0.5), ("Q2", 0.5)])));
        assert!(!averages.record(&report(0.0, &[("Q1", 0.0), ("Q2", 0.0)])));

        let means = averages.averages();
        assert_eq!(means["Q1"], 0.75);
        assert_eq!(means["Q2"], 0.5);

        let rendered = averages.render();
        assert!(rendered.starts_with("| Exercise Name "));
        assert!(rendered.contains("| Q1              |              75 |"));
    }

    #[test]
    fn test_summary_statistics() {
        let stats = SummaryStatistics::from_grades([0.0, 70.0, 80.0, 90.0, 100.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 85.0);
        assert_eq!(stats.median, 85.0);
        assert_eq!(stats.min, 70.0);
        assert_eq!(stats.max, 100.0);
        let sd = stats.std_dev.unwrap();
        assert!((sd - 12.909944).abs() < 1e-5);
    }

    #[test]
    fn test_summary_of_nothing() {
        assert!(SummaryStatistics::from_grades([0.0, 0.0]).is_none());
        let single = SummaryStatistics::from_grades([42.0]).unwrap();
        assert_eq!(single.std_dev, None);
    }

    #[test]
    fn test_render_summary() {
        let stats = SummaryStatistics::from_grades([70.0, 81.0]).unwrap();
        let page = render_summary("DSCI 100", &[("lab1".to_string(), stats)]);
        assert!(page.starts_with("## DSCI 100 grade statistics\n\n| Assessment "));
        let last = page.lines().last().unwrap();
        assert!(last.starts_with("| lab1 "));
        assert!(last.contains(" 76 "));
        assert!(last.contains(" 8 "));
    }
}
