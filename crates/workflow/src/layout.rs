//! Store paths of every document the workflow reads or writes.

use grading::{AssessmentName, Group, StudentLogin};

/// Status of every assessment and of the course itself.
pub const STATUS_FILE: &str = "status.json";

/// Per-student table of assessment and course grades.
pub const GRADES_FILE: &str = "grades.json";

/// Course-wide summary statistics.
pub const COURSE_STATS_FILE: &str = "stats.md";

pub fn groups(assessment: &AssessmentName) -> String {
    format!("{assessment}/groups.json")
}

pub fn weights(assessment: &AssessmentName) -> String {
    format!("{assessment}/weights.json")
}

/// Directory holding one grading form per group.
pub fn forms_dir(assessment: &AssessmentName) -> String {
    format!("{assessment}/forms/")
}

pub fn form(assessment: &AssessmentName, group: &Group) -> String {
    format!("{}{}.json", forms_dir(assessment), group.canonical())
}

pub fn report(assessment: &AssessmentName, login: &StudentLogin) -> String {
    format!("{assessment}/reports/{login}_grades.md")
}

pub fn assessment_stats(assessment: &AssessmentName) -> String {
    format!("{assessment}/stats.md")
}

pub fn peer_review_assignments(assessment: &AssessmentName) -> String {
    format!("{assessment}/peer_review_assignments.json")
}

pub fn final_report(login: &StudentLogin) -> String {
    format!("final_reports/{login}_final-grade-report.md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_path_uses_canonical_group() {
        let group = Group::new([
            StudentLogin::new("zoe").unwrap(),
            StudentLogin::new("amy").unwrap(),
        ])
        .unwrap();
        let lab = AssessmentName::new("lab1").unwrap();
        assert_eq!(form(&lab, &group), "lab1/forms/amy_zoe.json");
        assert_eq!(
            report(&lab, &StudentLogin::new("amy").unwrap()),
            "lab1/reports/amy_grades.md"
        );
    }
}
