//! End-to-end scenarios across parser, aggregator and course grade.

use grading::forms::{GradeEntry, UNFILLED_SENTINEL};
use grading::scoring::NOT_SUBMITTED_REPORT;
use grading::{
    AssessmentName, CourseConfig, CourseGradeAggregator, DocumentKind, ExerciseName, GradingError,
    GradingSchema, ReportMode, RubricCatalog, RubricSnippetParser, ScoreAggregator, SubmissionStatus,
};
use indexmap::IndexMap;

const CATALOG: &str = r#"{
    "code": {"name": "Code Quality"},
    "writing": {"name": "Writing", "rows": {"clarity": 0.6, "grammar": 0.4}},
    "reasoning": {"name": "Reasoning"}
}"#;

const LAB: &str = r#"# Lab 1

Some preamble.

## Exercise 1

Write a function.

rubric: {code: 2, writing: 3}

## Exercise 2 (optional)

rubric={reasoning:4}
"#;

fn parser() -> RubricSnippetParser {
    RubricSnippetParser::new(RubricCatalog::from_json(CATALOG).unwrap())
}

fn fill(form: &mut GradingSchema, exercise: &str, scores: &[(&str, f64)]) {
    let exercise = form.exercise_mut(exercise).unwrap();
    for (criterion, score) in scores {
        exercise.set(*criterion, GradeEntry::Score(*score));
    }
}

#[test]
fn test_parse_and_persist_blank_form() {
    let parsed = parser().parse(LAB, false, DocumentKind::Markdown).unwrap();
    let json: serde_json::Value = serde_json::from_str(&parsed.form.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["Exercise 1"]["Code Quality"], UNFILLED_SENTINEL);
    assert_eq!(json["Exercise 1"]["Writing: clarity"], UNFILLED_SENTINEL);
    assert_eq!(json["Exercise 1"]["feedback"], "");
    assert_eq!(json["Exercise 2 (optional)"]["is_bonus"], true);

    let weights: serde_json::Value =
        serde_json::from_str(&parsed.weights.to_json_pretty().unwrap()).unwrap();
    assert_eq!(weights["Exercise 1"]["Writing: grammar"], 1.2);
    assert_eq!(weights["Exercise 2 (optional)"]["is_bonus"], true);
}

#[test]
fn test_graded_lab_with_bonus_and_peer_review() {
    let parsed = parser().parse(LAB, true, DocumentKind::Markdown).unwrap();
    let mut form = parsed.form.clone();
    fill(
        &mut form,
        "Exercise 1",
        &[("Code Quality", 2.0), ("Writing: clarity", 1.8), ("Writing: grammar", 0.2)],
    );
    fill(&mut form, "Exercise 2 (optional)", &[("Reasoning", 1.0)]);
    fill(&mut form, "PEER REVIEW", &[("Peer Review", 1.0)]);

    // Round-trip through the persisted documents, as the workflow does.
    let form = GradingSchema::from_json(&form.to_json_pretty().unwrap()).unwrap();
    let weights = grading::WeightSchema::from_json(&parsed.weights.to_json_pretty().unwrap()).unwrap();

    let report = ScoreAggregator::new()
        .with_mode(ReportMode::Detailed)
        .score(&form, &weights)
        .unwrap();

    // Peer review: (5 + 4) * 0.15 / 0.85 = 1.588... -> 1.59
    let denominator = 5.0 + 1.59;
    let numerator = 4.0 + 1.0 + 1.0;
    assert!((report.denominator - denominator).abs() < 1e-9);
    assert!((report.numerator - numerator).abs() < 1e-9);
    assert!((report.grade - numerator / denominator * 100.0).abs() < 1e-9);
    assert_eq!(report.exercise_grades["Exercise 2 (optional)"], 0.25);
    assert!(report.report.contains("#### PEER REVIEW"));
}

#[test]
fn test_course_grade_from_assessment_reports() {
    let course = CourseConfig::from_json(r#"{"lab1": {"weight": 0.3}, "quiz1": {"weight": 0.7}}"#).unwrap();
    let aggregator = CourseGradeAggregator::new(&course).unwrap();

    let parsed = parser().parse(LAB, false, DocumentKind::Markdown).unwrap();
    let mut form = parsed.form;
    fill(
        &mut form,
        "Exercise 1",
        &[("Code Quality", 2.0), ("Writing: clarity", 1.8), ("Writing: grammar", 1.2)],
    );
    let lab = ScoreAggregator::new().score(&form, &parsed.weights).unwrap();
    assert_eq!(lab.grade, 100.0);

    let grades: IndexMap<AssessmentName, f64> = [
        (AssessmentName::new("lab1").unwrap(), lab.grade),
        (AssessmentName::new("quiz1").unwrap(), 50.0),
    ]
    .into_iter()
    .collect();
    let course_grade = aggregator.aggregate(&grades).unwrap();
    assert_eq!(course_grade.grade, 65);
}

#[test]
fn test_unsubmitted_lab() {
    let parsed = parser().parse(LAB, true, DocumentKind::Markdown).unwrap();
    let report = ScoreAggregator::new().score(&parsed.form, &parsed.weights).unwrap();
    assert_eq!(report.status, SubmissionStatus::NotSubmitted);
    assert_eq!(report.grade, 0.0);
    assert_eq!(report.report, NOT_SUBMITTED_REPORT);
}

#[test]
fn test_latex_document() {
    let tex = r"\section{Warm-up}
% rubric={code: 1}
\subsection*{Main task}
% rubric={code: 3, writing: 1}
";
    let parsed = parser().parse(tex, false, DocumentKind::from_file_name("hw1.tex")).unwrap();
    let names: Vec<&str> = parsed.form.exercises().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Warm-up", "Main task"]);
    assert_eq!(parsed.total_points, 5.0);
}

#[test]
fn test_document_errors_name_the_exercise() {
    let err = parser()
        .parse("# Q\nrubric={code: lots}\n", false, DocumentKind::Markdown)
        .unwrap_err();
    match err {
        GradingError::InvalidPoints { rubric, exercise, token } => {
            assert_eq!((rubric.as_str(), exercise.as_str(), token.as_str()), ("code", "Q", "lots"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = parser()
        .parse("# Q\nrubric={style: 1}\n", false, DocumentKind::Markdown)
        .unwrap_err();
    assert!(matches!(err, GradingError::UnknownRubric { rubric, .. } if rubric == "style"));

    let err = parser()
        .parse("# Q\nrubric={code: 1}\n# Q\nrubric={code: 1}\n", false, DocumentKind::Markdown)
        .unwrap_err();
    assert!(matches!(err, GradingError::DuplicateExercise { exercise } if exercise == "Q"));
}

#[test]
fn test_exercise_name_type_is_shared() {
    let parsed = parser().parse(LAB, false, DocumentKind::Markdown).unwrap();
    let first: &ExerciseName = parsed.form.exercises().next().unwrap().0;
    assert_eq!(first.as_str(), "Exercise 1");
}
