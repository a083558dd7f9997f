//! The course gradebook: every workflow step over one grades repository.

use indexmap::IndexMap;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use grading::course::COURSE_GRADE_LABEL;
use grading::stats::render_summary;
use grading::{
    AssessmentConfig, AssessmentName, AssessmentReport, AssessmentStatus, CourseConfig,
    CourseGradeAggregator, DocumentKind, ExerciseAverages, FileStore, Group, GroupResolution,
    GroupResolver, GradingSchema, PeerReviewAssignments, RubricCatalog, RubricSnippetParser,
    ScoreAggregator, StudentLogin, SubmissionStatus, SummaryStatistics, WeightSchema, WriteOutcome,
};

use crate::layout::{self, COURSE_STATS_FILE, GRADES_FILE, STATUS_FILE};
use crate::{CourseSettings, WorkflowError};

/// Status of every assessment, plus the course itself under its name.
pub type StatusBoard = IndexMap<String, AssessmentStatus>;

/// Outcome of [`Gradebook::create_grade_forms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormsSummary {
    /// Forms written for groups that had none.
    pub created: usize,
    /// Groups whose existing form was left untouched.
    pub skipped: usize,
}

/// Outcome of [`Gradebook::return_reports`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReturnSummary {
    pub groups: usize,
    pub reports: usize,
    pub not_submitted: usize,
}

/// Outcome of [`Gradebook::tabulate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabulateSummary {
    /// Assessments whose grades were tabulated.
    pub assessments: Vec<AssessmentName>,
    /// Groups left out because their form could not be scored.
    pub skipped_groups: usize,
    /// Whether course grades were added.
    pub course_grades: bool,
}

/// Student login → column → grade; persisted as `grades.json`.
///
/// Columns are assessment names in course order, followed by
/// [`COURSE_GRADE_LABEL`] once every assessment is graded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeTable {
    students: IndexMap<StudentLogin, IndexMap<String, f64>>,
}

impl GradeTable {
    /// Sets one grade.
    pub fn set(&mut self, student: &StudentLogin, column: &str, grade: f64) {
        self.students
            .entry(student.clone())
            .or_default()
            .insert(column.to_string(), grade);
    }

    /// Looks up one grade.
    pub fn grade(&self, student: &str, column: &str) -> Option<f64> {
        self.students.get(student)?.get(column).copied()
    }

    /// Iterates over students and their grades.
    pub fn students(&self) -> impl Iterator<Item = (&StudentLogin, &IndexMap<String, f64>)> {
        self.students.iter()
    }

    /// All grades recorded in `column`.
    pub fn column(&self, column: &str) -> Vec<f64> {
        self.students
            .values()
            .filter_map(|grades| grades.get(column).copied())
            .collect()
    }

    /// Number of students.
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Returns `true` if no student has a grade.
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    fn sort(&mut self) {
        self.students.sort_keys();
    }
}

/// Runs workflow steps for one course against a [`FileStore`].
pub struct Gradebook<S> {
    store: S,
    course: CourseConfig,
    settings: CourseSettings,
    parser: RubricSnippetParser,
    scorer: ScoreAggregator,
}

impl<S: FileStore> Gradebook<S> {
    /// Creates a gradebook from the course's configuration documents.
    pub fn new(store: S, catalog: RubricCatalog, course: CourseConfig, settings: CourseSettings) -> Self {
        let parser = RubricSnippetParser::new(catalog).with_peer_review_share(settings.peer_review_share);
        let mut scorer = ScoreAggregator::new().with_mode(settings.report_mode());
        if let Some(mapping) = settings.grade_mapping.clone() {
            scorer = scorer.with_grade_mapping(mapping);
        }
        Self {
            store,
            course,
            settings,
            parser,
            scorer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn course(&self) -> &CourseConfig {
        &self.course
    }

    pub fn settings(&self) -> &CourseSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Current status board; defaults to every assessment unavailable and
    /// the course open when `status.json` does not exist yet.
    pub fn status(&self) -> Result<StatusBoard, WorkflowError> {
        Ok(self.read_json(STATUS_FILE)?.unwrap_or_else(|| self.initial_status()))
    }

    /// Writes the default status board unless one exists.
    pub fn init_status(&mut self) -> Result<WriteOutcome, WorkflowError> {
        let board = self.initial_status();
        self.write_json(STATUS_FILE, &board, false)
    }

    /// Sets the status of `key` (an assessment or the course name).
    ///
    /// Returns `false` without writing if the status is unchanged.
    pub fn set_status(&mut self, key: &str, status: AssessmentStatus) -> Result<bool, WorkflowError> {
        let mut board = self.status()?;
        match board.get(key) {
            Some(current) if *current == status => {
                warn!(key, %status, "status is already set; nothing to do");
                return Ok(false);
            }
            None => warn!(key, "adding a new key to the status board"),
            Some(_) => {}
        }
        board.insert(key.to_string(), status);
        self.write_json(STATUS_FILE, &board, true)?;
        info!(key, %status, "updated status");
        Ok(true)
    }

    fn initial_status(&self) -> StatusBoard {
        let mut board: StatusBoard = self
            .course
            .names()
            .map(|name| (name.to_string(), AssessmentStatus::Unavailable))
            .collect();
        board.insert(self.settings.name.clone(), AssessmentStatus::Open);
        board
    }

    // -----------------------------------------------------------------------
    // Groups and forms
    // -----------------------------------------------------------------------

    /// Resolves partner requests for `assessment` and stores the groups.
    #[instrument(skip_all, fields(assessment = %assessment))]
    pub fn establish_groups(
        &mut self,
        assessment: &AssessmentName,
        roster: &[StudentLogin],
        requests: &IndexMap<StudentLogin, String>,
    ) -> Result<GroupResolution, WorkflowError> {
        let mut resolver = GroupResolver::new();
        if let Some(max) = self.assessment(assessment)?.max_group_size {
            resolver = resolver.with_max_group_size(max);
        }
        let resolution = resolver.resolve(roster, requests)?;
        self.write_json(&layout::groups(assessment), &resolution.groups, true)?;
        info!(
            groups = resolution.groups.len(),
            diagnostics = resolution.diagnostics.len(),
            "stored groups"
        );
        Ok(resolution)
    }

    /// Reads the stored groups of `assessment`.
    pub fn load_groups(&self, assessment: &AssessmentName) -> Result<Vec<Group>, WorkflowError> {
        self.require_json(&layout::groups(assessment))
    }

    /// Parses the assessment document, stores its weights, and creates a
    /// blank grading form for every group that does not have one yet.
    #[instrument(skip_all, fields(assessment = %assessment, document = document_name))]
    pub fn create_grade_forms(
        &mut self,
        assessment: &AssessmentName,
        document_name: &str,
        document: &str,
    ) -> Result<FormsSummary, WorkflowError> {
        let peer_review = self.assessment(assessment)?.peer_review_enabled();
        let groups = self.load_groups(assessment)?;
        let parsed = self
            .parser
            .parse(document, peer_review, DocumentKind::from_file_name(document_name))?;

        let mut blank = parsed.form;
        blank.set_overall_feedback("");

        self.write_json(&layout::weights(assessment), &parsed.weights, true)?;

        let mut summary = FormsSummary::default();
        for group in &groups {
            match self.write_json(&layout::form(assessment, group), &blank, false)? {
                WriteOutcome::Skipped => {
                    debug!(group = %group, "form exists; grading may be in progress");
                    summary.skipped += 1;
                }
                _ => summary.created += 1,
            }
        }
        info!(
            exercises = blank.len(),
            created = summary.created,
            skipped = summary.skipped,
            "created grade forms"
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Scores one group's form.
    pub fn grade_report(&self, assessment: &AssessmentName, group: &Group) -> Result<AssessmentReport, WorkflowError> {
        self.assessment(assessment)?;
        let weights: WeightSchema = self.require_json(&layout::weights(assessment))?;
        self.score_group(assessment, group, &weights)
    }

    /// Writes a report for every student of a graded assessment and marks it
    /// returned. Fails before writing anything if any group cannot be scored.
    #[instrument(skip_all, fields(assessment = %assessment))]
    pub fn return_reports(&mut self, assessment: &AssessmentName) -> Result<ReturnSummary, WorkflowError> {
        self.assessment(assessment)?;
        let status = self.status()?.get(assessment.as_str()).copied();
        if !status.is_some_and(AssessmentStatus::is_graded) {
            return Err(WorkflowError::NotReady {
                reason: format!("{assessment} must be closed before reports are returned"),
            });
        }

        let groups = self.load_groups(assessment)?;
        let weights: WeightSchema = self.require_json(&layout::weights(assessment))?;

        let mut scored = Vec::with_capacity(groups.len());
        for group in &groups {
            let report = self
                .score_group(assessment, group, &weights)
                .map_err(|err| match err {
                    WorkflowError::Grading(source) => WorkflowError::Scoring {
                        group: group.canonical(),
                        source,
                    },
                    other => other,
                })?;
            scored.push((group, report));
        }

        let mut summary = ReturnSummary::default();
        for (group, report) in scored {
            if report.status == SubmissionStatus::NotSubmitted {
                summary.not_submitted += 1;
            }
            for login in group.members() {
                self.store
                    .write(&layout::report(assessment, login), &report.report, true)?;
                summary.reports += 1;
            }
            summary.groups += 1;
        }

        self.set_status(assessment.as_str(), AssessmentStatus::Returned)?;
        info!(groups = summary.groups, reports = summary.reports, "returned reports");
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Tabulation
    // -----------------------------------------------------------------------

    /// Tabulates every closed or returned assessment.
    ///
    /// Writes per-assessment exercise averages, `grades.json` and the
    /// course statistics page. Course grades are included only when every
    /// assessment is graded. Groups whose form cannot be scored are skipped.
    #[instrument(skip(self))]
    pub fn tabulate(&mut self) -> Result<TabulateSummary, WorkflowError> {
        let board = self.status()?;
        let names: Vec<AssessmentName> = self.course.names().cloned().collect();

        let mut table = GradeTable::default();
        let mut summary = TabulateSummary::default();
        let mut all_graded = true;

        for assessment in &names {
            let graded = board
                .get(assessment.as_str())
                .is_some_and(|status| status.is_graded());
            if !graded {
                debug!(assessment = %assessment, "not closed yet; skipping");
                all_graded = false;
                continue;
            }

            let groups = self.load_groups(assessment)?;
            let weights: WeightSchema = self.require_json(&layout::weights(assessment))?;
            let mut averages = ExerciseAverages::new();

            for group in &groups {
                let report = match self.score_group(assessment, group, &weights) {
                    Ok(report) => report,
                    Err(err) => {
                        warn!(assessment = %assessment, group = %group, error = %err, "skipping group that is not fully graded");
                        summary.skipped_groups += 1;
                        continue;
                    }
                };
                if report.grade == 0.0 {
                    info!(assessment = %assessment, group = %group, "group received a grade of zero");
                }
                averages.record(&report);
                for login in group.members() {
                    table.set(login, assessment.as_str(), report.grade);
                }
            }

            self.store
                .write(&layout::assessment_stats(assessment), &averages.render(), true)?;
            summary.assessments.push(assessment.clone());
        }

        if all_graded && !names.is_empty() {
            let aggregator = CourseGradeAggregator::new(&self.course)?;
            let students: Vec<StudentLogin> = table.students().map(|(login, _)| login.clone()).collect();
            for login in &students {
                match aggregator.aggregate(&assessment_grades(&table, login)) {
                    Ok(course) => table.set(login, COURSE_GRADE_LABEL, f64::from(course.grade)),
                    Err(err) => warn!(student = %login, error = %err, "no course grade"),
                }
            }
            summary.course_grades = true;
        }

        table.sort();
        self.write_json(GRADES_FILE, &table, true)?;

        let columns = names
            .iter()
            .map(AssessmentName::as_str)
            .chain(summary.course_grades.then_some(COURSE_GRADE_LABEL));
        let rows: Vec<(String, SummaryStatistics)> = columns
            .filter_map(|column| {
                SummaryStatistics::from_grades(table.column(column)).map(|stats| (column.to_string(), stats))
            })
            .collect();
        self.store
            .write(COURSE_STATS_FILE, &render_summary(&self.settings.name, &rows), true)?;

        info!(
            assessments = summary.assessments.len(),
            students = table.len(),
            course_grades = summary.course_grades,
            "tabulated grades"
        );
        Ok(summary)
    }

    /// Writes a final course grade report for every tabulated student.
    ///
    /// Every assessment must be returned and `grades.json` must exist. Fails
    /// before writing anything if any student lacks an assessment grade.
    #[instrument(skip(self))]
    pub fn course_reports(&mut self) -> Result<usize, WorkflowError> {
        let board = self.status()?;
        for name in self.course.names() {
            let status = board.get(name.as_str()).copied().unwrap_or(AssessmentStatus::Unavailable);
            if status != AssessmentStatus::Returned {
                return Err(WorkflowError::NotReady {
                    reason: format!("{name} is {status}; every assessment must be returned first"),
                });
            }
        }

        let table: GradeTable = self.read_json(GRADES_FILE)?.ok_or_else(|| WorkflowError::NotReady {
            reason: "grades have not been tabulated".to_string(),
        })?;
        let aggregator = CourseGradeAggregator::new(&self.course)?;

        let mut reports = Vec::with_capacity(table.len());
        for (login, _) in table.students() {
            let course = aggregator
                .aggregate(&assessment_grades(&table, login))
                .map_err(|source| WorkflowError::CourseGrade {
                    student: login.to_string(),
                    source,
                })?;
            let report = format!(
                "## {} final grade report for {login}\n\n{}",
                self.settings.name, course.report
            );
            reports.push((layout::final_report(login), report));
        }

        for (path, report) in &reports {
            self.store.write(path, report, true)?;
        }
        info!(reports = reports.len(), "wrote final course reports");
        Ok(reports.len())
    }

    // -----------------------------------------------------------------------
    // Peer review
    // -----------------------------------------------------------------------

    /// Assigns peer reviews between the groups of `assessment`.
    ///
    /// Returns `None` when peer review is disabled or there are too few
    /// groups. Existing assignments are never replaced.
    #[instrument(skip_all, fields(assessment = %assessment))]
    pub fn assign_peer_reviews<R: Rng + ?Sized>(
        &mut self,
        assessment: &AssessmentName,
        rng: &mut R,
    ) -> Result<Option<PeerReviewAssignments>, WorkflowError> {
        let reviews = self.assessment(assessment)?.peer_review;
        let groups = self.load_groups(assessment)?;
        let Some(assignments) = PeerReviewAssignments::assign(&groups, reviews, rng) else {
            return Ok(None);
        };

        let path = layout::peer_review_assignments(assessment);
        if self.write_json(&path, &assignments, false)? == WriteOutcome::Skipped {
            warn!(path = %path, "peer review assignments already exist; keeping them");
            return self.read_json(&path);
        }
        info!(reviewers = assignments.len(), "assigned peer reviews");
        Ok(Some(assignments))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn assessment(&self, name: &AssessmentName) -> Result<&AssessmentConfig, WorkflowError> {
        self.course
            .assessment(name.as_str())
            .ok_or_else(|| WorkflowError::UnknownAssessment {
                assessment: name.to_string(),
            })
    }

    fn score_group(
        &self,
        assessment: &AssessmentName,
        group: &Group,
        weights: &WeightSchema,
    ) -> Result<AssessmentReport, WorkflowError> {
        let form: GradingSchema = self.require_json(&layout::form(assessment, group))?;
        Ok(self.scorer.score(&form, weights)?)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, WorkflowError> {
        let Some(contents) = self.store.read(path)? else {
            return Ok(None);
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| WorkflowError::Json {
                path: path.to_string(),
                source,
            })
    }

    fn require_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WorkflowError> {
        self.read_json(path)?.ok_or_else(|| WorkflowError::MissingFile {
            path: path.to_string(),
        })
    }

    fn write_json<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        value: &T,
        overwrite: bool,
    ) -> Result<WriteOutcome, WorkflowError> {
        let contents = serde_json::to_string_pretty(value).map_err(|source| WorkflowError::Json {
            path: path.to_string(),
            source,
        })?;
        Ok(self.store.write(path, &contents, overwrite)?)
    }
}

/// The per-assessment grades of one student, without the course column.
fn assessment_grades(table: &GradeTable, login: &StudentLogin) -> IndexMap<AssessmentName, f64> {
    table
        .students
        .get(login)
        .into_iter()
        .flatten()
        .filter(|(column, _)| column.as_str() != COURSE_GRADE_LABEL)
        .filter_map(|(column, grade)| AssessmentName::new(column.as_str()).map(|name| (name, *grade)))
        .collect()
}
