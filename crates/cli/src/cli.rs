use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grading::AssessmentStatus;

#[derive(Parser, Debug)]
#[command(name = "coursework", author, version, about = "Grade, group and report on course assessments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Course directory holding the configuration files
    #[arg(long, global = true, default_value = ".", env = "COURSEWORK_ROOT")]
    pub root: PathBuf,

    /// Directory backing the grade store (default: <root>/grades)
    #[arg(long, global = true, env = "COURSEWORK_STORE")]
    pub store: Option<PathBuf>,

    /// Log level or filter directive (e.g. debug, grading=trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Directory backing the grade store.
    pub fn store_dir(&self) -> PathBuf {
        self.store.clone().unwrap_or_else(|| self.root.join("grades"))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve partner requests into groups and store them
    Groups {
        /// Assessment key from course_config.json
        assessment: String,

        /// Roster file, one login per line
        #[arg(long)]
        roster: PathBuf,

        /// JSON object mapping each login to their partner request
        #[arg(long)]
        requests: Option<PathBuf>,
    },

    /// Parse the assessment document and create blank grading forms
    Forms {
        /// Assessment key from course_config.json
        assessment: String,

        /// Assessment document (default: the assessment's main-file)
        document: Option<PathBuf>,
    },

    /// Print one group's grade report
    Report {
        /// Assessment key from course_config.json
        assessment: String,

        /// Logins of the group members, comma-separated
        #[arg(required = true, value_delimiter = ',')]
        members: Vec<String>,
    },

    /// Write grade reports for every student and mark the assessment returned
    Return {
        /// Assessment key from course_config.json
        assessment: String,
    },

    /// Build the course grade table and statistics
    Tabulate,

    /// Write final course grade reports
    CourseReports,

    /// Show the status board, or set one entry
    Status {
        /// Assessment key or course name
        key: Option<String>,

        /// New status (unavailable, open, closed, returned)
        #[arg(requires = "key")]
        status: Option<AssessmentStatus>,
    },

    /// Assign peer reviews between the groups of an assessment
    PeerReview {
        /// Assessment key from course_config.json
        assessment: String,

        /// Seed for a reproducible assignment
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Commands {
    /// Subcommand name used in the root span.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Groups { .. } => "groups",
            Self::Forms { .. } => "forms",
            Self::Report { .. } => "report",
            Self::Return { .. } => "return",
            Self::Tabulate => "tabulate",
            Self::CourseReports => "course-reports",
            Self::Status { .. } => "status",
            Self::PeerReview { .. } => "peer-review",
        }
    }
}
