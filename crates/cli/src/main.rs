//! Coursework CLI entry point.
//!
//! This binary is the composition root. It loads the course configuration,
//! wires structured logging, opens the directory-backed grade store, and hands
//! each subcommand to a [`workflow::Gradebook`].

mod cli;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use grading::{AssessmentName, DiagnosticSeverity, Group, StudentLogin};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use store::DirectoryStore;
use tracing::{error, info, info_span};
use uuid::Uuid;
use workflow::Gradebook;

use crate::cli::{Cli, Commands};
use crate::config::CourseFiles;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(2) } else { ExitCode::SUCCESS };
        }
    };

    if let Err(e) = logging::init_tracing(cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("coursework", run_id = %run_id, command = cli.command.name());
    let _guard = span.enter();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let files = CourseFiles::load(&cli.root)?;
    let store_dir = cli.store_dir();
    let store = DirectoryStore::open(&store_dir)
        .with_context(|| format!("Failed to open grade store at {}", store_dir.display()))?;
    info!(root = %cli.root.display(), store = %store_dir.display(), "opened course");

    let mut book = Gradebook::new(
        store,
        files.catalog.clone(),
        files.course.clone(),
        files.settings.clone(),
    );

    match &cli.command {
        Commands::Groups {
            assessment,
            roster,
            requests,
        } => {
            let assessment = assessment_name(assessment)?;
            let roster = config::parse_roster(&config::read(&files.resolve(roster))?);
            let requests = match requests {
                Some(path) => config::parse_requests(&config::read(&files.resolve(path))?)?,
                None => IndexMap::new(),
            };
            let resolution = book.establish_groups(&assessment, &roster, &requests)?;
            for group in &resolution.groups {
                println!("{}", group.pretty());
            }
            for diagnostic in &resolution.diagnostics {
                let label = match diagnostic.severity {
                    DiagnosticSeverity::Warning => "warning",
                    DiagnosticSeverity::Informational => "note",
                };
                eprintln!("{label}: {diagnostic}");
            }
        }

        Commands::Forms { assessment, document } => {
            let name = assessment_name(assessment)?;
            let document = match document {
                Some(path) => path.clone(),
                None => files
                    .course
                    .assessment(assessment)
                    .and_then(|config| config.main_file.as_ref())
                    .map(PathBuf::from)
                    .with_context(|| format!("No document given and \"{assessment}\" has no main-file"))?,
            };
            let path = files.resolve(&document);
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let summary = book.create_grade_forms(&name, &file_name, &config::read(&path)?)?;
            println!("created {} forms, kept {} existing", summary.created, summary.skipped);
        }

        Commands::Report { assessment, members } => {
            let assessment = assessment_name(assessment)?;
            let group = Group::new(members.iter().filter_map(|m| StudentLogin::new(m.trim())))
                .context("A group needs at least one member")?;
            let report = book.grade_report(&assessment, &group)?;
            println!("{}", report.report);
        }

        Commands::Return { assessment } => {
            let summary = book.return_reports(&assessment_name(assessment)?)?;
            println!(
                "returned {} reports for {} groups ({} not submitted)",
                summary.reports, summary.groups, summary.not_submitted
            );
        }

        Commands::Tabulate => {
            let summary = book.tabulate()?;
            let names: Vec<&str> = summary.assessments.iter().map(|a| a.as_str()).collect();
            println!("tabulated: {}", names.join(", "));
            if summary.skipped_groups > 0 {
                eprintln!("warning: skipped {} groups that could not be scored", summary.skipped_groups);
            }
            if !summary.course_grades {
                println!("course grades pending until every assessment is graded");
            }
        }

        Commands::CourseReports => {
            let written = book.course_reports()?;
            println!("wrote {written} final reports");
        }

        Commands::Status { key, status } => {
            book.init_status()?;
            if let (Some(key), Some(status)) = (key, status) {
                if !book.set_status(key, *status)? {
                    println!("{key} is already {status}");
                }
            }
            for (key, status) in book.status()? {
                println!("{key}: {status}");
            }
        }

        Commands::PeerReview { assessment, seed } => {
            let assessment = assessment_name(assessment)?;
            let assignments = match seed {
                Some(seed) => book.assign_peer_reviews(&assessment, &mut StdRng::seed_from_u64(*seed))?,
                None => book.assign_peer_reviews(&assessment, &mut rand::rng())?,
            };
            match assignments {
                Some(assignments) => {
                    for assignment in assignments.iter() {
                        let reviewees: Vec<String> = assignment.reviewees.iter().map(Group::pretty).collect();
                        println!("{} reviews {}", assignment.reviewer.pretty(), reviewees.join("; "));
                    }
                }
                None => println!("no peer reviews assigned for {assessment}"),
            }
        }
    }

    Ok(())
}

fn assessment_name(raw: &str) -> Result<AssessmentName> {
    AssessmentName::new(raw.trim()).context("Assessment name must not be empty")
}

