use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events are shown at the requested level.
const WORKSPACE_TARGETS: [&str; 4] = ["coursework", "grading", "workflow", "store"];

const DEFAULT_LEVEL: &str = "info";

/// Initialise structured logging on stderr.
///
/// `RUST_LOG` or `COURSEWORK_LOG` override `log_level`. A bare level such as
/// `debug` applies to every workspace crate; anything containing `=` is used
/// as a filter directive verbatim.
pub fn init_tracing(log_level: Option<&str>, log_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = log_level.unwrap_or(DEFAULT_LEVEL);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("COURSEWORK_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(directives(level)));

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

fn directives(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_applies_to_workspace() {
        assert_eq!(
            directives("debug"),
            "coursework=debug,grading=debug,workflow=debug,store=debug"
        );
        assert_eq!(directives("grading=trace"), "grading=trace");
    }
}
