//! Section-header discovery for naming exercises.
//!
//! A rubric directive takes its exercise name from the nearest section header
//! above it. What counts as a header depends on the document format, so each
//! format supplies a [`HeaderLocator`].

use std::sync::LazyLock;

use regex::Regex;

/// Finds the section header governing a position in a document.
pub trait HeaderLocator: Send + Sync {
    /// Returns the cleaned title of the last header that starts before
    /// `offset`, or `None` if no header precedes it.
    fn find_preceding_header(&self, text: &str, offset: usize) -> Option<String>;
}

// Leading whitespace or quotes allow headers inside notebook JSON source lines.
static MARKDOWN_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t"]*(#+[ \t][^\n]*)"#).expect("valid regex"));

static LATEX_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:sub)*section\*?\s*\{([^}\n]*)\}").expect("valid regex")
});

/// `#`-prefixed Markdown (and R Markdown / notebook) headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownHeaders;

impl HeaderLocator for MarkdownHeaders {
    fn find_preceding_header(&self, text: &str, offset: usize) -> Option<String> {
        let head = text.get(..offset)?;
        MARKDOWN_HEADER
            .captures_iter(head)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| clean_title(m.as_str().trim().trim_start_matches('#')))
            .filter(|title| !title.is_empty())
    }
}

/// LaTeX `\section`, `\subsection` and `\subsubsection` headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexHeaders;

impl HeaderLocator for LatexHeaders {
    fn find_preceding_header(&self, text: &str, offset: usize) -> Option<String> {
        let head = text.get(..offset)?;
        LATEX_HEADER
            .captures_iter(head)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| clean_title(m.as_str()))
            .filter(|title| !title.is_empty())
    }
}

fn clean_title(raw: &str) -> String {
    raw.replace("\\n", "")
        .replace('"', "")
        .trim()
        .trim_end_matches(',')
        .trim()
        .to_string()
}

/// Source document format of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentKind {
    /// Markdown, R Markdown, or a Jupyter notebook.
    #[default]
    Markdown,
    /// LaTeX.
    Latex,
}

impl DocumentKind {
    /// Chooses the kind from a file name: `.tex` files are LaTeX, everything
    /// else is treated as Markdown.
    pub fn from_file_name(name: &str) -> Self {
        let is_tex = std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tex"));
        if is_tex {
            Self::Latex
        } else {
            Self::Markdown
        }
    }

    /// The header locator for this kind.
    pub fn header_locator(self) -> &'static dyn HeaderLocator {
        match self {
            Self::Markdown => &MarkdownHeaders,
            Self::Latex => &LatexHeaders,
        }
    }
}
