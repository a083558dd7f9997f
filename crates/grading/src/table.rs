//! Pipe-delimited Markdown tables for grade reports.
//!
//! Output follows the org-table layout existing report consumers expect:
//!
//! ```text
//! | Exercise Name   |   Points Earned |   Out Of |
//! |-----------------|-----------------|----------|
//! | Exercise 1      |               8 |       10 |
//! ```
//!
//! Numbers render in `%g` style and right-align; text left-aligns. Every
//! column is at least two characters wider than its header.

const MIN_PADDING: usize = 2;
const SIGNIFICANT_DIGITS: i32 = 6;

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Left-aligned text.
    Text(String),
    /// A number, rendered in `%g` style.
    Number(f64),
}

impl Cell {
    /// An empty text cell.
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(value) => format_general(*value),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A table under construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkdownTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MarkdownTable {
    /// Creates a table with the given column headers.
    pub fn new<H: Into<String>>(headers: impl IntoIterator<Item = H>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Short rows are padded with blank cells; extra cells
    /// beyond the header count are dropped.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        let mut row = row;
        row.resize(self.headers.len(), Cell::empty());
        self.rows.push(row);
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table without a trailing newline.
    pub fn render(&self) -> String {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::render).collect())
            .collect();

        let columns: Vec<(usize, bool)> = (0..self.headers.len())
            .map(|col| {
                let numeric = self
                    .rows
                    .iter()
                    .map(|row| &row[col])
                    .filter(|cell| !cell.is_blank())
                    .all(|cell| matches!(cell, Cell::Number(_)))
                    && self.rows.iter().any(|row| matches!(row[col], Cell::Number(_)));
                let width = rendered
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(self.headers[col].chars().count() + MIN_PADDING))
                    .max()
                    .unwrap_or(0);
                (width, numeric)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            let inner: Vec<String> = cells
                .iter()
                .zip(&columns)
                .map(|(cell, &(width, numeric))| {
                    if numeric {
                        format!(" {cell:>width$} ")
                    } else {
                        format!(" {cell:<width$} ")
                    }
                })
                .collect();
            format!("|{}|", inner.join("|"))
        };

        let separator: Vec<String> = columns.iter().map(|(width, _)| "-".repeat(width + 2)).collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(line(&self.headers));
        lines.push(format!("|{}|", separator.join("|")));
        lines.extend(rendered.iter().map(|row| line(row)));
        lines.join("\n")
    }
}

/// Formats a number like C's `%g`: six significant digits, no trailing
/// zeros, no decimal point for whole numbers.
pub fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if !(-5..SIGNIFICANT_DIGITS).contains(&exponent) {
        let mantissa = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
        return match mantissa.split_once('e') {
            Some((digits, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", trim_zeros(digits), sign, exp.abs())
            }
            None => mantissa,
        };
    }
    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
    trim_zeros(&format!("{value:.decimals$}")).to_string()
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(2.0), "2");
        assert_eq!(format_general(1.8), "1.8");
        assert_eq!(format_general(0.6 * 3.0), "1.8");
        assert_eq!(format_general(80.0), "80");
        assert_eq!(format_general(83.333333333), "83.3333");
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(-2.5), "-2.5");
        assert_eq!(format_general(1234567.0), "1.23457e+06");
    }

    #[test]
    fn test_render_aligns_columns() {
        let mut table = MarkdownTable::new(["Exercise Name", "Points Earned", "Out Of"]);
        table.push_row(vec!["Exercise 1".into(), 8.0.into(), 10.0.into()]);
        table.push_row(vec!["**Total**".into(), 8.0.into(), 10.0.into()]);
        let expected = "\
| Exercise Name   |   Points Earned |   Out Of |
|-----------------|-----------------|----------|
| Exercise 1      |               8 |       10 |
| **Total**       |               8 |       10 |";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn test_blank_cells_do_not_make_column_textual() {
        let mut table = MarkdownTable::new(["Rubric", "Out Of"]);
        table.push_row(vec!["a".into(), 2.0.into()]);
        table.push_row(vec!["b".into(), Cell::empty()]);
        let rendered = table.render();
        assert!(rendered.contains("| a        |        2 |"));
        assert!(rendered.contains("| b        |          |"));
    }

    #[test]
    fn test_short_rows_padded() {
        let mut table = MarkdownTable::new(["A", "B", "C"]);
        table.push_row(vec!["x".into()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.render().lines().last(), Some("| x   |     |     |"));
    }
}
