//! Human-readable reports for errors and warnings
//!
//! Locations are byte offsets into the original source text; when the text is
//! available the report shows the offending line with a caret underline.

use serde::Serialize;
use std::fmt;

use crate::ast::SourceLocation;
use crate::error::CompilerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
    pub src: Option<SourceLocation>,
}

impl Warning {
    pub fn new(message: impl Into<String>, src: Option<SourceLocation>) -> Self {
        Self { message: message.into(), src }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.src {
            Some(src) => write!(f, "warning: {} at {}", self.message, src),
            None => write!(f, "warning: {}", self.message),
        }
    }
}

/// 1-based line and column of a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    (line, offset - line_start + 1)
}

fn snippet(source: &str, src: SourceLocation) -> Option<String> {
    if src.start > source.len() {
        return None;
    }
    let (line, column) = line_col(source, src.start);
    let text = source.lines().nth(line - 1).unwrap_or("");
    let width = src.length.clamp(1, text.len().saturating_sub(column - 1).max(1));
    let gutter = line.to_string().len();
    Some(format!(
        "{:>gutter$} --> line {}, column {}\n{:>gutter$} |\n{} | {}\n{:>gutter$} | {}{}",
        "",
        line,
        column,
        "",
        line,
        text,
        "",
        " ".repeat(column - 1),
        "^".repeat(width),
        gutter = gutter
    ))
}

/// Renders an error; every site it refers to gets its own snippet
pub fn render(source: Option<&str>, error: &CompilerError) -> String {
    let mut report = format!("error: {}", error);
    if let Some(source) = source {
        for site in error.sites() {
            if let Some(snippet) = snippet(source, site) {
                report.push('\n');
                report.push_str(&snippet);
            }
        }
    }
    report
}

pub fn render_warning(source: Option<&str>, warning: &Warning) -> String {
    let mut report = warning.to_string();
    if let (Some(source), Some(src)) = (source, warning.src) {
        if let Some(snippet) = snippet(source, src) {
            report.push('\n');
            report.push_str(&snippet);
        }
    }
    report
}
