//! Structured diagnostics shared by the lexer, parser, and static analyzer.
//!
//! Diagnostics are plain data: the core never colorizes or formats them for a
//! terminal, it only produces [`Diagnostic`] records for a host driver to
//! render however it likes.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    Lex,
    Syntax,
    Semantic,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        path: impl Into<PathBuf>,
        line: usize,
        column: usize,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            kind,
            message: message.into(),
        }
    }
}
