//! Tokenizer and parser failures, and their conversion into diagnostics.
//!
//! Failures are reported the way a generated recognizer reports them: a
//! 1-based line, a 0-based column and the offending token when there is one.

use crate::diagnostic::{Category, Diagnostic};
use crate::span::{Location, Position, Range, utf16_len};

const SYNTAX_ERROR: &str = "Syntax error";

/// Failure raised while splitting a line into inline tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column in UTF-16 code units (0-indexed)
    pub column: u32,
    /// Text of the offending token, if any
    pub token: Option<String>,
    pub message: String,
}

/// Failure raised while assembling blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column in UTF-16 code units (0-indexed)
    pub column: u32,
    /// Text of the offending token, if any
    pub token: Option<String>,
    pub message: String,
}

/// Either kind of syntax failure, in the order the reader met them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxFailure {
    Lexical(LexicalError),
    Parse(ParseError),
}

impl SyntaxFailure {
    pub fn message(&self) -> &str {
        match self {
            SyntaxFailure::Lexical(e) => &e.message,
            SyntaxFailure::Parse(e) => &e.message,
        }
    }

    /// Convert to a diagnostic; see [`lexical_diagnostic`] for `related_uri`.
    pub fn to_diagnostic(&self, related_uri: Option<&str>) -> Diagnostic {
        match self {
            SyntaxFailure::Lexical(e) => lexical_diagnostic(e, related_uri),
            SyntaxFailure::Parse(e) => parse_diagnostic(e, related_uri),
        }
    }
}

/// Convert a lexical failure into a diagnostic.
///
/// `related_uri` is the document uri when the client can display related
/// information; the failure's own message is then attached there.
pub fn lexical_diagnostic(error: &LexicalError, related_uri: Option<&str>) -> Diagnostic {
    syntax_diagnostic(
        error.line,
        error.column,
        error.token.as_deref(),
        &error.message,
        related_uri,
    )
}

/// Convert a parser failure into a diagnostic.
pub fn parse_diagnostic(error: &ParseError, related_uri: Option<&str>) -> Diagnostic {
    syntax_diagnostic(
        error.line,
        error.column,
        error.token.as_deref(),
        &error.message,
        related_uri,
    )
}

fn syntax_diagnostic(
    line: u32,
    column: u32,
    token: Option<&str>,
    message: &str,
    related_uri: Option<&str>,
) -> Diagnostic {
    let line = line.saturating_sub(1);
    let end = column + token.map(utf16_len).unwrap_or(0);
    let range = Range::new(Position::new(line, column), Position::new(line, end));
    let diagnostic = Diagnostic::new(Category::SyntaxError, SYNTAX_ERROR, range);
    match related_uri {
        Some(uri) => diagnostic.with_related(message, Some(Location::new(uri, range))),
        None => diagnostic,
    }
}
