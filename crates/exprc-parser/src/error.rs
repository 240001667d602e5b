//! Parse-time and type-resolution errors.

use exprc_ir::{LineIndex, Span};
use thiserror::Error;

/// A lexical or syntactic failure, carrying the offending source snippet
/// and its 1-based line/column.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("parse error at {line}:{column}: {message} (near `{snippet}`)")]
pub struct ParseError {
    /// The source snippet the error was raised on.
    pub snippet: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Human-readable message.
    pub message: String,
}

impl ParseError {
    /// Build a `ParseError` from a span, resolving its line/column via a
    /// [`LineIndex`] built once per source string.
    pub fn at(source: &str, index: &LineIndex, span: Span, message: impl Into<String>) -> Self {
        let (line, column) = index.line_column(span.start);
        let start = span.start as usize;
        let end = (span.end as usize).min(source.len()).max(start);
        Self {
            snippet: source[start..end].to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// A type name in a cast, `new`, or declaration could not be resolved
/// against the import set plus well-known prefixes.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot resolve type `{name}`")]
pub struct TypeResolutionError {
    /// The unresolved simple or qualified type name.
    pub name: String,
}
