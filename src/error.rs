//! Error types for mdstyle

use std::ops::Range;

use thiserror::Error;

/// Result type alias for mdstyle operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while configuring rules or applying them to a buffer
///
/// Apart from [`ParseError::Bounds`], none of these abort a parse: the
/// engine records them as diagnostics and keeps going.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("rule `{rule}` has a malformed pattern: {message}")]
    Configuration { rule: String, message: String },

    #[error("range {range:?} is outside the buffer (length {len}) or splits a character")]
    Bounds { range: Range<usize>, len: usize },

    #[error("invalid escape token `{0}`")]
    InvalidEscapeToken(String),

    #[error("cannot resolve link target `{0}`")]
    UnresolvableLink(String),

    #[error("cannot load image `{0}`")]
    UnresolvableImage(String),

    #[error("rule `{rule}` gave up after {iterations} iterations")]
    RuleDidNotTerminate { rule: String, iterations: usize },

    #[error("pattern `{pattern}` exceeded its backtracking budget")]
    BacktrackLimit { pattern: String },

    #[error("match has no capture group {0}")]
    MissingGroup(usize),

    #[error("theme error: {0}")]
    Theme(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Bounds violations point at a broken action rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::Bounds { .. })
    }
}
