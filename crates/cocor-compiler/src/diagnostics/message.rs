//! Diagnostic message types.

use std::fmt;

/// How bad a diagnostic is.
///
/// Errors block analysis and emission; warnings never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub enum Severity {
    Error,
    Warning,
}

/// A single collected message.
///
/// Grammar-level findings (a deletable non-terminal, an LL(1) conflict)
/// have no useful source location; `line`/`span` are optional for them.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 1-based source line, when the message points at a token.
    pub line: Option<u32>,
    /// 1-based source column.
    pub col: Option<u32>,
    /// Byte range in the source, for annotated rendering.
    pub span: Option<(usize, usize)>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: None,
            col: None,
            span: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.col) {
            (Some(line), Some(col)) => {
                write!(f, "-- line {} col {}: {}", line, col, self.message)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}
