//! Compiler diagnostics infrastructure.
//!
//! All non-fatal findings are collected here and rendered after the run;
//! processing continues so that one invocation reports as much as possible.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{Diagnostic, Severity};
pub use printer::DiagnosticsPrinter;

/// Collection of diagnostic messages from parsing and analysis.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

/// Builder for one diagnostic message.
#[must_use = "diagnostic not recorded, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::new(Severity::Error, msg),
        }
    }

    pub fn warning(&mut self, msg: impl Into<String>) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::new(Severity::Warning, msg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    /// Attach a 1-based line/column pair.
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.message.line = Some(line);
        self.message.col = Some(col);
        self
    }

    /// Attach a byte range for annotated rendering.
    pub fn span(mut self, beg: usize, end: usize) -> Self {
        self.message.span = Some((beg, end));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
