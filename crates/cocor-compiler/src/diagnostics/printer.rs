//! Builder-pattern printer for rendering diagnostics.
//!
//! Without source text the classic one-line stream format is used
//! (`-- line L col C: message`). With source text, messages that carry a
//! byte span are rendered as annotated snippets.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use super::Diagnostics;
use super::message::Severity;

/// Builder for rendering diagnostics with various options.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    source: Option<&'s str>,
    path: Option<&'s str>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            path: None,
            colored: false,
        }
    }

    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let Some(source) = self.source else {
            return self.format_plain(w);
        };

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let mut first = true;
        for diag in self.diagnostics.iter() {
            if !first {
                w.write_char('\n')?;
            }
            first = false;

            let Some((beg, end)) = clamp_span(diag.span, source.len()) else {
                writeln!(w, "{}", diag)?;
                continue;
            };

            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(beg..end)
                    .label(&diag.message),
            );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }

            let level = match diag.severity {
                Severity::Error => Level::ERROR,
                Severity::Warning => Level::WARNING,
            };
            let report = [level.primary_title(&diag.message).element(snippet)];
            write!(w, "{}", renderer.render(&report))?;
            w.write_char('\n')?;
        }
        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for diag in self.diagnostics.iter() {
            writeln!(w, "{}", diag)?;
        }
        Ok(())
    }
}

fn clamp_span(span: Option<(usize, usize)>, limit: usize) -> Option<(usize, usize)> {
    let (beg, end) = span?;
    if beg > limit {
        return None;
    }
    if beg == end {
        return Some((beg, (beg + 1).min(limit)));
    }
    Some((beg, end.min(limit)))
}
