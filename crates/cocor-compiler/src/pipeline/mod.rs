//! High-level compilation facade.
//!
//! Builds the scanner, runs the meta-parser, and gates analysis and
//! emission on the accumulated error count, the way the command-line tool
//! sequences a run.

#[cfg(test)]
mod pipeline_tests;

use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostics;
use crate::dfa::Dfa;
use crate::emit::{ParserEmitter, ScannerEmitter};
use crate::parser::Parser;
use crate::scan::Scanner;
use crate::tab::Tab;
use crate::trace::Trace;
use crate::Result;

/// Builder for one compilation run.
pub struct Compiler {
    src_file: PathBuf,
    source: Option<Vec<u8>>,
    frames_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    ns_name: Option<String>,
    trace_switches: Option<String>,
    verbose: bool,
    parser_emitter: Option<Box<dyn ParserEmitter>>,
    scanner_emitter: Option<Box<dyn ScannerEmitter>>,
}

/// Everything a run produced: the analysed grammar store, the token
/// automaton, and the collected diagnostics.
pub struct Compilation {
    pub tab: Tab,
    pub dfa: Dfa,
    pub diagnostics: Diagnostics,
    pub grammar_ok: bool,
    pub trace_path: Option<PathBuf>,
}

impl Compilation {
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    /// True when the grammar parsed cleanly and passed every check.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.error_count() == 0 && self.grammar_ok
    }
}

impl Compiler {
    pub fn new(src_file: impl Into<PathBuf>) -> Self {
        Self {
            src_file: src_file.into(),
            source: None,
            frames_dir: None,
            out_dir: None,
            ns_name: None,
            trace_switches: None,
            verbose: false,
            parser_emitter: None,
            scanner_emitter: None,
        }
    }

    /// Compiles from an in-memory grammar text; `name` is used in
    /// diagnostics and for the default output directory.
    pub fn from_source(name: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let mut c = Self::new(name);
        c.source = Some(source.into().into_bytes());
        c
    }

    pub fn frames_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = Some(dir.into());
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.ns_name = Some(ns.into());
        self
    }

    /// Trace switches, the digit or letter form (`"0126"`, `"AGS"`).
    pub fn trace_switches(mut self, switches: impl Into<String>) -> Self {
        self.trace_switches = Some(switches.into());
        self
    }

    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    pub fn parser_emitter(mut self, emitter: Box<dyn ParserEmitter>) -> Self {
        self.parser_emitter = Some(emitter);
        self
    }

    pub fn scanner_emitter(mut self, emitter: Box<dyn ScannerEmitter>) -> Self {
        self.scanner_emitter = Some(emitter);
        self
    }

    /// Runs the pipeline. `Err` means a fatal condition; grammar problems
    /// are reported through the returned diagnostics instead.
    pub fn run(mut self) -> Result<Compilation> {
        let src_dir = self
            .src_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let out_dir = self.out_dir.clone().unwrap_or_else(|| src_dir.clone());

        let scanner = match self.source.take() {
            Some(bytes) => Scanner::from_bytes(bytes)?,
            None => Scanner::from_file(&self.src_file)?,
        };

        let mut tab = Tab::new();
        tab.src_name = self.src_file.clone();
        tab.src_dir = src_dir;
        tab.ns_name = self.ns_name.clone();
        tab.frame_dir = self.frames_dir.clone();
        tab.out_dir = out_dir.clone();
        if let Some(switches) = &self.trace_switches {
            tab.set_ddt(switches);
        }

        let trace = Trace::new(&out_dir);
        let mut parser = Parser::new(scanner, tab, trace);
        parser.verbose = self.verbose;
        parser.parse()?;

        let Parser {
            tab: mut out_tab,
            dfa: mut out_dfa,
            errors: mut diagnostics,
            trace: mut out_trace,
            gen_scanner,
            grammar_checked,
            ..
        } = parser;
        let grammar_ok = grammar_checked.unwrap_or(false);

        if diagnostics.error_count() == 0 && grammar_ok {
            // Literals referenced by the productions may have dirtied the
            // automaton after the PRODUCTIONS determinisation.
            if gen_scanner && out_dfa.dirty {
                out_dfa.make_deterministic(&mut out_tab, &mut diagnostics)?;
            }

            if let Some(mut emitter) = self.parser_emitter.take() {
                if self.verbose {
                    print!("parser");
                }
                emitter.write_parser(&out_tab)?;
                if gen_scanner {
                    if let Some(mut emitter) = self.scanner_emitter.take() {
                        if self.verbose {
                            print!(" + scanner");
                        }
                        emitter.write_scanner(&out_tab, &out_dfa)?;
                    }
                }
                if self.verbose {
                    println!(" generated");
                }
            }

            if gen_scanner && out_tab.ddt[0] {
                out_dfa.print_states(&out_tab, &mut out_trace);
            }
            if out_tab.ddt[8] {
                write_statistics(&out_tab, out_dfa.states.len(), &mut out_trace);
            }
        }

        let trace_path = out_trace.close()?;
        Ok(Compilation {
            tab: out_tab,
            dfa: out_dfa,
            diagnostics,
            grammar_ok,
            trace_path,
        })
    }
}

fn write_statistics(tab: &Tab, states: usize, trace: &mut Trace) {
    trace.newline();
    trace.write_line("Statistics:");
    trace.write_line(&format!("  {} terminals", tab.terminals.len()));
    trace.write_line(&format!(
        "  {} symbols",
        tab.terminals.len() + tab.pragmas.len() + tab.nonterminals.len()
    ));
    trace.write_line(&format!("  {} nodes", tab.nodes.len()));
    trace.write_line(&format!("  {} states", states));
}
