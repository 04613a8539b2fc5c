//! cocor compiler core: grammar parser, analyzer, and scanner builder.
//!
//! The pipeline for one attributed grammar:
//! - `scan` - buffer, UTF-8 overlay, and the meta-grammar scanner
//! - `tab` - the grammar store (symbols, syntax graph, character classes)
//! - `parser` - recursive descent over the grammar description
//! - `dfa` - token automaton construction and determinisation
//! - `analyze` - symbol set fixed points and grammar checks
//! - `emit` - frame-file machinery and emitter contracts
//! - `diagnostics` - collected errors and warnings
//!
//! # Example
//!
//! ```
//! use cocor_compiler::Compiler;
//!
//! let source = r#"
//!     COMPILER G
//!     CHARACTERS
//!       letter = 'a'..'z'.
//!     TOKENS
//!       ident = letter {letter}.
//!     PRODUCTIONS
//!       G = ident.
//!     END G.
//! "#;
//! let out = Compiler::from_source("g.atg", source).run().expect("no fatal error");
//! assert!(out.is_valid());
//! ```

use std::path::PathBuf;

pub mod analyze;
pub mod dfa;
pub mod diagnostics;
pub mod emit;
pub mod parser;
pub mod pipeline;
pub mod scan;
pub mod tab;
pub mod trace;

pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity};
pub use pipeline::{Compilation, Compiler};

/// Unrecoverable failures; everything else is collected in `Diagnostics`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not open file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("buffer out of bounds access, position: {0}")]
    BufferOutOfBounds(usize),

    #[error("illegal byte order mark at start of file")]
    IllegalByteOrderMark,

    #[error("cannot find frame file {0}")]
    FrameFileMissing(PathBuf),

    #[error("incomplete or corrupt frame file: {0}")]
    FrameFileCorrupt(PathBuf),

    #[error("cannot generate file {path}")]
    CannotGenerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated.
    #[error("{0}")]
    Internal(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
