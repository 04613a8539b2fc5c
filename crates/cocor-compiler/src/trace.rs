//! The `trace.txt` writer.
//!
//! Dumps accumulate in memory; the file is only written on `close` and only
//! when something was traced, so an untraced run leaves no file behind.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[derive(Debug)]
pub struct Trace {
    dir: PathBuf,
    buf: String,
}

impl Trace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            buf: String::new(),
        }
    }

    /// Pads `s` to at least `|w|` characters: left-adjusted when `w < 0`,
    /// right-adjusted otherwise.
    pub fn format_string(s: &str, w: i32) -> String {
        let width = w.unsigned_abs() as usize;
        if s.len() >= width {
            return s.to_string();
        }
        let pad = " ".repeat(width - s.len());
        if w < 0 {
            format!("{s}{pad}")
        } else {
            format!("{pad}{s}")
        }
    }

    pub fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn write_w(&mut self, s: &str, w: i32) {
        self.buf.push_str(&Self::format_string(s, w));
    }

    pub fn write_line(&mut self, s: &str) {
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated text, for tests and in-memory inspection.
    pub fn contents(&self) -> &str {
        &self.buf
    }

    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join("trace.txt")
    }

    /// Writes the accumulated trace to `<dir>/trace.txt`.
    /// Returns the path when a file was produced.
    pub fn close(self) -> Result<Option<PathBuf>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let path = Self::file_path(&self.dir);
        fs::write(&path, self.buf).map_err(|source| Error::CannotGenerate {
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }
}
