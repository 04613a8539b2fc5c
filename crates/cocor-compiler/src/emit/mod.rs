//! Emitter interface.
//!
//! The core never prints target-language text itself; back-ends implement
//! the two traits below and drive a `Generator` to splice their output into
//! frame files. A frame file is plain text with `-->marker` sentinels: the
//! generator copies bytes up to the next sentinel, the back-end
//! interpolates, and copying resumes.


use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::dfa::Dfa;
use crate::tab::Tab;
use crate::{Error, Result};

/// Prints the parser for the analysed grammar.
pub trait ParserEmitter {
    fn write_parser(&mut self, tab: &Tab) -> Result<()>;
}

/// Prints the scanner for the finished token automaton.
pub trait ScannerEmitter {
    fn write_scanner(&mut self, tab: &Tab, dfa: &Dfa) -> Result<()>;
}

/// Frame-file plumbing shared by all back-ends.
pub struct Generator {
    frame_dir: Option<PathBuf>,
    src_dir: PathBuf,
    out_dir: PathBuf,
    frame_file: Option<PathBuf>,
    fram: Option<BufReader<File>>,
    output: Option<BufWriter<File>>,
}

impl Generator {
    pub fn new(tab: &Tab) -> Self {
        Self {
            frame_dir: tab.frame_dir.clone(),
            src_dir: tab.src_dir.clone(),
            out_dir: tab.out_dir.clone(),
            frame_file: None,
            fram: None,
            output: None,
        }
    }

    /// Opens a frame file, looking in the frames directory first and the
    /// grammar's directory second.
    pub fn open_frame(&mut self, fname: &str) -> Result<()> {
        let mut path = match &self.frame_dir {
            Some(dir) => dir.join(fname),
            None => self.src_dir.join(fname),
        };
        if !path.is_file() {
            path = self.src_dir.join(fname);
        }
        if !path.is_file() {
            return Err(Error::FrameFileMissing(path));
        }
        let file = File::open(&path).map_err(|source| Error::OpenFile {
            path: path.clone(),
            source,
        })?;
        self.fram = Some(BufReader::new(file));
        self.frame_file = Some(path);
        Ok(())
    }

    /// Opens an output file, pushing any existing one aside as `.old`.
    pub fn open_gen(&mut self, target: &str) -> Result<()> {
        let path = self.out_dir.join(target);
        if path.exists() {
            let old = path.with_extension(old_extension(&path));
            if old.exists() {
                fs::remove_file(&old).map_err(|source| Error::CannotGenerate {
                    path: old.clone(),
                    source,
                })?;
            }
            fs::rename(&path, &old).map_err(|source| Error::CannotGenerate {
                path: path.clone(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| Error::CannotGenerate {
            path: path.clone(),
            source,
        })?;
        self.output = Some(BufWriter::new(file));
        Ok(())
    }

    /// Emits generated text between two frame parts.
    pub fn write(&mut self, s: &str) -> Result<()> {
        self.gen_bytes(s.as_bytes())
    }

    /// Copies frame text up to (and consuming) the `stop` marker.
    pub fn copy_frame_part(&mut self, stop: &str) -> Result<()> {
        self.copy_part(Some(stop.as_bytes()), true)
    }

    /// Copies the remainder of the frame file.
    pub fn copy_frame_tail(&mut self) -> Result<()> {
        self.copy_part(None, true)
    }

    /// Discards frame text up to the `stop` marker.
    pub fn skip_frame_part(&mut self, stop: &str) -> Result<()> {
        self.copy_part(Some(stop.as_bytes()), false)
    }

    /// Prepends `copyright.frame`, when one is present.
    pub fn gen_copyright(&mut self) -> Result<()> {
        let mut path = match &self.frame_dir {
            Some(dir) => dir.join("copyright.frame"),
            None => self.src_dir.join("copyright.frame"),
        };
        if !path.is_file() {
            path = self.src_dir.join("copyright.frame");
        }
        if !path.is_file() {
            return Ok(());
        }
        let file = File::open(&path).map_err(|source| Error::OpenFile {
            path: path.clone(),
            source,
        })?;
        let saved = self.fram.replace(BufReader::new(file));
        let result = self.copy_part(None, true);
        self.fram = saved;
        result
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(output) = &mut self.output {
            output.flush()?;
        }
        self.output = None;
        self.fram = None;
        Ok(())
    }

    fn fram_read(&mut self) -> Result<Option<u8>> {
        let Some(fram) = &mut self.fram else {
            return Ok(None);
        };
        let mut byte = [0u8; 1];
        match fram.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn gen_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(output) = &mut self.output {
            output.write_all(bytes)?;
        }
        Ok(())
    }

    fn copy_part(&mut self, stop: Option<&[u8]>, generate: bool) -> Result<()> {
        let mut ch = self.fram_read()?;
        'outer: while let Some(b) = ch {
            if let Some(stop) = stop {
                if b == stop[0] {
                    let mut i = 0;
                    let mut cur = b;
                    loop {
                        if cur != stop[i] {
                            // Partial match: flush the matched prefix and
                            // reconsider the mismatching byte.
                            if generate {
                                self.gen_bytes(&stop[..i])?;
                            }
                            ch = Some(cur);
                            continue 'outer;
                        }
                        if i == stop.len() - 1 {
                            return Ok(());
                        }
                        i += 1;
                        match self.fram_read()? {
                            Some(nb) => cur = nb,
                            None => {
                                if generate {
                                    self.gen_bytes(&stop[..i])?;
                                }
                                ch = None;
                                continue 'outer;
                            }
                        }
                    }
                }
            }
            if generate {
                self.gen_bytes(&[b])?;
            }
            ch = self.fram_read()?;
        }
        if stop.is_some() {
            return Err(Error::FrameFileCorrupt(
                self.frame_file.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

fn old_extension(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!("{}.old", ext.to_string_lossy()),
        None => "old".to_string(),
    }
}
