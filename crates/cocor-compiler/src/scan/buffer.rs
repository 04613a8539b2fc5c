//! Byte window over the grammar source.
//!
//! Three cases are supported: a seekable file that fits in the window, a
//! seekable file paged through the window, and a non-seekable stream whose
//! window grows by doubling. A UTF-8 decoding overlay can be layered on top
//! once a byte-order mark has been seen.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use cocor_core::COCO_WCHAR_MAX;

use crate::{Error, Result};

/// Sentinel returned past the end of input; one above any BMP code point.
pub const EOF: u32 = COCO_WCHAR_MAX + 1;

const MIN_BUFFER_LENGTH: usize = 1024; // 1 KB
const MAX_BUFFER_LENGTH: usize = MIN_BUFFER_LENGTH * 64; // 64 KB

pub struct Buffer {
    buf: Vec<u8>,
    /// Stream offset of `buf[0]`.
    buf_start: usize,
    /// Valid bytes in `buf`.
    buf_len: usize,
    /// Known length of the input; grows while a stream is drained.
    file_len: usize,
    /// Read position within `buf`.
    buf_pos: usize,
    file: Option<File>,
    stream: Option<Box<dyn Read>>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl Buffer {
    /// Window over a file. The file handle is dropped once the whole file
    /// fits in the window.
    pub fn from_file(path: &Path) -> Result<Self> {
        let open = || -> std::io::Result<(File, usize)> {
            let file = File::open(path)?;
            let file_len = file.metadata()?.len() as usize;
            Ok((file, file_len))
        };
        let (file, file_len) = open().map_err(|source| Error::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        let buf_len = file_len.min(MAX_BUFFER_LENGTH);
        let mut buffer = Self {
            buf: vec![0; buf_len],
            buf_start: 0,
            buf_len: 0,
            file_len,
            buf_pos: 0,
            file: Some(file),
            stream: None,
        };
        if file_len > 0 {
            buffer.fill_window(0)?;
        }
        if buffer.buf_len == file_len {
            buffer.file = None;
        }
        Ok(buffer)
    }

    /// Fully-buffered input, used for in-memory sources.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            buf: data,
            buf_start: 0,
            buf_len: len,
            file_len: len,
            buf_pos: 0,
            file: None,
            stream: None,
        }
    }

    /// Growing window over a non-seekable stream (console, network).
    pub fn from_stream(stream: Box<dyn Read>) -> Self {
        Self {
            buf: vec![0; MIN_BUFFER_LENGTH],
            buf_start: 0,
            buf_len: 0,
            file_len: 0,
            buf_pos: 0,
            file: None,
            stream: Some(stream),
        }
    }

    /// Next byte, or `EOF`.
    pub fn read_byte(&mut self) -> Result<u32> {
        if self.buf_pos < self.buf_len {
            // fall through
        } else if self.pos() < self.file_len {
            self.set_pos(self.pos())?;
        } else if !(self.stream.is_some() && self.read_next_stream_chunk()? > 0) {
            return Ok(EOF);
        }
        let b = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Ok(b as u32)
    }

    /// Absolute position of the next byte to read.
    pub fn pos(&self) -> usize {
        self.buf_start + self.buf_pos
    }

    /// Repositions, paging the window when the target is outside it.
    pub fn set_pos(&mut self, value: usize) -> Result<()> {
        if self.stream.is_some() && value >= self.file_len {
            // The stream cannot seek; drain it until the wanted position is
            // in sight.
            while value >= self.file_len && self.read_next_stream_chunk()? > 0 {}
        }
        if value > self.file_len {
            return Err(Error::BufferOutOfBounds(value));
        }

        if value >= self.buf_start && value < self.buf_start + self.buf_len {
            self.buf_pos = value - self.buf_start;
        } else if self.file.is_some() {
            self.fill_window(value)?;
        } else {
            self.buf_pos = self.file_len - self.buf_start;
        }
        Ok(())
    }

    /// Re-reads the source bytes in `beg..end`, preserving the position.
    pub fn get_string(&mut self, beg: usize, end: usize) -> Result<String> {
        let old = self.pos();
        self.set_pos(beg)?;
        let mut bytes = Vec::with_capacity(end.saturating_sub(beg));
        while self.pos() < end {
            let b = self.read_byte()?;
            if b == EOF {
                break;
            }
            bytes.push(b as u8);
        }
        self.set_pos(old)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn fill_window(&mut self, value: usize) -> Result<()> {
        let Some(file) = &mut self.file else {
            return Err(Error::BufferOutOfBounds(value));
        };
        file.seek(SeekFrom::Start(value as u64))?;
        let mut read = 0;
        while read < self.buf.len() {
            let n = file.read(&mut self.buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        self.buf_len = read;
        self.buf_start = value;
        self.buf_pos = 0;
        Ok(())
    }

    fn read_next_stream_chunk(&mut self) -> Result<usize> {
        if self.buf.len() == self.buf_len {
            // Cannot seek and cannot foresee the final length; double the
            // window on demand.
            self.buf.resize(self.buf_len * 2, 0);
        }
        let Some(stream) = &mut self.stream else {
            return Ok(0);
        };
        let n = stream.read(&mut self.buf[self.buf_len..])?;
        if n > 0 {
            self.buf_len += n;
            self.file_len = self.buf_len;
        }
        Ok(n)
    }
}

/// The capability the scanner reads through: positioned code units with
/// read-then-restore peeking. Provided by the raw byte buffer and by the
/// UTF-8 decoding overlay.
pub trait CodeUnits {
    fn base(&self) -> &Buffer;
    fn base_mut(&mut self) -> &mut Buffer;

    /// Next code unit, or `EOF`.
    fn read(&mut self) -> Result<u32>;

    fn pos(&self) -> usize {
        self.base().pos()
    }

    fn set_pos(&mut self, value: usize) -> Result<()> {
        self.base_mut().set_pos(value)
    }

    fn peek(&mut self) -> Result<u32> {
        let old = self.pos();
        let ch = self.read()?;
        self.set_pos(old)?;
        Ok(ch)
    }

    fn get_string(&mut self, beg: usize, end: usize) -> Result<String> {
        self.base_mut().get_string(beg, end)
    }
}

impl CodeUnits for Buffer {
    fn base(&self) -> &Buffer {
        self
    }

    fn base_mut(&mut self) -> &mut Buffer {
        self
    }

    fn read(&mut self) -> Result<u32> {
        self.read_byte()
    }
}

/// Decodes UTF-8 sequences from the underlying byte buffer.
pub struct Utf8Buffer {
    inner: Buffer,
}

impl Utf8Buffer {
    pub fn new(inner: Buffer) -> Self {
        Self { inner }
    }
}

impl CodeUnits for Utf8Buffer {
    fn base(&self) -> &Buffer {
        &self.inner
    }

    fn base_mut(&mut self) -> &mut Buffer {
        &mut self.inner
    }

    fn read(&mut self) -> Result<u32> {
        // Skip to a sequence start (0xxxxxxx or 11xxxxxx).
        let mut ch;
        loop {
            ch = self.inner.read_byte()?;
            if !(ch >= 128 && (ch & 0xC0) != 0xC0 && ch != EOF) {
                break;
            }
        }
        if ch < 128 || ch == EOF {
            // ASCII and end of input need no decoding.
        } else if ch & 0xF0 == 0xF0 {
            // 11110xxx 10xxxxxx 10xxxxxx 10xxxxxx
            let c1 = ch & 0x07;
            let c2 = self.inner.read_byte()? & 0x3F;
            let c3 = self.inner.read_byte()? & 0x3F;
            let c4 = self.inner.read_byte()? & 0x3F;
            ch = (((((c1 << 6) | c2) << 6) | c3) << 6) | c4;
        } else if ch & 0xE0 == 0xE0 {
            // 1110xxxx 10xxxxxx 10xxxxxx
            let c1 = ch & 0x0F;
            let c2 = self.inner.read_byte()? & 0x3F;
            let c3 = self.inner.read_byte()? & 0x3F;
            ch = (((c1 << 6) | c2) << 6) | c3;
        } else if ch & 0xC0 == 0xC0 {
            // 110xxxxx 10xxxxxx
            let c1 = ch & 0x1F;
            let c2 = self.inner.read_byte()? & 0x3F;
            ch = (c1 << 6) | c2;
        }
        Ok(ch)
    }
}

/// The scanner's input: raw bytes until a BOM proves the source is UTF-8.
pub enum Source {
    Bytes(Buffer),
    Utf8(Utf8Buffer),
}

impl Source {
    /// Swaps in the UTF-8 overlay; further reads decode multi-byte
    /// sequences.
    pub fn switch_to_utf8(&mut self) {
        if let Source::Bytes(b) = self {
            let inner = std::mem::take(b);
            *self = Source::Utf8(Utf8Buffer::new(inner));
        }
    }
}

impl CodeUnits for Source {
    fn base(&self) -> &Buffer {
        match self {
            Source::Bytes(b) => b,
            Source::Utf8(u) => u.base(),
        }
    }

    fn base_mut(&mut self) -> &mut Buffer {
        match self {
            Source::Bytes(b) => b,
            Source::Utf8(u) => u.base_mut(),
        }
    }

    fn read(&mut self) -> Result<u32> {
        match self {
            Source::Bytes(b) => b.read(),
            Source::Utf8(u) => u.read(),
        }
    }
}
