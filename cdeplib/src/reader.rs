//! Buffered, restartable line reader.
//!
//! [`LineReader`] reads a source in fixed-size chunks and hands out one line
//! at a time as a byte slice borrowed from its internal buffer. Source files
//! are scanned as raw bytes: nothing here assumes UTF-8.
//!
//! When a line runs past the valid data, the unread tail is moved to the
//! start of the buffer and the rest of the buffer is refilled from the
//! source. A line longer than the whole buffer is returned in
//! buffer-sized pieces rather than failing.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::CdepError;
use crate::Result;

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 16000;

/// Whitespace as the scanners see it: every control byte and the space.
///
/// This includes `\n`, so a stripping reader also skips blank lines.
#[inline]
pub(crate) fn is_white(byte: u8) -> bool {
    byte.wrapping_sub(1) < 32
}

/// Reads lines from a file or an in-memory buffer.
pub struct LineReader<R> {
    buf: Vec<u8>,
    /// Next unconsumed byte
    cursor: usize,
    /// End of valid data
    end: usize,
    /// `None` once the source reported end of stream
    source: Option<R>,
    strip: bool,
    origin: Option<PathBuf>,
}

impl LineReader<File> {
    /// Open a file for line reading.
    ///
    /// With `strip` set, leading whitespace (and therefore blank lines) is
    /// skipped before each line is returned.
    pub fn open(path: impl AsRef<Path>, strip: bool) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = Self::new(file, strip);
        reader.origin = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl LineReader<io::Empty> {
    /// Create a reader over an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let buf = data.into();
        let end = buf.len();
        Self {
            buf,
            cursor: 0,
            end,
            source: None,
            strip: false,
            origin: None,
        }
    }
}

impl<R: Read> LineReader<R> {
    /// Create a reader over any byte source with the default capacity.
    pub fn new(source: R, strip: bool) -> Self {
        Self::with_capacity(source, strip, DEFAULT_CAPACITY)
    }

    /// Create a reader with an explicit buffer capacity.
    pub fn with_capacity(source: R, strip: bool, capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            cursor: 0,
            end: 0,
            source: Some(source),
            strip,
            origin: None,
        }
    }

    /// Builder: enable or disable leading-whitespace stripping.
    pub fn stripping(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// The file this reader was opened on, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Whether the underlying source may still produce data.
    ///
    /// The source is dropped as soon as a zero-byte read is observed, which
    /// can happen while lines are still buffered.
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Release the underlying source. Lines already buffered can still be
    /// read.
    pub fn close(&mut self) {
        self.source = None;
    }

    /// Return the next line without its terminator, or `None` at the end.
    ///
    /// Both `\n` and `\r\n` terminators are removed. A non-empty fragment
    /// after the last terminator is returned as a final line.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        loop {
            if self.strip {
                while self.cursor < self.end && is_white(self.buf[self.cursor]) {
                    self.cursor += 1;
                }
            }
            let start = self.cursor;

            if let Some(offset) = self.buf[start..self.end].iter().position(|&b| b == b'\n') {
                let newline = start + offset;
                let mut stop = newline;
                if stop > start && self.buf[stop - 1] == b'\r' {
                    stop -= 1;
                }
                self.cursor = newline + 1;
                return Ok(Some(&self.buf[start..stop]));
            }

            if self.fill()? {
                continue;
            }

            if start == self.end {
                return Ok(None);
            }
            self.cursor = self.end;
            return Ok(Some(&self.buf[start..self.end]));
        }
    }

    /// Shift unread bytes to the front and refill the tail.
    ///
    /// Returns `false` without touching the buffer when there is nothing
    /// more to read or no room to read into.
    fn fill(&mut self) -> Result<bool> {
        if self.source.is_none() || (self.cursor == 0 && self.end == self.buf.len()) {
            return Ok(false);
        }

        self.buf.copy_within(self.cursor..self.end, 0);
        self.end -= self.cursor;
        self.cursor = 0;

        let mut exhausted = false;
        if let Some(source) = self.source.as_mut() {
            while self.end < self.buf.len() {
                match source.read(&mut self.buf[self.end..]) {
                    Ok(0) => {
                        exhausted = true;
                        break;
                    }
                    Ok(n) => self.end += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        return Err(CdepError::FileRead {
                            path: self.origin.clone().unwrap_or_else(|| "<stream>".into()),
                            source: e,
                        })
                    }
                }
            }
        }

        if exhausted {
            self.source = None;
        }
        Ok(true)
    }
}
