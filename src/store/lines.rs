//! Rewindable iteration over the physical lines of one decoded text blob.
//!
//! Header and body parsing are expressed purely in terms of [`LineSource`],
//! so single messages, MBOX archives and EMLX archives share one parser.

use std::path::Path;

use tracing::debug;

use crate::error::{IngestError, Result};

/// Random-access cursor over physical lines.
///
/// `read_line` returns the line at the cursor and advances; every other
/// operation only moves or inspects the cursor.
pub trait LineSource {
    /// Read the line at the cursor and advance. `None` once the input is exhausted.
    fn read_line(&mut self) -> Option<String>;

    /// Look `offset` lines past the cursor without moving (`0` = next line).
    fn peek_at(&self, offset: usize) -> Option<&str>;

    /// Move the cursor back by `n` lines (saturating at the first line).
    fn rewind(&mut self, n: usize);

    /// Place the cursor on line `index` (clamped to the end of input).
    fn move_to(&mut self, index: usize);

    /// `true` once every line has been read.
    fn at_end(&self) -> bool;

    /// 0-based index of the next line to be read.
    fn current_line_index(&self) -> usize;

    /// Name of the resource the lines came from.
    fn filename(&self) -> &str;

    /// Look at the next line without moving.
    fn peek_line(&self) -> Option<&str> {
        self.peek_at(0)
    }
}

/// In-memory [`LineSource`] holding a whole message or archive.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    name: String,
    lines: Vec<String>,
    pos: usize,
}

impl LineBuffer {
    /// Split already-decoded text into lines (`\n` or `\r\n` terminated).
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        // A trailing newline does not start another line
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };
        Self {
            name: name.into(),
            lines,
            pos: 0,
        }
    }

    /// Split raw bytes into lines and decode each one on its own.
    ///
    /// A line that is not valid UTF-8 falls back to Windows-1252, so one
    /// stray 8-bit byte does not change how the rest of an archive reads.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        let lines = if bytes.is_empty() {
            Vec::new()
        } else {
            body.split(|&b| b == b'\n')
                .map(|l| decode_line(l.strip_suffix(b"\r").unwrap_or(l)))
                .collect()
        };
        Self {
            name: name.into(),
            lines,
            pos: 0,
        }
    }

    /// Read a whole file, failing fast if it is larger than `max_size` bytes.
    pub fn open(path: impl AsRef<Path>, max_size: u64) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_limited(path, max_size)?;
        let buffer = Self::from_bytes(path.display().to_string(), &bytes);
        debug!(
            file = %path.display(),
            lines = buffer.len(),
            "Loaded line buffer"
        );
        Ok(buffer)
    }

    /// The line at `index`, regardless of the cursor.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Break line `index` in two at byte offset `at`. Lines after it move down by one.
    pub(crate) fn split_line(&mut self, index: usize, at: usize) {
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        if at == 0 || at >= line.len() || !line.is_char_boundary(at) {
            return;
        }
        let tail = line.split_off(at);
        self.lines.insert(index + 1, tail);
    }

    /// Total number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for LineBuffer {
    fn read_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.pos)?.clone();
        self.pos += 1;
        Some(line)
    }

    fn peek_at(&self, offset: usize) -> Option<&str> {
        self.lines.get(self.pos + offset).map(String::as_str)
    }

    fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    fn move_to(&mut self, index: usize) {
        self.pos = index.min(self.lines.len());
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn current_line_index(&self) -> usize {
        self.pos
    }

    fn filename(&self) -> &str {
        &self.name
    }
}

/// Read a whole file, failing fast if it is larger than `max_size` bytes.
pub fn read_limited(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound(path.to_path_buf())
        } else {
            IngestError::io(path, e)
        }
    })?;
    if metadata.len() > max_size {
        return Err(IngestError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: max_size,
        });
    }
    std::fs::read(path).map_err(|e| IngestError::io(path, e))
}

/// Decode one physical line: UTF-8 first, then Windows-1252 (which accepts every byte).
fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded.into_owned()
        }
    }
}
