//! EMLX (Apple Mail per-message file) import.
//!
//! Each message is prefixed by a line holding its byte count and may be
//! followed by a property-list block. The plist prologue is what ends a
//! message. When the byte count lands on that prologue it is used to put the
//! prologue on a line of its own, since Apple Mail often writes the last body
//! line without a newline.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::eml::parse_message;
use super::{is_blank, ArchiveKind};
use crate::config::ParserConfig;
use crate::error::{IngestError, Result};
use crate::model::message::{Message, SourceLocation};
use crate::store::lines::{read_limited, LineBuffer, LineSource};

const PROLOGUE: &str = "<?xml";

/// The three-line plist prologue is at the cursor.
pub(crate) fn at_trailer(src: &dyn LineSource) -> bool {
    let starts = |offset: usize, prefix: &str| {
        src.peek_at(offset)
            .is_some_and(|line| line.trim_start().starts_with(prefix))
    };
    starts(0, PROLOGUE) && starts(1, "<!DOCTYPE plist") && starts(2, "<plist")
}

/// Skip a plist block through its closing tag.
fn skip_trailer(src: &mut dyn LineSource) {
    while let Some(line) = src.read_line() {
        if line.trim() == "</plist>" {
            break;
        }
    }
}

fn is_byte_count(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

fn byte_count(line: &[u8]) -> Option<usize> {
    let line = std::str::from_utf8(line).ok()?;
    is_byte_count(line).then(|| line.trim().parse().ok()).flatten()
}

/// Use each message's byte count to end its last line before the plist.
///
/// A count that does not land on a `<?xml` prologue is ignored; line
/// detection in [`detach_trailers`] still applies.
fn bound_by_byte_counts(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 16);
    let mut pos = 0;
    while pos < bytes.len() {
        let line_end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| pos + i + 1);
        let line = &bytes[pos..line_end];
        out.extend_from_slice(line);
        pos = line_end;

        let Some(count) = byte_count(line) else {
            continue;
        };
        let end = pos.saturating_add(count);
        if end > bytes.len() || !bytes[end..].starts_with(PROLOGUE.as_bytes()) {
            continue;
        }
        out.extend_from_slice(&bytes[pos..end]);
        if !bytes[..end].ends_with(b"\n") {
            out.push(b'\n');
        }
        pos = end;
    }
    out
}

/// Move a plist prologue that trails body text onto a line of its own.
fn detach_trailers(buffer: &mut LineBuffer) {
    let mut index = 0;
    while index + 1 < buffer.len() {
        let split = buffer
            .line(index)
            .and_then(|line| line.find(PROLOGUE).filter(|&at| !line[..at].trim().is_empty()));
        let doctype_follows = buffer
            .line(index + 1)
            .is_some_and(|next| next.trim_start().starts_with("<!DOCTYPE plist"));
        if let (Some(at), true) = (split, doctype_follows) {
            debug!(file = %buffer.filename(), line = index + 1, "Plist prologue after body text");
            buffer.split_line(index, at);
            index += 1;
        }
        index += 1;
    }
}

/// Open an EMLX file, or a directory whose `*.emlx` files are imported in
/// name order.
pub fn import_per_message_file_archive(
    path: impl AsRef<Path>,
    config: &ParserConfig,
) -> Result<PerMessageFileArchive> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound(path.to_path_buf())
        } else {
            IngestError::io(path, e)
        }
    })?;
    let files = if metadata.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|e| IngestError::io(path, e))? {
            let entry = entry.map_err(|e| IngestError::io(path, e))?;
            let file = entry.path();
            let is_emlx = file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("emlx"));
            if is_emlx && file.is_file() {
                files.push(file);
            }
        }
        files.sort();
        debug!(dir = %path.display(), files = files.len(), "Found EMLX files");
        files
    } else {
        vec![path.to_path_buf()]
    };
    Ok(PerMessageFileArchive {
        files: files.into(),
        current: None,
        config: config.clone(),
        count: 0,
    })
}

/// Iterator over the messages of one or more EMLX files.
pub struct PerMessageFileArchive {
    files: VecDeque<PathBuf>,
    current: Option<LineBuffer>,
    config: ParserConfig,
    count: usize,
}

impl PerMessageFileArchive {
    /// Archive over an already loaded buffer.
    pub fn from_buffer(mut buffer: LineBuffer, config: ParserConfig) -> Self {
        detach_trailers(&mut buffer);
        Self {
            files: VecDeque::new(),
            current: Some(buffer),
            config,
            count: 0,
        }
    }

    /// Archive over the raw bytes of one EMLX file.
    pub fn from_bytes(name: &str, bytes: &[u8], config: ParserConfig) -> Self {
        Self::from_buffer(LineBuffer::from_bytes(name, &bound_by_byte_counts(bytes)), config)
    }

    /// Number of messages produced so far.
    pub fn produced(&self) -> usize {
        self.count
    }
}

impl Iterator for PerMessageFileArchive {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        loop {
            if self.current.is_none() {
                let Some(path) = self.files.pop_front() else {
                    info!(messages = self.count, "EMLX import finished");
                    return None;
                };
                match read_limited(&path, self.config.max_input_size) {
                    Ok(bytes) => {
                        let name = path.display().to_string();
                        let mut buffer = LineBuffer::from_bytes(name, &bound_by_byte_counts(&bytes));
                        detach_trailers(&mut buffer);
                        self.current = Some(buffer);
                    }
                    Err(e) => {
                        // One unreadable file does not end the archive
                        let mut message = Message::new(SourceLocation {
                            filename: path.display().to_string(),
                            line: 0,
                        });
                        message.set_error(&e);
                        self.count += 1;
                        return Some(message);
                    }
                }
            }
            let Some(buffer) = self.current.as_mut() else {
                continue;
            };

            while buffer.peek_line().is_some_and(is_blank) {
                buffer.read_line();
            }
            if buffer.at_end() {
                self.current = None;
                continue;
            }
            if at_trailer(buffer) {
                skip_trailer(buffer);
                continue;
            }
            if buffer.peek_line().is_some_and(is_byte_count) {
                buffer.read_line();
            } else {
                warn!(
                    file = %buffer.filename(),
                    line = buffer.current_line_index() + 1,
                    "EMLX message without a byte count line"
                );
            }
            let message = parse_message(buffer, ArchiveKind::PerMessageFile, &self.config);
            self.count += 1;
            return Some(message);
        }
    }
}
