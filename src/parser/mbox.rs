//! MBOX archive import.
//!
//! Messages are separated by `From ` marker lines. The whole archive is held
//! in one [`LineBuffer`] and messages are parsed lazily, one per call to
//! [`Iterator::next`]. Tolerant of:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - `From ` lines not preceded by a blank line, when they look like a postmark
//! - Truncated messages at EOF
//! - A UTF-8 BOM at the start of the file

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::eml::parse_message;
use super::{is_blank, ArchiveKind};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::model::message::Message;
use crate::store::lines::{LineBuffer, LineSource};

/// `From <sender> <weekday> <month> <day> <time> [zone] <year>`
static POSTMARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^From \S+\s+(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}\s+\d{1,2}:\d{2}(?::\d{2})?\s+(?:[A-Za-z]{1,5}\s+|[+-]\d{4}\s+)?\d{4}",
    )
    .expect("valid regex")
});

/// Whether `line` starts a new message. A `From ` line counts after a blank
/// line, or anywhere when it is a full postmark. `>From ` never counts.
pub(crate) fn is_marker(line: &str, after_blank: bool) -> bool {
    line.starts_with("From ") && (after_blank || POSTMARK.is_match(line))
}

/// Open an MBOX archive for lazy, message-by-message import.
pub fn import_mailbox_archive(path: impl AsRef<Path>, config: &ParserConfig) -> Result<MailboxArchive> {
    let buffer = LineBuffer::open(path, config.max_input_size)?;
    Ok(MailboxArchive::new(buffer, config.clone()))
}

/// Iterator over the messages of one MBOX archive.
pub struct MailboxArchive {
    buffer: LineBuffer,
    config: ParserConfig,
    count: usize,
    failed: usize,
}

impl MailboxArchive {
    pub fn new(buffer: LineBuffer, config: ParserConfig) -> Self {
        Self {
            buffer,
            config,
            count: 0,
            failed: 0,
        }
    }

    /// Number of messages produced so far.
    pub fn produced(&self) -> usize {
        self.count
    }

    /// Number of produced messages that carry a fatal diagnostic.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Move the cursor onto the next message's first header line.
    /// Returns `false` once the archive is exhausted.
    fn seek_message(&mut self) -> bool {
        loop {
            let Some(line) = self.buffer.peek_line() else {
                return false;
            };
            if is_blank(line) {
                self.buffer.read_line();
            } else if line.starts_with("From ") {
                debug!(
                    line = self.buffer.current_line_index() + 1,
                    "Message boundary"
                );
                self.buffer.read_line();
                return true;
            } else if self.count == 0 {
                warn!(
                    file = %self.buffer.filename(),
                    "Archive does not start with a 'From ' line"
                );
                return true;
            } else {
                warn!(
                    file = %self.buffer.filename(),
                    line = self.buffer.current_line_index() + 1,
                    "Skipping text between messages"
                );
                self.buffer.read_line();
            }
        }
    }
}

impl Iterator for MailboxArchive {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        if !self.seek_message() {
            if !self.buffer.is_empty() {
                info!(
                    file = %self.buffer.filename(),
                    messages = self.count,
                    failed = self.failed,
                    "Mailbox archive imported"
                );
            }
            return None;
        }
        let message = parse_message(&mut self.buffer, ArchiveKind::Mailbox, &self.config);
        self.count += 1;
        if message.has_error() {
            self.failed += 1;
        }
        Some(message)
    }
}
