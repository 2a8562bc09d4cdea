//! Single-message import and the per-message driver shared by the archive
//! importers.

use std::path::Path;

use tracing::debug;

use super::{header, is_blank, mime, ArchiveKind, Stop};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::model::message::{Message, SourceLocation};
use crate::store::lines::{LineBuffer, LineSource};

/// Import a file holding exactly one message.
///
/// Never fails: an unreadable or oversized file yields a `Message` whose
/// diagnostic describes the problem.
pub fn import_single(path: impl AsRef<Path>, config: &ParserConfig) -> Message {
    let path = path.as_ref();
    match LineBuffer::open(path, config.max_input_size) {
        Ok(mut buffer) => parse_single(&mut buffer, config),
        Err(e) => {
            let mut message = Message::new(SourceLocation {
                filename: path.display().to_string(),
                line: 0,
            });
            message.set_error(&e);
            message
        }
    }
}

/// Parse in-memory text as one message. `name` is used as the filename.
pub fn parse_text(name: &str, text: &str, config: &ParserConfig) -> Message {
    let mut buffer = LineBuffer::from_text(name, text);
    parse_single(&mut buffer, config)
}

fn parse_single(buffer: &mut LineBuffer, config: &ParserConfig) -> Message {
    // Saved from a mailbox: drop the postmark
    if buffer.peek_line().is_some_and(|line| line.starts_with("From ")) {
        buffer.read_line();
    }
    parse_message(buffer, ArchiveKind::Single, config)
}

/// Parse one message starting at the cursor.
///
/// On return the cursor is at whatever ended the message: end of input, or
/// for archives the next marker / trailer. A fatal error becomes the message
/// diagnostic and the rest of the message is skipped.
pub fn parse_message(src: &mut dyn LineSource, kind: ArchiveKind, config: &ParserConfig) -> Message {
    let mut message = Message::new(SourceLocation {
        filename: src.filename().to_string(),
        line: src.current_line_index() + 1,
    });
    match parse_into(src, &mut message, kind, config) {
        Ok(stop) => debug!(
            file = %message.source().filename,
            start = message.source().line,
            ?stop,
            "Message parsed"
        ),
        Err(e) => {
            message.set_error(&e);
            skip_to_message_end(src, kind);
        }
    }
    message
}

fn parse_into(
    src: &mut dyn LineSource,
    message: &mut Message,
    kind: ArchiveKind,
    config: &ParserConfig,
) -> Result<Stop> {
    header::parse_header(src, message, kind, config)?;
    mime::parse_body(src, message, kind, config)
}

/// Advance past the remainder of the current message.
pub(crate) fn skip_to_message_end(src: &mut dyn LineSource, kind: ArchiveKind) {
    let mut after_blank = false;
    while kind.message_end(src, after_blank).is_none() {
        match src.read_line() {
            Some(line) => after_blank = is_blank(&line),
            None => break,
        }
    }
}
