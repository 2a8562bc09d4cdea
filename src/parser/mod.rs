//! Email parsing: header fields, MIME bodies and the three archive importers.

pub mod address;
pub mod content_type;
pub mod date;
pub mod eml;
pub mod emlx;
pub mod encoded_word;
pub mod fields;
pub mod header;
pub mod mbox;
pub mod mime;
pub mod tables;
pub mod transfer;

use crate::store::lines::LineSource;

/// The container a message is read from; decides what ends a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// One message per file; only end of input ends it.
    Single,
    /// MBOX: a `From ` marker line starts the next message.
    Mailbox,
    /// EMLX: a plist block follows the message.
    PerMessageFile,
}

/// Why a run of lines stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A delimiter of the boundary at this stack position is at the cursor
    /// (not consumed). `closing` for the `--boundary--` form.
    Boundary { level: usize, closing: bool },
    /// Input exhausted.
    Eof,
    /// A new-message marker is at the cursor.
    NewMessage,
    /// The archive's trailing metadata block is at the cursor.
    Trailer,
}

impl ArchiveKind {
    /// What ends the current message at the cursor, if anything.
    ///
    /// `after_blank` tells whether the line just consumed was blank.
    pub(crate) fn message_end(self, src: &dyn LineSource, after_blank: bool) -> Option<Stop> {
        match self {
            Self::Single => None,
            Self::Mailbox => src
                .peek_line()
                .filter(|line| mbox::is_marker(line, after_blank))
                .map(|_| Stop::NewMessage),
            Self::PerMessageFile => emlx::at_trailer(src).then_some(Stop::Trailer),
        }
    }
}

/// Blank for message structure: empty or only whitespace.
pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Stack position of the boundary `line` delimits, innermost first, and
/// whether it is the closing `--boundary--` form.
pub(crate) fn delimiter_level(line: &str, boundaries: &[String]) -> Option<(usize, bool)> {
    let rest = line.strip_prefix("--")?.trim_end();
    boundaries.iter().enumerate().rev().find_map(|(level, boundary)| {
        if rest == boundary {
            Some((level, false))
        } else if rest.strip_suffix("--") == Some(boundary.as_str()) {
            Some((level, true))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_level() {
        let stack = vec!["outer".to_string(), "inner".to_string()];
        assert_eq!(delimiter_level("--inner", &stack), Some((1, false)));
        assert_eq!(delimiter_level("--outer--  ", &stack), Some((0, true)));
        assert_eq!(delimiter_level("--other", &stack), None);
        assert_eq!(delimiter_level("inner", &stack), None);
        assert_eq!(delimiter_level("--inner", &[]), None);
    }
}
