//! MIME body parsing into a part forest.
//!
//! Recursive descent keyed by the enclosing `boundary`. Simple parts are
//! read until a delimiter of any open boundary, the end of the message or the
//! end of input, then transfer-decoded and registered. Multipart containers
//! register a childless placeholder first so that the container precedes its
//! children in the forest.

use std::collections::BTreeMap;

use tracing::debug;

use super::content_type::{parse_disposition, parse_part_content_type};
use super::header::{read_item, HeaderItem, HeaderLine};
use super::tables::{is_multipart_type, is_simple_type};
use super::transfer::{decode_body, TransferEncoding};
use super::{delimiter_level, is_blank, ArchiveKind, Stop};
use crate::config::ParserConfig;
use crate::error::{FieldError, IngestError, Result};
use crate::model::message::Message;
use crate::store::lines::LineSource;

type Attributes = BTreeMap<String, String>;

/// Parse the body at the cursor into `message.parts`.
///
/// Returns what ended the message: end of input, or for archives the next
/// marker / trailer at the cursor.
pub fn parse_body(
    src: &mut dyn LineSource,
    message: &mut Message,
    kind: ArchiveKind,
    config: &ParserConfig,
) -> Result<Stop> {
    let (mime_type, attributes) = root_entity(message);
    let mut parser = BodyParser {
        src,
        message,
        kind,
        max_depth: config.max_depth,
        boundaries: Vec::new(),
    };
    let stop = parser.parse_entity(mime_type, attributes, None, 0)?;
    debug!(
        file = %message.source().filename,
        parts = message.part_count(),
        ?stop,
        "Body parsed"
    );
    Ok(stop)
}

/// Type and attributes of the top-level entity, taken from the header fields.
fn root_entity(message: &Message) -> (String, Attributes) {
    let mut mime_type = String::from("text/plain");
    let mut attributes = Attributes::new();
    if let Some(ct) = message.field("Content-Type") {
        for (key, value) in ct {
            match key.as_str() {
                "raw" | "residual" => {}
                "type" => mime_type = value.clone(),
                _ => {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }
    // Unknown encodings were already reported with the header
    if let Some(encoding) = message.field_value("Content-Transfer-Encoding", "encoding") {
        attributes.insert("transfer-encoding".into(), encoding.to_string());
    }
    if let Some(disposition) = message.field("Content-Disposition") {
        for (key, value) in disposition.iter().filter(|(k, _)| *k != "raw") {
            attributes.insert(key.clone(), value.clone());
        }
    }
    (mime_type, attributes)
}

struct BodyParser<'a> {
    src: &'a mut dyn LineSource,
    message: &'a mut Message,
    kind: ArchiveKind,
    max_depth: usize,
    /// Open boundaries, outermost first.
    boundaries: Vec<String>,
}

impl BodyParser<'_> {
    /// 1-based number of the line at the cursor.
    fn line(&self) -> usize {
        self.src.current_line_index() + 1
    }

    fn parse_entity(
        &mut self,
        mime_type: String,
        attributes: Attributes,
        parent: Option<usize>,
        depth: usize,
    ) -> Result<Stop> {
        if is_multipart_type(&mime_type) {
            match attributes.get("boundary").filter(|b| !b.is_empty()).cloned() {
                Some(boundary) => {
                    return self.parse_multipart(mime_type, attributes, boundary, parent, depth)
                }
                None => {
                    let line = self.line();
                    self.message.note(
                        FieldError::Structure(format!("{mime_type} without a boundary")),
                        Some(line),
                    );
                    return self.parse_simple(mime_type, attributes, parent);
                }
            }
        }
        if is_simple_type(&mime_type) {
            return self.parse_simple(mime_type, attributes, parent);
        }
        let line = self.line();
        self.message
            .parts
            .push(mime_type.clone(), Vec::new(), attributes, parent);
        Err(IngestError::UnknownContentType {
            content_type: mime_type,
            line,
        })
    }

    /// Read lines up to the next stop. A blank line right before a new-message
    /// marker belongs to neither message and is dropped.
    fn read_run(&mut self) -> (Vec<String>, Stop) {
        let mut lines = Vec::new();
        let mut after_blank = false;
        loop {
            if let Some(stop) = self.kind.message_end(&*self.src, after_blank) {
                if stop == Stop::NewMessage && after_blank {
                    lines.pop();
                }
                return (lines, stop);
            }
            let Some(next) = self.src.peek_line() else {
                return (lines, Stop::Eof);
            };
            if let Some((level, closing)) = delimiter_level(next, &self.boundaries) {
                return (lines, Stop::Boundary { level, closing });
            }
            if let Some(line) = self.src.read_line() {
                after_blank = is_blank(&line);
                lines.push(line);
            }
        }
    }

    fn parse_simple(
        &mut self,
        mime_type: String,
        attributes: Attributes,
        parent: Option<usize>,
    ) -> Result<Stop> {
        let start = self.line();
        let (lines, stop) = self.read_run();

        let encoding = match attributes.get("transfer-encoding") {
            None => TransferEncoding::default(),
            Some(value) => match TransferEncoding::parse(value) {
                Ok(encoding) => encoding,
                Err(e) => {
                    self.message.note(e, Some(start));
                    TransferEncoding::EightBit
                }
            },
        };
        let textual = mime_type.starts_with("text/");
        let charset = attributes.get("charset").map(String::as_str);
        let (content, issue) = decode_body(&lines, encoding, charset, textual);
        if let Some(issue) = issue {
            self.message.note(issue, Some(start));
        }

        let size = content.len();
        let index = self
            .message
            .parts
            .push(mime_type, content, attributes, parent);
        debug!(index, line = start, bytes = size, "Registered part");
        Ok(stop)
    }

    fn parse_multipart(
        &mut self,
        mime_type: String,
        attributes: Attributes,
        boundary: String,
        parent: Option<usize>,
        depth: usize,
    ) -> Result<Stop> {
        if depth >= self.max_depth {
            return Err(IngestError::NestingTooDeep {
                limit: self.max_depth,
                line: self.line(),
            });
        }
        let digest = mime_type == "multipart/digest";
        let index = self
            .message
            .parts
            .push(mime_type, Vec::new(), attributes, parent);
        let level = self.boundaries.len();
        self.boundaries.push(boundary);
        let result = self.multipart_body(index, level, digest, depth);
        self.boundaries.truncate(level);
        result
    }

    fn multipart_body(
        &mut self,
        index: usize,
        level: usize,
        digest: bool,
        depth: usize,
    ) -> Result<Stop> {
        // Preamble
        let (_, mut stop) = self.read_run();
        loop {
            match stop {
                Stop::Boundary { level: l, closing } if l == level => {
                    self.src.read_line();
                    if closing {
                        // Epilogue, up to whatever encloses this container
                        self.boundaries.truncate(level);
                        return Ok(self.read_run().1);
                    }
                    let (child_type, child_attributes) = self.read_part_header(digest)?;
                    stop = self.parse_entity(child_type, child_attributes, Some(index), depth + 1)?;
                }
                Stop::Boundary { .. } => {
                    let line = self.line();
                    self.message.note(
                        FieldError::Structure(
                            "multipart closed by an enclosing boundary".to_string(),
                        ),
                        Some(line),
                    );
                    return Ok(stop);
                }
                Stop::Eof => {
                    return Err(IngestError::UnexpectedEnd {
                        context: "inside multipart",
                        line: self.line(),
                    })
                }
                Stop::NewMessage | Stop::Trailer => {
                    return Err(IngestError::UnexpectedMarker {
                        context: "inside multipart",
                        line: self.line(),
                    })
                }
            }
        }
    }

    /// Read the header block after a delimiter. Parts without a type are
    /// `text/plain`, or `message/rfc822` inside a digest.
    fn read_part_header(&mut self, digest: bool) -> Result<(String, Attributes)> {
        let mut mime_type = String::new();
        let mut attributes = Attributes::new();
        loop {
            match read_item(&mut *self.src, self.kind, &self.boundaries) {
                Ok(HeaderLine::Item(item)) => apply_part_field(&item, &mut mime_type, &mut attributes),
                Ok(HeaderLine::End) => break,
                Ok(HeaderLine::Cut(Stop::NewMessage | Stop::Trailer)) => {
                    return Err(IngestError::UnexpectedMarker {
                        context: "in part header",
                        line: self.line(),
                    })
                }
                Ok(HeaderLine::Cut(_)) => {
                    return Err(IngestError::UnexpectedEnd {
                        context: "in part header",
                        line: self.line(),
                    })
                }
                Err(IngestError::MalformedHeader { line, .. }) => {
                    // Content right after the delimiter
                    self.message.note(
                        FieldError::Structure("part without a header section".to_string()),
                        Some(line),
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if mime_type.is_empty() {
            mime_type = if digest { "message/rfc822" } else { "text/plain" }.to_string();
        }
        Ok((mime_type, attributes))
    }
}

/// Part headers: Content-Type parameters, transfer encoding and disposition
/// are decomposed; everything else is kept raw under its lowercased tag.
fn apply_part_field(item: &HeaderItem, mime_type: &mut String, attributes: &mut Attributes) {
    match item.tag.as_str() {
        "content-type" => {
            let ct = parse_part_content_type(&item.body);
            *mime_type = ct.mime_type;
            attributes.extend(ct.params);
        }
        "content-transfer-encoding" => {
            attributes.insert(
                "transfer-encoding".into(),
                item.body.trim().to_ascii_lowercase(),
            );
        }
        "content-disposition" => attributes.extend(parse_disposition(&item.body)),
        tag => {
            attributes
                .entry(tag.to_string())
                .or_insert_with(|| item.body.clone());
        }
    }
}
