//! Header section parsing: line folding and per-field normalization.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::address::{parse_address, parse_address_list};
use super::content_type::{parse_disposition, parse_header_content_type};
use super::date::parse_date;
use super::fields::{lookup, FieldKind, FieldSpec, Lookup};
use super::transfer::TransferEncoding;
use super::{delimiter_level, encoded_word, is_blank, ArchiveKind, Stop};
use crate::config::ParserConfig;
use crate::error::{FieldError, IngestError, Result};
use crate::model::address::AddressRecord;
use crate::model::message::{FieldValues, Message, Recipients};
use crate::store::lines::LineSource;

/// `tag: body`, where the tag is printable ASCII without spaces or colons.
static TAG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([!-9;-~]+)[ \t]*:(.*)$").expect("valid regex"));

static MESSAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>\s]+)>").expect("valid regex"));

static REPLY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\s*(?:re|fwd?|aw|wg|sv|vs|antw|tr|rif|odp|enc)\s*(?:\[\d+\])?\s*:)+\s*")
        .expect("valid regex")
});

static RECEIVED_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(from|by|via|with|id|for)\s+(\S+)").expect("valid regex"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid regex"));

/// One unfolded header item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderItem {
    /// Lowercased tag.
    pub tag: String,
    /// Trimmed body with continuation lines joined by single spaces.
    pub body: String,
    /// 1-based line of the tag.
    pub line: usize,
}

/// Result of reading one header item.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HeaderLine {
    Item(HeaderItem),
    /// The blank separator line was consumed, or a boundary is at the cursor.
    End,
    /// The header section was cut short.
    Cut(Stop),
}

/// Read one folded item.
///
/// A first line that is not `tag: body` is left unread and reported as
/// [`IngestError::MalformedHeader`]. Only the item's own first line is taken
/// unconditionally; after it, continuation lines are any lines that do not
/// themselves start an item, so a `tag: body` line right after an item is a
/// new item. Blank lines, boundary delimiters and archive markers never
/// continue an item.
pub(crate) fn read_item(
    src: &mut dyn LineSource,
    kind: ArchiveKind,
    boundaries: &[String],
) -> Result<HeaderLine> {
    if let Some(stop) = kind.message_end(src, false) {
        return Ok(HeaderLine::Cut(stop));
    }
    let Some(first) = src.peek_line() else {
        return Ok(HeaderLine::Cut(Stop::Eof));
    };
    if is_blank(first) {
        src.read_line();
        return Ok(HeaderLine::End);
    }
    if is_delimiter(first, boundaries) {
        return Ok(HeaderLine::End);
    }
    let line = src.current_line_index() + 1;
    let Some(caps) = TAG_LINE.captures(first) else {
        return Err(IngestError::MalformedHeader {
            line,
            text: first.to_string(),
        });
    };
    let tag = caps[1].to_ascii_lowercase();
    let mut body = caps[2].trim().to_string();
    src.read_line();

    while let Some(next) = src.peek_line() {
        if is_blank(next)
            || TAG_LINE.is_match(next)
            || is_delimiter(next, boundaries)
            || kind.message_end(src, false).is_some()
        {
            break;
        }
        let piece = next.trim();
        if !body.is_empty() {
            body.push(' ');
        }
        body.push_str(piece);
        src.read_line();
    }

    Ok(HeaderLine::Item(HeaderItem { tag, body, line }))
}

fn is_delimiter(line: &str, boundaries: &[String]) -> bool {
    delimiter_level(line, boundaries).is_some()
}

/// Parse the message header section into `message`.
///
/// Stops after the blank separator line. Missing `From` or `Date` are
/// recorded as the message diagnostic but do not stop the caller from parsing
/// the body.
pub fn parse_header(
    src: &mut dyn LineSource,
    message: &mut Message,
    kind: ArchiveKind,
    config: &ParserConfig,
) -> Result<()> {
    let mut count = 0usize;
    loop {
        match read_item(src, kind, &[])? {
            HeaderLine::Item(item) => {
                apply_field(message, &item);
                count += 1;
            }
            HeaderLine::End | HeaderLine::Cut(_) => break,
        }
    }
    let end_line = src.current_line_index();
    debug!(
        file = %message.source().filename,
        items = count,
        end_line,
        "Header section parsed"
    );

    for required in ["From", "Date"] {
        if !message.has_field(required) {
            message.set_error(&IngestError::MissingHeader {
                name: required,
                line: end_line,
            });
        }
    }
    if config.synthesize_missing {
        synthesize_missing(message);
    }
    Ok(())
}

fn synthesize_missing(message: &mut Message) {
    if !message.has_field("To") {
        let name = "Undisclosed recipients";
        message.fields.insert("To".into(), raw_values(name));
        message
            .recipients_mut(Recipients::To)
            .push(AddressRecord::with_name(name));
    }
    if !message.has_field("Subject") {
        let subject = "(no subject)";
        let mut values = raw_values(subject);
        values.insert("subject".into(), subject.into());
        values.insert("topic".into(), subject.into());
        message.fields.insert("Subject".into(), values);
    }
}

fn raw_values(raw: &str) -> FieldValues {
    let mut values = FieldValues::new();
    values.insert("raw".into(), raw.to_string());
    values
}

/// Dispatch one item through the field table.
pub(crate) fn apply_field(message: &mut Message, item: &HeaderItem) {
    match lookup(&item.tag) {
        Lookup::Silent => {}
        Lookup::Unknown => message.note(FieldError::UnknownField(item.tag.clone()), Some(item.line)),
        Lookup::Known(spec) => apply_known(message, spec, &item.body, item.line),
    }
}

fn apply_known(message: &mut Message, spec: &FieldSpec, body: &str, line: usize) {
    let name = spec.name;
    match spec.kind {
        FieldKind::Raw => append_raw(message, name, body),
        FieldKind::Encoded => {
            append_raw(message, name, body);
            append_value(message, name, "decoded", &encoded_word::decode(body));
        }
        FieldKind::AddressList(Some(list)) => {
            append_raw(message, name, body);
            for record in address_list(message, body, line) {
                message.recipients_mut(list).push(record);
            }
        }
        FieldKind::AddressList(None) => {
            let first_seen = !message.has_field(name);
            append_raw(message, name, body);
            if let Some(record) = address_list(message, body, line).into_iter().next() {
                if first_seen {
                    insert_all(message, name, record.entries());
                }
            }
        }
        FieldKind::References => {
            append_raw(message, name, body);
            let decoded = encoded_word::decode(body);
            for caps in MESSAGE_ID.captures_iter(&decoded) {
                let mut record = FieldValues::new();
                record.insert("raw".into(), caps[0].to_string());
                record.insert("id".into(), caps[1].to_string());
                message.references.push(record);
            }
        }
        FieldKind::Received => {
            append_raw(message, name, body);
            let record = received_record(message, body, line);
            message.received.push(record);
        }
        FieldKind::Ignored => {}
        single => {
            if message.has_field(name) {
                message.note(FieldError::Duplicate(name.to_string()), Some(line));
                return;
            }
            let mut values = raw_values(body);
            normalize_single(message, single, name, body, line, &mut values);
            message.fields.insert(name.to_string(), values);
        }
    }
}

/// Fill derived sub-keys for single-valued structured fields.
fn normalize_single(
    message: &mut Message,
    kind: FieldKind,
    name: &'static str,
    body: &str,
    line: usize,
    values: &mut FieldValues,
) {
    match kind {
        FieldKind::Address => match parse_address(body) {
            Ok(record) => extend(values, record.entries()),
            Err(e) => message.note(e, Some(line)),
        },
        FieldKind::Date => match parse_date(body) {
            Ok(date) => extend(values, date.entries()),
            Err(e) => message.note(e, Some(line)),
        },
        FieldKind::MessageId => match message_id(&encoded_word::decode(body)) {
            Some(id) => {
                values.insert("id".into(), id);
            }
            None => message.note(
                FieldError::MessageId {
                    field: name,
                    value: body.to_string(),
                },
                Some(line),
            ),
        },
        FieldKind::Subject => {
            let subject = encoded_word::decode(body);
            let topic = REPLY_PREFIX.replace(&subject, "").trim().to_string();
            values.insert("subject".into(), subject);
            values.insert("topic".into(), topic);
        }
        FieldKind::ContentType => {
            let (ct, issues) = parse_header_content_type(body);
            for issue in issues {
                message.note(issue, Some(line));
            }
            if !ct.mime_type.is_empty() {
                values.insert("type".into(), ct.mime_type);
            }
            values.extend(ct.params);
        }
        FieldKind::TransferEncoding => match TransferEncoding::parse(body) {
            Ok(encoding) => {
                values.insert("encoding".into(), encoding.as_str().to_string());
            }
            Err(e) => message.note(e, Some(line)),
        },
        FieldKind::Disposition => values.extend(parse_disposition(body)),
        _ => {}
    }
}

/// First `<msg-id>` token, or a bare token containing `@`.
fn message_id(body: &str) -> Option<String> {
    if let Some(caps) = MESSAGE_ID.captures(body) {
        return Some(caps[1].to_string());
    }
    body.split_whitespace()
        .find(|token| token.contains('@'))
        .map(|token| token.trim_matches(['<', '>', '"']).to_string())
}

/// Parse an address list, noting failures; empty and failed entries are skipped.
fn address_list(message: &mut Message, body: &str, line: usize) -> Vec<AddressRecord> {
    match parse_address_list(body) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Ok(record) if record.is_empty() => None,
                Ok(record) => Some(record),
                Err(e) => {
                    message.note(e, Some(line));
                    None
                }
            })
            .collect(),
        Err(e) => {
            message.note(e, Some(line));
            Vec::new()
        }
    }
}

/// Decompose a trace header into its `from`/`by`/`with`/`id`/`for` clauses
/// and the date after the final semicolon.
fn received_record(message: &mut Message, body: &str, line: usize) -> FieldValues {
    let mut record = raw_values(body);
    let (clauses, date) = match body.rsplit_once(';') {
        Some((clauses, date)) => (clauses, Some(date.trim())),
        None => (body, None),
    };
    let mut stripped = clauses.to_string();
    while COMMENT.is_match(&stripped) {
        stripped = COMMENT.replace_all(&stripped, " ").into_owned();
    }
    for caps in RECEIVED_CLAUSE.captures_iter(&stripped) {
        let key = caps[1].to_ascii_lowercase();
        let value = caps[2].trim_matches(['<', '>', ';']).to_string();
        record.entry(key).or_insert(value);
    }
    if let Some(date) = date.filter(|d| !d.is_empty()) {
        match parse_date(date) {
            Ok(parsed) => extend(&mut record, parsed.entries()),
            Err(e) => message.note(e, Some(line)),
        }
    }
    record
}

/// Add `body` to the field's `raw`, newline-separated on repeats.
fn append_raw(message: &mut Message, name: &str, body: &str) {
    append_value(message, name, "raw", body);
}

fn append_value(message: &mut Message, name: &str, key: &str, value: &str) {
    let values = message.fields.entry(name.to_string()).or_default();
    values
        .entry(key.to_string())
        .and_modify(|existing| {
            existing.push('\n');
            existing.push_str(value);
        })
        .or_insert_with(|| value.to_string());
}

fn insert_all(message: &mut Message, name: &str, entries: Vec<(&'static str, &str)>) {
    let values = message.fields.entry(name.to_string()).or_default();
    extend(values, entries);
}

fn extend(values: &mut FieldValues, entries: Vec<(&'static str, &str)>) {
    for (key, value) in entries {
        values.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::SourceLocation;
    use crate::store::lines::LineBuffer;

    fn parse(text: &str) -> (Message, LineBuffer) {
        let mut src = LineBuffer::from_text("test.eml", text);
        let mut message = Message::new(SourceLocation {
            filename: "test.eml".into(),
            line: 1,
        });
        parse_header(
            &mut src,
            &mut message,
            ArchiveKind::Single,
            &ParserConfig::default(),
        )
        .unwrap();
        (message, src)
    }

    const MINIMAL: &str = "From: a@x.org\nDate: Tue, 10 Jan 2017 19:28:58 +0100\n";

    #[test]
    fn test_folding_joins_with_single_spaces() {
        let (msg, src) = parse(&format!(
            "{MINIMAL}Subject: a long\n   subject\n\tline\n\nbody\n"
        ));
        assert_eq!(msg.field_value("Subject", "raw"), Some("a long subject line"));
        assert_eq!(src.peek_line(), Some("body"));
    }

    #[test]
    fn test_date_and_address_sub_keys() {
        let (msg, _) = parse(&format!("{MINIMAL}To: \"Doe, John\" <john.doe@foo.com>\n\n"));
        assert_eq!(msg.field_value("Date", "time UTC"), Some("18:28:58"));
        assert_eq!(msg.field_value("From", "email"), Some("a@x.org"));
        assert_eq!(msg.to_count(), 1);
        assert_eq!(msg.to(0).unwrap().last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_x_headers_are_silent_and_unknown_fields_noted() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Subject: s\nTo: b@y.org\nx-custom-trace: abc\nunknown-field: value\n\n"
        ));
        assert!(!msg.has_field("x-custom-trace"));
        assert!(!msg.has_field("unknown-field"));
        assert_eq!(msg.warnings().len(), 1);
        assert!(msg.warnings()[0].message.contains("unknown-field"));
        assert!(!msg.has_error());
    }

    #[test]
    fn test_missing_from_is_fatal() {
        let (msg, _) = parse("Date: Tue, 10 Jan 2017 19:28:58 +0100\nSubject: hi\n\nbody\n");
        assert!(msg.has_error());
        assert!(msg.error().unwrap().contains("header section"));
        assert!(msg.field("From").is_none());
    }

    #[test]
    fn test_missing_to_and_subject_are_synthesized() {
        let (msg, _) = parse(&format!("{MINIMAL}\n"));
        assert_eq!(msg.field_value("To", "raw"), Some("Undisclosed recipients"));
        assert_eq!(
            msg.to(0).unwrap().full_name.as_deref(),
            Some("Undisclosed recipients")
        );
        assert_eq!(msg.subject(), Some("(no subject)"));
    }

    #[test]
    fn test_malformed_first_line() {
        let mut src = LineBuffer::from_text("bad.eml", "this is not a header\n\n");
        let err = read_item(&mut src, ArchiveKind::Single, &[]).unwrap_err();
        assert!(matches!(err, IngestError::MalformedHeader { line: 1, .. }));
        assert_eq!(src.current_line_index(), 0);
    }

    #[test]
    fn test_repeated_fields() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Date: Wed, 11 Jan 2017 10:00:00 +0000\nTo: a@x.org\nTo: b@y.org\nX-Mailer: one\nX-Mailer: two\n\n"
        ));
        assert_eq!(msg.field_value("Date", "date"), Some("2017-01-10"));
        assert_eq!(msg.to_count(), 2);
        assert_eq!(msg.field_value("X-Mailer", "raw"), Some("one\ntwo"));
        assert!(msg
            .warnings()
            .iter()
            .any(|w| w.message.contains("repeated Date")));
    }

    #[test]
    fn test_subject_topic() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Subject: Re: AW: Fwd: =?UTF-8?Q?Caf=C3=A9?= plans\n\n"
        ));
        assert_eq!(
            msg.field_value("Subject", "subject"),
            Some("Re: AW: Fwd: Café plans")
        );
        assert_eq!(msg.field_value("Subject", "topic"), Some("Café plans"));
    }

    #[test]
    fn test_message_ids_and_references() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Message-ID: <abc@x.org>\nIn-Reply-To: <p1@y.org>\nReferences: <p0@y.org>\n <p1@y.org>\n\n"
        ));
        assert_eq!(msg.field_value("Message-Id", "id"), Some("abc@x.org"));
        assert_eq!(msg.field_value("In-Reply-To", "id"), Some("p1@y.org"));
        assert_eq!(msg.reference_count(), 2);
        assert_eq!(
            msg.reference(1).unwrap().get("id").map(String::as_str),
            Some("p1@y.org")
        );
    }

    #[test]
    fn test_encoded_message_ids() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Message-ID: =?utf-8?B?PGVuY0B4Lm9yZz4=?=\nReferences: =?us-ascii?Q?<r1@y.org>_<r2@y.org>?=\n\n"
        ));
        assert_eq!(msg.field_value("Message-Id", "id"), Some("enc@x.org"));
        assert_eq!(msg.reference_count(), 2);
        assert_eq!(
            msg.reference(0).unwrap().get("id").map(String::as_str),
            Some("r1@y.org")
        );
    }

    #[test]
    fn test_tag_line_after_item_is_a_new_item() {
        let (msg, _) = parse(&format!("{MINIMAL}Subject: one\nComments: two\n  more\n\n"));
        assert_eq!(msg.field_value("Subject", "raw"), Some("one"));
        assert_eq!(msg.field_value("Comments", "raw"), Some("two more"));
    }

    #[test]
    fn test_received_decomposition() {
        let (msg, _) = parse(&format!(
            "Received: from mail.x.org (mail.x.org [10.0.0.1])\n by mx.y.org (Postfix) with ESMTPS id 4F2A\n for <b@y.org>; Tue, 10 Jan 2017 19:29:01 +0100\n{MINIMAL}\n"
        ));
        assert_eq!(msg.received_count(), 1);
        let r = msg.received(0).unwrap();
        assert_eq!(r.get("from").map(String::as_str), Some("mail.x.org"));
        assert_eq!(r.get("by").map(String::as_str), Some("mx.y.org"));
        assert_eq!(r.get("with").map(String::as_str), Some("ESMTPS"));
        assert_eq!(r.get("id").map(String::as_str), Some("4F2A"));
        assert_eq!(r.get("for").map(String::as_str), Some("b@y.org"));
        assert_eq!(r.get("time UTC").map(String::as_str), Some("18:29:01"));
    }

    #[test]
    fn test_content_type_fields() {
        let (msg, _) = parse(&format!(
            "{MINIMAL}Content-Type: multipart/alternate; boundary=\"b1\"\nContent-Transfer-Encoding: 7BIT\n\n"
        ));
        assert_eq!(msg.field_value("Content-Type", "type"), Some("multipart/alternative"));
        assert_eq!(msg.field_value("Content-Type", "boundary"), Some("b1"));
        assert_eq!(
            msg.field_value("Content-Transfer-Encoding", "encoding"),
            Some("7bit")
        );
    }

    #[test]
    fn test_header_stops_at_boundary() {
        let mut src = LineBuffer::from_text("p", "Content-Type: text/plain\n--b\n");
        let boundaries = vec!["b".to_string()];
        let first = read_item(&mut src, ArchiveKind::Single, &boundaries).unwrap();
        assert!(matches!(first, HeaderLine::Item(_)));
        assert_eq!(
            read_item(&mut src, ArchiveKind::Single, &boundaries).unwrap(),
            HeaderLine::End
        );
        assert_eq!(src.peek_line(), Some("--b"));
    }
}
