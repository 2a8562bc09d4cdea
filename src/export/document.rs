//! Canonical XML rendering of a parsed [`Message`].
//!
//! One element per header field, then the part forest depth-first. Text
//! parts carry their payload as text; every other type is base64, and so is
//! a text part holding characters XML 1.0 cannot represent.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use tracing::warn;

use crate::config::ExportConfig;
use crate::error::{IngestError, Result};
use crate::model::address::AddressRecord;
use crate::model::message::{FieldValues, Message};
use crate::parser::fields::{kind_of, FieldKind};

type Attributes = Vec<(String, String)>;

impl Message {
    /// Render with the default export settings.
    pub fn to_canonical_document(&self) -> Result<String> {
        self.to_canonical_document_with(&ExportConfig::default())
    }

    pub fn to_canonical_document_with(&self, config: &ExportConfig) -> Result<String> {
        let writer = if config.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', config.indent)
        } else {
            Writer::new(Vec::new())
        };
        let mut doc = Document { writer, message: self };
        doc.write_message()?;
        String::from_utf8(doc.writer.into_inner()).map_err(xml_error)
    }
}

fn xml_error(e: impl std::fmt::Display) -> IngestError {
    IngestError::Serialize(e.to_string())
}

/// Allowed in an XML 1.0 document.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

/// Header text with characters XML cannot carry replaced by U+FFFD.
fn xml_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
                .collect(),
        )
    }
}

fn start_tag<'n>(name: &'n str, attributes: &[(String, String)]) -> BytesStart<'n> {
    let mut tag = BytesStart::new(name);
    for (key, value) in attributes {
        tag.push_attribute((key.as_str(), xml_text(value).as_ref()));
    }
    tag
}

/// Element or attribute name for a field name or sub-key.
fn element_name(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

/// Every sub-key except `raw` and the listed ones, as attributes.
fn sub_attributes(values: &FieldValues, skip: &[&str]) -> Attributes {
    values
        .iter()
        .filter(|(key, _)| key.as_str() != "raw" && !skip.contains(&key.as_str()))
        .map(|(key, value)| (element_name(key), value.clone()))
        .collect()
}

fn address_entries(values: &FieldValues) -> AddressRecord {
    AddressRecord {
        email: values.get("email").cloned(),
        full_name: values.get("full name").cloned(),
        first_name: values.get("first name").cloned(),
        last_name: values.get("last name").cloned(),
    }
}

struct Document<'a> {
    writer: Writer<Vec<u8>>,
    message: &'a Message,
}

impl Document<'_> {
    fn start(&mut self, name: &str, attributes: &[(String, String)]) -> Result<()> {
        self.writer
            .write_event(Event::Start(start_tag(name, attributes)))
            .map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    /// `<name attrs>text</name>`, or `<name attrs/>` without text.
    fn element(&mut self, name: &str, attributes: &[(String, String)], text: Option<&str>) -> Result<()> {
        match text.filter(|t| !t.is_empty()) {
            Some(text) => {
                self.start(name, attributes)?;
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(partial_escape(&xml_text(text)))))
                    .map_err(xml_error)?;
                self.end(name)
            }
            None => {
                self.writer
                    .write_event(Event::Empty(start_tag(name, attributes)))
                    .map_err(xml_error)
            }
        }
    }

    fn write_message(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        let source = self.message.source();
        self.start(
            "message",
            &[
                ("source".into(), source.filename.clone()),
                ("line".into(), source.line.to_string()),
            ],
        )?;
        if let Some(diagnostic) = self.message.diagnostic() {
            let attributes: Attributes = diagnostic
                .line
                .map(|line| vec![("line".into(), line.to_string())])
                .unwrap_or_default();
            self.element("error", &attributes, Some(&diagnostic.message))?;
        }
        self.write_header()?;
        self.write_body()?;
        self.end("message")
    }

    fn write_header(&mut self) -> Result<()> {
        self.start("header", &[])?;
        let message = self.message;
        for (name, values) in message.fields() {
            let kind = kind_of(name).unwrap_or(FieldKind::Raw);
            self.write_field(name, kind, values)?;
        }
        self.end("header")
    }

    fn write_field(&mut self, name: &str, kind: FieldKind, values: &FieldValues) -> Result<()> {
        let tag = element_name(name);
        let raw = values.get("raw").map(String::as_str);
        let message = self.message;
        match kind {
            // Already applied while decoding the body
            FieldKind::TransferEncoding | FieldKind::Ignored => Ok(()),
            FieldKind::AddressList(Some(list)) => {
                let records = message.recipients(list);
                if records.is_empty() {
                    return self.element(&tag, &[], raw);
                }
                self.start(&tag, &[])?;
                for record in records {
                    self.write_individual(record)?;
                }
                self.end(&tag)
            }
            FieldKind::Address | FieldKind::AddressList(None) => {
                let record = address_entries(values);
                if record.is_empty() {
                    return self.element(&tag, &[], raw);
                }
                self.start(&tag, &[])?;
                self.write_individual(&record)?;
                self.end(&tag)
            }
            FieldKind::Received => {
                self.start(&tag, &[])?;
                for record in message.received_list() {
                    let raw = record.get("raw").map(String::as_str);
                    self.element("reference", &sub_attributes(record, &[]), raw)?;
                }
                self.end(&tag)
            }
            FieldKind::References => {
                self.start(&tag, &[])?;
                for record in message.references() {
                    let raw = record.get("raw").map(String::as_str);
                    self.element("reference", &sub_attributes(record, &[]), raw)?;
                }
                self.end(&tag)
            }
            FieldKind::ContentType => {
                if let Some(residual) = values.get("residual") {
                    warn!(
                        file = %message.source().filename,
                        residual = %residual,
                        "Content-Type information not represented in the document"
                    );
                }
                self.element(&tag, &sub_attributes(values, &["residual"]), None)
            }
            FieldKind::Subject => {
                let subject = values.get("subject").map(String::as_str).or(raw);
                self.element(&tag, &sub_attributes(values, &["subject"]), subject)
            }
            FieldKind::Encoded => {
                let decoded = values.get("decoded").map(String::as_str).or(raw);
                self.element(&tag, &[], decoded)
            }
            FieldKind::Date | FieldKind::MessageId | FieldKind::Disposition => {
                self.element(&tag, &sub_attributes(values, &[]), raw)
            }
            FieldKind::Raw => self.element(&tag, &[], raw),
        }
    }

    fn write_individual(&mut self, record: &AddressRecord) -> Result<()> {
        self.start("individual", &[])?;
        for (key, value) in record.entries() {
            self.element(&element_name(key), &[], Some(value))?;
        }
        self.end("individual")
    }

    fn write_body(&mut self) -> Result<()> {
        self.start("body", &[])?;
        let parts = self.message.parts();
        for root in (0..parts.len()).filter(|&i| parts.parent_of(i).is_none()) {
            self.write_part(root)?;
        }
        self.end("body")
    }

    fn write_part(&mut self, index: usize) -> Result<()> {
        let message = self.message;
        let Some(part) = message.part(index) else {
            return Ok(());
        };
        let mut attributes: Attributes = vec![("type".into(), part.content_type.clone())];
        attributes.extend(
            part.attributes
                .iter()
                .filter(|(key, _)| key.as_str() != "transfer-encoding")
                .map(|(key, value)| (element_name(key), value.clone())),
        );

        if part.is_multipart() {
            if part.children.is_empty() {
                return self.element("part", &attributes, None);
            }
            self.start("part", &attributes)?;
            for &child in &part.children {
                self.write_part(child)?;
            }
            return self.end("part");
        }
        if part.is_text() {
            let text = part.text();
            if text.chars().all(is_xml_char) {
                return self.element("part", &attributes, Some(&text));
            }
        }
        attributes.push(("encoding".into(), "base64".into()));
        let payload = STANDARD.encode(&part.content);
        self.element("part", &attributes, Some(&payload))
    }
}
