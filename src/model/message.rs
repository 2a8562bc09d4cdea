//! The parse result for one email.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::address::AddressRecord;
use super::part::{Part, PartForest};
use crate::error::{FieldError, IngestError};

/// Named sub-values of one header field. `"raw"` is always present.
pub type FieldValues = BTreeMap<String, String>;

/// Where a message came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    /// 1-based line the message starts at.
    pub line: usize,
}

/// A message plus the 1-based source line it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<usize>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Which recipient list an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    To,
    Cc,
    Bcc,
}

/// The parse result for one email.
///
/// A `Message` is always produced, even when parsing fails: check
/// [`Message::has_error`] before trusting field or part completeness.
#[derive(Debug, Clone, Default)]
pub struct Message {
    source: SourceLocation,
    diagnostic: Option<Diagnostic>,
    warnings: Vec<Diagnostic>,
    pub(crate) fields: BTreeMap<String, FieldValues>,
    pub(crate) to: Vec<AddressRecord>,
    pub(crate) cc: Vec<AddressRecord>,
    pub(crate) bcc: Vec<AddressRecord>,
    pub(crate) references: Vec<FieldValues>,
    pub(crate) received: Vec<FieldValues>,
    pub(crate) parts: PartForest,
}

impl Message {
    pub fn new(source: SourceLocation) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    // ── Diagnostics ─────────────────────────────────────────────

    /// Record a fatal error. Only the first one is kept.
    pub fn set_error(&mut self, err: &IngestError) {
        if self.diagnostic.is_some() {
            warn!(
                file = %self.source.filename,
                error = %err,
                "Further fatal error after the first one"
            );
            return;
        }
        warn!(file = %self.source.filename, error = %err, "Fatal parse error");
        self.diagnostic = Some(Diagnostic {
            message: err.to_string(),
            line: err.line(),
        });
    }

    /// Record a non-fatal issue and log it.
    pub fn note(&mut self, issue: FieldError, line: Option<usize>) {
        warn!(
            file = %self.source.filename,
            line = line.unwrap_or_default(),
            "{issue}"
        );
        self.warnings.push(Diagnostic {
            message: issue.to_string(),
            line,
        });
    }

    pub fn has_error(&self) -> bool {
        self.diagnostic.is_some()
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.diagnostic.as_ref().map(|d| d.message.as_str())
    }

    pub fn error_line(&self) -> Option<usize> {
        self.diagnostic.as_ref().and_then(|d| d.line)
    }

    /// Non-fatal issues in the order they were found.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    // ── Header fields ───────────────────────────────────────────

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValues> {
        self.fields.get(name)
    }

    pub fn field_value(&self, name: &str, key: &str) -> Option<&str> {
        self.fields.get(name)?.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValues> {
        &self.fields
    }

    // ── Address lists ───────────────────────────────────────────

    pub fn recipients(&self, list: Recipients) -> &[AddressRecord] {
        match list {
            Recipients::To => &self.to,
            Recipients::Cc => &self.cc,
            Recipients::Bcc => &self.bcc,
        }
    }

    pub(crate) fn recipients_mut(&mut self, list: Recipients) -> &mut Vec<AddressRecord> {
        match list {
            Recipients::To => &mut self.to,
            Recipients::Cc => &mut self.cc,
            Recipients::Bcc => &mut self.bcc,
        }
    }

    pub fn to_count(&self) -> usize {
        self.to.len()
    }

    pub fn to(&self, index: usize) -> Option<&AddressRecord> {
        self.to.get(index)
    }

    pub fn cc_count(&self) -> usize {
        self.cc.len()
    }

    pub fn cc(&self, index: usize) -> Option<&AddressRecord> {
        self.cc.get(index)
    }

    pub fn bcc_count(&self) -> usize {
        self.bcc.len()
    }

    pub fn bcc(&self, index: usize) -> Option<&AddressRecord> {
        self.bcc.get(index)
    }

    // ── References / Received ───────────────────────────────────

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn reference(&self, index: usize) -> Option<&FieldValues> {
        self.references.get(index)
    }

    pub fn references(&self) -> &[FieldValues] {
        &self.references
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn received(&self, index: usize) -> Option<&FieldValues> {
        self.received.get(index)
    }

    pub fn received_list(&self) -> &[FieldValues] {
        &self.received
    }

    // ── Parts ───────────────────────────────────────────────────

    pub fn parts(&self) -> &PartForest {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn part_type(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(|p| p.content_type.as_str())
    }

    pub fn part_parent(&self, index: usize) -> Option<usize> {
        self.parts.parent_of(index)
    }

    pub fn part_children(&self, index: usize) -> &[usize] {
        self.parts.children_of(index)
    }

    pub fn part_content(&self, index: usize) -> Option<&[u8]> {
        self.parts.get(index).map(|p| p.content.as_slice())
    }

    // ── Convenience ─────────────────────────────────────────────

    /// Decoded subject, if any.
    pub fn subject(&self) -> Option<&str> {
        self.field_value("Subject", "subject")
            .or_else(|| self.field_value("Subject", "raw"))
    }

    /// Sender as `"Name <email>"`, falling back to the raw header.
    pub fn sender(&self) -> Option<String> {
        let from = self.fields.get("From")?;
        let record = AddressRecord {
            email: from.get("email").cloned(),
            full_name: from.get("full name").cloned(),
            ..AddressRecord::default()
        };
        if record.is_empty() {
            from.get("raw").cloned()
        } else {
            Some(record.display())
        }
    }
}
