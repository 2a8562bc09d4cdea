//! Header tag → handler table.
//!
//! Adding support for a header is a new row here; the header parser only
//! dispatches on [`FieldKind`].

use crate::model::message::Recipients;

/// How a header body is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored as `raw` only.
    Raw,
    /// `raw` plus `decoded` with encoded words resolved.
    Encoded,
    /// One address: `raw` plus the address record keys.
    Address,
    /// Comma-separated addresses. `Some` lists are appended to the message's
    /// To/Cc/Bcc; other lists keep the first address in the field map.
    AddressList(Option<Recipients>),
    /// `raw` plus the date record keys.
    Date,
    /// `raw` plus `id` (the first `<msg-id>`).
    MessageId,
    /// `raw` plus `subject` (decoded) and `topic` (reply prefixes removed).
    Subject,
    /// Every `<msg-id>` becomes one reference record.
    References,
    /// One trace record per header, decomposed into clauses and a date.
    Received,
    /// Content-Type with ordered parameter stripping.
    ContentType,
    /// `raw` plus the canonical `encoding`.
    TransferEncoding,
    /// Content-Disposition with its parameters.
    Disposition,
    /// Known but deliberately dropped.
    Ignored,
}

/// One row of the header table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Lowercase tag as it appears before the colon.
    pub tag: &'static str,
    /// Canonical field name used as the key in the message field map.
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn row(tag: &'static str, name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { tag, name, kind }
}

use FieldKind::*;

const TO: FieldKind = AddressList(Some(Recipients::To));
const CC: FieldKind = AddressList(Some(Recipients::Cc));
const BCC: FieldKind = AddressList(Some(Recipients::Bcc));
const LIST: FieldKind = AddressList(None);

pub const FIELDS: &[FieldSpec] = &[
    // Originator and recipients
    row("from", "From", Address),
    row("sender", "Sender", Address),
    row("reply-to", "Reply-To", LIST),
    row("to", "To", TO),
    row("cc", "Cc", CC),
    row("bcc", "Bcc", BCC),
    row("apparently-to", "Apparently-To", LIST),
    row("return-path", "Return-Path", Address),
    row("errors-to", "Errors-To", Address),
    row("delivered-to", "Delivered-To", Address),
    row("envelope-to", "Envelope-To", LIST),
    row("original-recipient", "Original-Recipient", Raw),
    row("mail-followup-to", "Mail-Followup-To", LIST),
    row("mail-reply-to", "Mail-Reply-To", LIST),
    row("disposition-notification-to", "Disposition-Notification-To", LIST),
    row("return-receipt-to", "Return-Receipt-To", LIST),
    row("read-receipt-to", "Read-Receipt-To", LIST),
    row("x-original-to", "X-Original-To", Address),
    row("x-envelope-from", "X-Envelope-From", Address),
    row("x-envelope-to", "X-Envelope-To", LIST),
    row("x-apparently-to", "X-Apparently-To", LIST),
    row("x-original-sender", "X-Original-Sender", Address),
    row("x-sender", "X-Sender", Address),
    row("x-forwarded-to", "X-Forwarded-To", LIST),
    row("x-forwarded-for", "X-Forwarded-For", Raw),
    // Resent block
    row("resent-from", "Resent-From", Address),
    row("resent-sender", "Resent-Sender", Address),
    row("resent-to", "Resent-To", LIST),
    row("resent-cc", "Resent-Cc", LIST),
    row("resent-bcc", "Resent-Bcc", LIST),
    row("resent-reply-to", "Resent-Reply-To", LIST),
    row("resent-date", "Resent-Date", Date),
    row("resent-message-id", "Resent-Message-Id", MessageId),
    // Dates
    row("date", "Date", Date),
    row("delivery-date", "Delivery-Date", Date),
    row("expires", "Expires", Date),
    row("expiry-date", "Expiry-Date", Date),
    row("reply-by", "Reply-By", Date),
    row("nntp-posting-date", "NNTP-Posting-Date", Date),
    row("x-original-date", "X-Original-Date", Date),
    row("x-original-arrival-time", "X-Original-Arrival-Time", Raw),
    // Threading
    row("subject", "Subject", Subject),
    row("message-id", "Message-Id", MessageId),
    row("in-reply-to", "In-Reply-To", MessageId),
    row("references", "References", References),
    row("supersedes", "Supersedes", MessageId),
    row("original-message-id", "Original-Message-Id", MessageId),
    row("x-message-id", "X-Message-Id", MessageId),
    row("thread-topic", "Thread-Topic", Encoded),
    row("thread-index", "Thread-Index", Raw),
    row("keywords", "Keywords", Encoded),
    row("comments", "Comments", Encoded),
    row("summary", "Summary", Encoded),
    // MIME
    row("mime-version", "MIME-Version", Raw),
    row("content-type", "Content-Type", ContentType),
    row("content-transfer-encoding", "Content-Transfer-Encoding", TransferEncoding),
    row("content-disposition", "Content-Disposition", Disposition),
    row("content-id", "Content-Id", MessageId),
    row("content-description", "Content-Description", Encoded),
    row("content-language", "Content-Language", Raw),
    row("content-length", "Content-Length", Raw),
    row("content-class", "Content-Class", Raw),
    row("content-location", "Content-Location", Raw),
    row("content-base", "Content-Base", Raw),
    row("content-md5", "Content-MD5", Raw),
    row("content-features", "Content-Features", Raw),
    row("content-return", "Content-Return", Raw),
    row("content-identifier", "Content-Identifier", Raw),
    row("encoding", "Encoding", Raw),
    row("lines", "Lines", Raw),
    row("accept-language", "Accept-Language", Raw),
    // Misspelled by some Microsoft clients
    row("acceptlanguage", "Accept-Language", Ignored),
    // Trace
    row("received", "Received", Received),
    row("x-received", "X-Received", Raw),
    row("received-spf", "Received-SPF", Raw),
    row("x-originating-ip", "X-Originating-IP", Raw),
    row("x-originating-email", "X-Originating-Email", Address),
    row("x-source-ip", "X-Source-IP", Raw),
    row("path", "Path", Raw),
    row("xref", "Xref", Raw),
    row("nntp-posting-host", "NNTP-Posting-Host", Raw),
    // Authentication and anti-spam
    row("authentication-results", "Authentication-Results", Raw),
    row("arc-authentication-results", "ARC-Authentication-Results", Raw),
    row("arc-message-signature", "ARC-Message-Signature", Raw),
    row("arc-seal", "ARC-Seal", Raw),
    row("dkim-signature", "DKIM-Signature", Raw),
    row("domainkey-signature", "DomainKey-Signature", Raw),
    row("x-google-dkim-signature", "X-Google-DKIM-Signature", Raw),
    row("x-spam-status", "X-Spam-Status", Raw),
    row("x-spam-score", "X-Spam-Score", Raw),
    row("x-spam-level", "X-Spam-Level", Raw),
    row("x-spam-flag", "X-Spam-Flag", Raw),
    row("x-spam-checker-version", "X-Spam-Checker-Version", Raw),
    row("x-spam-report", "X-Spam-Report", Raw),
    row("x-virus-scanned", "X-Virus-Scanned", Raw),
    row("x-virus-status", "X-Virus-Status", Raw),
    row("x-barracuda-spam-score", "X-Barracuda-Spam-Score", Raw),
    // Mailing lists
    row("list-id", "List-Id", Encoded),
    row("list-unsubscribe", "List-Unsubscribe", Raw),
    row("list-unsubscribe-post", "List-Unsubscribe-Post", Raw),
    row("list-subscribe", "List-Subscribe", Raw),
    row("list-post", "List-Post", Raw),
    row("list-help", "List-Help", Raw),
    row("list-owner", "List-Owner", Raw),
    row("list-archive", "List-Archive", Raw),
    row("list-software", "List-Software", Raw),
    row("mailing-list", "Mailing-List", Raw),
    row("precedence", "Precedence", Raw),
    row("x-mailing-list", "X-Mailing-List", Raw),
    row("x-beenthere", "X-BeenThere", Raw),
    row("x-loop", "X-Loop", Raw),
    row("auto-submitted", "Auto-Submitted", Raw),
    row("x-auto-response-suppress", "X-Auto-Response-Suppress", Raw),
    // Usenet
    row("newsgroups", "Newsgroups", Raw),
    row("followup-to", "Followup-To", Raw),
    row("approved", "Approved", Raw),
    row("x-trace", "X-Trace", Raw),
    row("x-complaints-to", "X-Complaints-To", Raw),
    // Client and priority
    row("organization", "Organization", Encoded),
    row("organisation", "Organization", Encoded),
    row("user-agent", "User-Agent", Raw),
    row("x-mailer", "X-Mailer", Raw),
    row("x-newsreader", "X-Newsreader", Raw),
    row("x-mimeole", "X-MimeOLE", Raw),
    row("importance", "Importance", Raw),
    row("priority", "Priority", Raw),
    row("x-priority", "X-Priority", Raw),
    row("x-msmail-priority", "X-MSMail-Priority", Raw),
    row("sensitivity", "Sensitivity", Raw),
    row("autocrypt", "Autocrypt", Raw),
    row("openpgp", "OpenPGP", Raw),
    row("face", "Face", Raw),
    row("x-face", "X-Face", Raw),
    row("x-url", "X-URL", Raw),
    row("x-ms-has-attach", "X-MS-Has-Attach", Raw),
    row("x-ms-tnef-correlator", "X-MS-TNEF-Correlator", Raw),
    row("x-ms-exchange-organization-scl", "X-MS-Exchange-Organization-SCL", Raw),
    // Local mailbox state
    row("status", "Status", Raw),
    row("x-status", "X-Status", Raw),
    row("x-keywords", "X-Keywords", Raw),
    row("x-uid", "X-UID", Raw),
    row("x-uidl", "X-UIDL", Raw),
    row("x-mozilla-status", "X-Mozilla-Status", Raw),
    row("x-mozilla-status2", "X-Mozilla-Status2", Raw),
    row("x-mozilla-keys", "X-Mozilla-Keys", Raw),
    row("x-account-key", "X-Account-Key", Raw),
    row("x-identity-key", "X-Identity-Key", Raw),
    row("x-gmail-labels", "X-Gmail-Labels", Encoded),
    row("x-gm-thrid", "X-GM-THRID", Raw),
    row("x-apple-mail-remote-attachments", "X-Apple-Mail-Remote-Attachments", Raw),
    row("x-uniform-type-identifier", "X-Uniform-Type-Identifier", Raw),
];

/// Result of looking up a header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Known(&'static FieldSpec),
    /// Unlisted `x-*` tags and known misspellings: dropped without a warning.
    Silent,
    Unknown,
}

/// Find the handler for a lowercase tag.
pub fn lookup(tag: &str) -> Lookup {
    match FIELDS.iter().find(|spec| spec.tag == tag) {
        Some(spec) if spec.kind == Ignored => Lookup::Silent,
        Some(spec) => Lookup::Known(spec),
        None if tag.starts_with("x-") => Lookup::Silent,
        None => Lookup::Unknown,
    }
}

/// Kind of the field stored under canonical `name` in the field map.
pub fn kind_of(name: &str) -> Option<FieldKind> {
    FIELDS.iter().find(|spec| spec.name == name).map(|spec| spec.kind)
}

impl PartialEq for FieldSpec {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for FieldSpec {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_are_unique_and_lowercase() {
        let mut seen = HashSet::new();
        for spec in FIELDS {
            assert_eq!(spec.tag, spec.tag.to_lowercase());
            assert!(seen.insert(spec.tag), "duplicate tag {}", spec.tag);
        }
        assert!(FIELDS.len() >= 150);
    }

    #[test]
    fn test_lookup() {
        match lookup("from") {
            Lookup::Known(spec) => {
                assert_eq!(spec.name, "From");
                assert_eq!(spec.kind, Address);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(lookup("x-mailer"), Lookup::Known(_)));
        assert_eq!(lookup("x-custom-trace"), Lookup::Silent);
        assert_eq!(lookup("acceptlanguage"), Lookup::Silent);
        assert_eq!(lookup("unknown-field"), Lookup::Unknown);
    }

    #[test]
    fn test_recipient_lists() {
        for (tag, list) in [
            ("to", Recipients::To),
            ("cc", Recipients::Cc),
            ("bcc", Recipients::Bcc),
        ] {
            let Lookup::Known(spec) = lookup(tag) else {
                panic!("{tag} not known");
            };
            assert_eq!(spec.kind, AddressList(Some(list)));
        }
    }

    #[test]
    fn test_kind_of_canonical_name() {
        assert_eq!(kind_of("From"), Some(Address));
        assert_eq!(kind_of("Organization"), Some(Encoded));
        assert_eq!(kind_of("Cc"), Some(AddressList(Some(Recipients::Cc))));
        assert_eq!(kind_of("from"), None);
        assert_eq!(kind_of("Unknown-Field"), None);
    }
}
