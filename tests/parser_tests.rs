//! Integration tests for the importers, header normalization and the
//! canonical document.

use std::path::Path;

use mailsift::config::ParserConfig;
use mailsift::model::message::{Message, Recipients};
use mailsift::parser::address::parse_address;
use mailsift::parser::date::parse_date;
use mailsift::parser::emlx::import_per_message_file_archive;
use mailsift::parser::mbox::import_mailbox_archive;
use mailsift::{import_single, parse_text};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn simple_mbox() -> Vec<Message> {
    import_mailbox_archive(fixture("simple.mbox"), &ParserConfig::default())
        .unwrap()
        .collect()
}

fn assert_part_tree(message: &Message) {
    let parts = message.parts();
    for i in 0..parts.len() {
        match parts.parent_of(i) {
            None => assert_eq!(i, 0, "only the root has no parent"),
            Some(parent) => {
                let hits = parts.children_of(parent).iter().filter(|&&c| c == i).count();
                assert_eq!(hits, 1, "part {i} appears once under {parent}");
            }
        }
    }
}

// ─── MBOX ───────────────────────────────────────────────────────────

#[test]
fn test_simple_mbox_count() {
    let messages = simple_mbox();
    assert_eq!(messages.len(), 5, "simple.mbox should contain exactly 5 messages");
}

#[test]
fn test_simple_mbox_first_message() {
    let messages = simple_mbox();
    let first = &messages[0];
    assert!(!first.has_error(), "{:?}", first.error());
    assert_eq!(first.subject(), Some("Hello World"));
    assert_eq!(first.field_value("From", "email"), Some("user1@example.com"));
    assert_eq!(first.field_value("From", "full name"), Some("User One"));
    assert_eq!(first.field_value("Message-Id", "id"), Some("msg001@example.com"));
    assert_eq!(first.part_content(0), Some(&b"Hello from the first message."[..]));
    assert_eq!(first.source().line, 2);
}

#[test]
fn test_reply_with_lists_and_references() {
    let messages = simple_mbox();
    let reply = &messages[1];
    assert!(!reply.has_error(), "{:?}", reply.error());

    let from = reply.field("From").unwrap();
    assert_eq!(from.get("last name").map(String::as_str), Some("Doe"));
    assert_eq!(from.get("first name").map(String::as_str), Some("John"));

    assert_eq!(reply.to_count(), 2);
    assert_eq!(reply.to(1).unwrap().email.as_deref(), Some("ann@example.com"));
    assert_eq!(reply.cc_count(), 1);
    assert_eq!(reply.bcc_count(), 0);

    assert_eq!(reply.reference_count(), 2);
    assert_eq!(
        reply.reference(1).and_then(|r| r.get("id")).map(String::as_str),
        Some("msg001@example.com")
    );
    assert_eq!(reply.field_value("Subject", "topic"), Some("Hello World"));

    let body = reply.part(0).unwrap().text();
    assert!(body.ends_with(">From the archive's point of view this is body text."));
}

#[test]
fn test_encoded_words_and_quoted_printable() {
    let messages = simple_mbox();
    let third = &messages[2];
    assert!(!third.has_error(), "{:?}", third.error());
    assert_eq!(third.field_value("From", "full name"), Some("José García"));
    assert_eq!(third.subject(), Some("Café con leche"));
    assert_eq!(third.part(0).unwrap().text(), "Un café, por favor.");
    assert_eq!(third.field_value("Date", "time UTC"), Some("08:15:00"));
}

#[test]
fn test_attachment_message() {
    let messages = simple_mbox();
    let fourth = &messages[3];
    assert!(!fourth.has_error(), "{:?}", fourth.error());
    assert_eq!(fourth.part_count(), 3);
    assert_eq!(fourth.part_type(0), Some("multipart/mixed"));
    assert_eq!(fourth.part_children(0), &[1, 2]);
    assert_eq!(fourth.part_type(2), Some("application/pdf"));
    assert_eq!(fourth.part_content(2), Some(&b"%PDF-1.4 fake"[..]));
    let pdf = fourth.part(2).unwrap();
    assert_eq!(pdf.attributes.get("filename").map(String::as_str), Some("report.pdf"));
    assert_part_tree(fourth);
}

#[test]
fn test_missing_date_is_isolated() {
    let messages = simple_mbox();
    let fifth = &messages[4];
    assert!(fifth.has_error());
    assert!(fifth.error().unwrap().contains("Date"));
    // Silent x- field, warned unknown field
    assert!(!fifth.has_field("X-Custom-Trace"));
    assert!(fifth
        .warnings()
        .iter()
        .any(|w| w.message.contains("unknown-field")));
    // Synthesized recipients
    assert_eq!(fifth.to_count(), 1);
    assert_eq!(
        fifth.recipients(Recipients::To)[0].full_name.as_deref(),
        Some("Undisclosed recipients")
    );
    // Siblings are unaffected
    assert!(messages[..4].iter().all(|m| !m.has_error()));
}

#[test]
fn test_mbox_missing_file() {
    let result = import_mailbox_archive("/nonexistent/archive.mbox", &ParserConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_mbox_crlf_and_bom() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crlf.mbox");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(
        b"From a@x.org Tue Jan 10 19:28:58 2017\r\nFrom: a@x.org\r\nDate: Tue, 10 Jan 2017 19:28:58 +0100\r\nSubject: crlf\r\n\r\nline one\r\nline two\r\n",
    );
    std::fs::write(&path, bytes).unwrap();
    let messages: Vec<Message> = import_mailbox_archive(&path, &ParserConfig::default())
        .unwrap()
        .collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject(), Some("crlf"));
    assert_eq!(messages[0].part_content(0), Some(&b"line one\nline two"[..]));
}

#[test]
fn test_mbox_mixed_encodings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.mbox");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        "From a@x.org Tue Jan 10 19:28:58 2017\nFrom: a@x.org\nDate: Tue, 10 Jan 2017 19:28:58 +0100\nSubject: utf8\n\nCafé\n\n"
            .as_bytes(),
    );
    bytes.extend_from_slice(
        b"From b@x.org Tue Jan 10 19:30:00 2017\nFrom: b@x.org\nDate: Tue, 10 Jan 2017 19:30:00 +0100\nSubject: latin1\n\nCaf\xe9\n",
    );
    std::fs::write(&path, bytes).unwrap();

    let messages: Vec<Message> = import_mailbox_archive(&path, &ParserConfig::default())
        .unwrap()
        .collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].part(0).unwrap().text(), "Café");
    assert_eq!(messages[1].part(0).unwrap().text(), "Café");
}

// ─── Single files ───────────────────────────────────────────────────

#[test]
fn test_multipart_eml() {
    let message = import_single(fixture("multipart.eml"), &ParserConfig::default());
    assert!(!message.has_error(), "{:?}", message.error());
    assert_eq!(message.part_count(), 5);
    assert_eq!(message.part_type(1), Some("multipart/alternative"));
    assert_eq!(message.part_children(1), &[2, 3]);
    assert_eq!(message.part(2).unwrap().text(), "Hola mundo");
    assert_eq!(message.part(3).unwrap().text(), "<p>Hola <b>mundo</b></p>");
    assert_eq!(
        message.part(4).unwrap().attributes.get("size").map(String::as_str),
        Some("13")
    );
    assert_eq!(message.field_value("Subject", "topic"), Some("Quarterly numbers"));
    assert_part_tree(&message);
}

#[test]
fn test_received_decomposition() {
    let message = import_single(fixture("multipart.eml"), &ParserConfig::default());
    assert_eq!(message.received_count(), 1);
    let received = message.received(0).unwrap();
    assert_eq!(received.get("from").map(String::as_str), Some("mail.example.org"));
    assert_eq!(received.get("by").map(String::as_str), Some("mx.example.com"));
    assert_eq!(received.get("id").map(String::as_str), Some("4F2A1B"));
    assert_eq!(received.get("time UTC").map(String::as_str), Some("18:28:58"));
}

#[test]
fn test_single_missing_file() {
    let message = import_single(fixture("does-not-exist.eml"), &ParserConfig::default());
    assert!(message.has_error());
    assert_eq!(message.part_count(), 0);
}

// ─── EMLX ───────────────────────────────────────────────────────────

#[test]
fn test_emlx_trailer_is_skipped() {
    let messages: Vec<Message> =
        import_per_message_file_archive(fixture("message.emlx"), &ParserConfig::default())
            .unwrap()
            .collect();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert!(!message.has_error(), "{:?}", message.error());
    assert_eq!(message.subject(), Some("Sent from Mail"));
    assert_eq!(message.part(0).unwrap().text(), "Body of an Apple Mail message.");
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn test_scenario_date() {
    let date = parse_date("Tue, 10 Jan 2017 19:28:58 +0100").unwrap();
    assert_eq!(date.date, "2017-01-10");
    assert_eq!(date.time, "19:28:58");
    assert_eq!(date.timezone.as_deref(), Some("+0100"));
    assert_eq!(date.date_utc, "2017-01-10");
    assert_eq!(date.time_utc, "18:28:58");
}

#[test]
fn test_date_canonical_reparse() {
    for text in [
        "Tue, 10 Jan 2017 19:28:58 +0100",
        "10 Jan 2017 23:59:00 -0800",
        "Mon, 1 Jan 24 00:30:00 GMT",
        "2017-01-10 19:28:58",
    ] {
        let first = parse_date(text).unwrap();
        let again = parse_date(&first.canonical()).unwrap();
        assert_eq!(
            (&first.date_utc, &first.time_utc),
            (&again.date_utc, &again.time_utc),
            "{text}"
        );
    }
}

#[test]
fn test_scenario_address() {
    let record = parse_address("\"Doe, John\" <john.doe@foo.com>").unwrap();
    assert_eq!(record.last_name.as_deref(), Some("Doe"));
    assert_eq!(record.first_name.as_deref(), Some("John"));
    assert_eq!(record.full_name.as_deref(), Some("John Doe"));
    assert_eq!(record.email.as_deref(), Some("john.doe@foo.com"));
}

#[test]
fn test_address_parsing_never_panics() {
    for text in ["", "<>", "@@@", "\"unterminated", "a <b", ",,,", "<<x@y>>", "(only comment)"] {
        if let Ok(record) = parse_address(text) {
            let _ = record.display();
        }
    }
}

#[test]
fn test_scenario_missing_from() {
    let message = parse_text(
        "scenario.eml",
        "Date: Tue, 10 Jan 2017 19:28:58 +0100\nSubject: anonymous\n\nbody\n",
        &ParserConfig::default(),
    );
    assert!(message.has_error());
    assert!(message.error().unwrap().contains("header section"));
    assert!(!message.has_field("From"));
}

// ─── Canonical document ─────────────────────────────────────────────

#[test]
fn test_document_escapes_metacharacters() {
    let message = parse_text(
        "doc.eml",
        "From: Tom & Jerry <tj@example.com>\nTo: someone@example.com\nDate: Tue, 10 Jan 2017 19:28:58 +0100\nSubject: a < b > c\n\nplain body\n",
        &ParserConfig::default(),
    );
    let doc = message.to_canonical_document().unwrap();
    assert!(doc.contains("someone@example.com"));
    assert!(doc.contains("a &lt; b &gt; c"));
    assert!(doc.contains("Tom &amp; Jerry"));
    assert!(doc.contains("plain body"));
}

#[test]
fn test_document_for_every_fixture_message() {
    for message in simple_mbox() {
        let doc = message.to_canonical_document().unwrap();
        assert!(doc.contains("<header>"));
        assert!(doc.contains("<body>"));
    }
}
