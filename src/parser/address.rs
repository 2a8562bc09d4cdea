//! Address and address-list parsing.
//!
//! A fixed sequence of grammars is tried in order and the first match wins:
//!
//! 1. `user@example.com`
//! 2. `<user@example.com>`
//! 3. `Jane Doe <user@example.com>`
//! 4. `"Doe, Jane" <user@example.com>`
//! 5. `"Jane Doe" <user@example.com>`
//! 6. `Jane Doe user@example.com`
//! 7. `user@example.com (Jane Doe)`
//! 8. `jane (Jane Doe)`, local mail without a domain
//! 9. `"Jane Doe"`, a name with no address

use std::sync::LazyLock;

use regex::Regex;

use super::encoded_word;
use super::tables::suppressed_phrase;
use crate::error::FieldError;
use crate::model::address::AddressRecord;

const ADDR: &str = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~.\-]+@[A-Za-z0-9.\-_\[\]:]+";

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^{}$", pattern.replace("ADDR", ADDR))).expect("valid regex")
}

static BARE: LazyLock<Regex> = LazyLock::new(|| anchored(r"(ADDR)"));
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| anchored(r"<\s*(ADDR)\s*>"));
static NAME_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| anchored(r#"([^"<>\s][^"<>]*?)\s*<\s*(ADDR)\s*>"#));
static LAST_FIRST_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| anchored(r#""\s*([^",]+?)\s*,\s*([^",]+?)\s*"\s*<\s*(ADDR)\s*>"#));
static QUOTED_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| anchored(r#""([^"]*)"\s*<\s*(ADDR)\s*>"#));
static NAME_BARE: LazyLock<Regex> = LazyLock::new(|| anchored(r"([^<>()@]+?)\s+(ADDR)"));
static ADDR_COMMENT: LazyLock<Regex> = LazyLock::new(|| anchored(r"(ADDR)\s*\(([^()]*)\)"));
static LOCAL_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| anchored(r"([A-Za-z0-9._\-]+)\s*\(([^()]*)\)"));
static QUOTED_ONLY: LazyLock<Regex> = LazyLock::new(|| anchored(r#""([^"]+)""#));

/// Prefixes consumed by [`parse_address_list`], tried in this order.
static LIST_QUOTED_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"[^"]*"\s*<[^<>]*>"#).expect("valid regex"));
static LIST_UNQUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^",]+"#).expect("valid regex"));
static LIST_QUOTED_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"[^"]*""#).expect("valid regex"));

/// Parse a single address.
///
/// Encoded words are decoded first. The null reverse path `<>` yields an
/// empty record. When no grammar matches, a suppressed-recipient phrase such
/// as `undisclosed-recipients:;` yields a name-only record; anything else is
/// an error and the caller keeps an empty record.
pub fn parse_address(text: &str) -> Result<AddressRecord, FieldError> {
    let decoded = encoded_word::decode(text.trim());
    let s = decoded.trim();

    if s == "<>" || s.is_empty() {
        return Ok(AddressRecord::default());
    }
    if let Some(c) = BARE.captures(s) {
        return Ok(AddressRecord::with_email(&c[1]));
    }
    if let Some(c) = BRACKETED.captures(s) {
        return Ok(AddressRecord::with_email(&c[1]));
    }
    if let Some(c) = NAME_BRACKETED.captures(s) {
        return Ok(named(&c[1], &c[2]));
    }
    if let Some(c) = LAST_FIRST_BRACKETED.captures(s) {
        let last = c[1].to_string();
        let first = c[2].to_string();
        return Ok(AddressRecord {
            email: Some(c[3].to_string()),
            full_name: Some(format!("{first} {last}")),
            first_name: Some(first),
            last_name: Some(last),
        });
    }
    if let Some(c) = QUOTED_BRACKETED.captures(s) {
        return Ok(named(&c[1], &c[2]));
    }
    if let Some(c) = NAME_BARE.captures(s) {
        return Ok(named(&c[1], &c[2]));
    }
    if let Some(c) = ADDR_COMMENT.captures(s) {
        return Ok(named(&c[2], &c[1]));
    }
    if let Some(c) = LOCAL_COMMENT.captures(s) {
        return Ok(named(&c[2], &format!("{}@localhost", &c[1])));
    }
    if let Some(c) = QUOTED_ONLY.captures(s) {
        return Ok(AddressRecord::with_name(c[1].trim()));
    }
    if suppressed_phrase(s).is_some() {
        let name = s.trim_end_matches([':', ';', ' ']).trim_matches('"');
        return Ok(AddressRecord::with_name(name));
    }
    Err(FieldError::Address(text.trim().to_string()))
}

/// Build a record from a display name and an email; a blank name is dropped.
fn named(name: &str, email: &str) -> AddressRecord {
    let name = name.trim().trim_matches(['"', '\'']).trim();
    let mut record = AddressRecord::with_email(email);
    if !name.is_empty() {
        record.full_name = Some(name.to_string());
    }
    record
}

/// Split a comma-separated address list and parse each entry.
///
/// Quoted names may contain commas, so each step consumes the longest
/// recognizable prefix: a quoted name followed by a bracketed address, then
/// an unquoted run up to the next comma, then a quoted name on its own. If
/// none of these match the whole list fails. Entries that fail on their own
/// are returned as errors in place.
pub fn parse_address_list(
    text: &str,
) -> Result<Vec<Result<AddressRecord, FieldError>>, FieldError> {
    let mut items = Vec::new();
    let mut rest = text.trim();
    loop {
        rest = rest.trim_start_matches([',', ' ', '\t']);
        if rest.is_empty() {
            break;
        }
        let prefix = [&*LIST_QUOTED_BRACKETED, &*LIST_UNQUOTED, &*LIST_QUOTED_ONLY]
            .iter()
            .find_map(|re| re.find(rest))
            .ok_or_else(|| FieldError::AddressList(text.trim().to_string()))?;
        let (item, tail) = rest.split_at(prefix.end());
        // A quoted prefix must end the entry
        let tail_trimmed = tail.trim_start();
        if !tail_trimmed.is_empty() && !tail_trimmed.starts_with(',') {
            // e.g. `"Jane" jane@x.org`: take the entry up to the next comma
            let end = tail.find(',').unwrap_or(tail.len());
            let full = &rest[..prefix.end() + end];
            items.push(parse_address(full));
            rest = &rest[prefix.end() + end..];
            continue;
        }
        items.push(parse_address(item));
        rest = tail;
    }
    Ok(items)
}
