//! Encoded-word decoding (RFC 2047) for header values.

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use tracing::debug;

use super::transfer::{decode_charset, LENIENT_BASE64};

/// Charsets an encoded word may name. Anything else is left untouched.
const ENCODED_WORD_CHARSETS: &[&str] = &[
    "us-ascii",
    "iso-8859-1",
    "iso-8859-2",
    "iso-8859-15",
    "utf-8",
    "windows-1252",
];

/// Upper bound on re-scan passes over one value.
const MAX_PASSES: usize = 8;

static ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?([A-Za-z0-9_\-]+)(?:\*[A-Za-z\-]+)?\?([BbQq])\?([^?\s]*)\?=")
        .expect("valid regex")
});

/// Whitespace between two adjacent encoded words is not part of the text.
static ADJACENT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?=[ \t]+=\?").expect("valid regex"));

static BARE_BASE64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("valid regex"));

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Words in an unsupported charset or encoding are left as they are. A value
/// made only of base64 characters is decoded once if the result is UTF-8.
pub fn decode(input: &str) -> String {
    if let Some(decoded) = decode_bare_base64(input) {
        return decoded;
    }

    let collapsed = ADJACENT_WORDS.replace_all(input, "?==?");
    let mut text = collapsed.to_string();
    for _ in 0..MAX_PASSES {
        let next = decode_pass(&text);
        if next == text {
            break;
        }
        text = next;
    }
    if text == collapsed {
        // Nothing decoded: keep the original spacing
        return input.to_string();
    }
    text
}

/// One left-to-right substitution of every decodable encoded word.
fn decode_pass(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ENCODED_WORD.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let charset = &caps[1];
        let encoding = &caps[2];
        let payload = &caps[3];
        if let Some(decoded) = decode_word(charset, encoding, payload) {
            out.push_str(&text[last..whole.start()]);
            out.push_str(&decoded);
            last = whole.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

fn decode_word(charset: &str, encoding: &str, payload: &str) -> Option<String> {
    let charset = charset.to_ascii_lowercase();
    if !ENCODED_WORD_CHARSETS.contains(&charset.as_str()) {
        debug!(charset = %charset, "Leaving encoded word in unsupported charset");
        return None;
    }
    let bytes = match encoding {
        "B" | "b" => LENIENT_BASE64.decode(payload).ok()?,
        "Q" | "q" => decode_q_encoding(payload),
        _ => return None,
    };
    Some(decode_charset(&charset, &bytes))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
pub fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => match hex_byte(bytes.get(i + 1..i + 3)) {
                Some(byte) => {
                    result.push(byte);
                    i += 3;
                }
                None => {
                    result.push(b'=');
                    i += 1;
                }
            },
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Parse two ASCII hex digits.
pub(crate) fn hex_byte(pair: Option<&[u8]>) -> Option<u8> {
    let pair = pair?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let s = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(s, 16).ok()
}

/// Opportunistic decode of a value that is nothing but base64.
fn decode_bare_base64(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() < 4 || trimmed.len() % 4 != 0 || !BARE_BASE64.is_match(trimmed) {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(trimmed)
        .ok()?;
    String::from_utf8(bytes).ok()
}
