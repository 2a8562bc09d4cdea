//! Content-Transfer-Encoding and charset decoding of part bodies.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

use super::encoded_word::hex_byte;
use super::tables::TRANSCODED_CHARSETS;
use crate::error::FieldError;

/// Base64 engine that accepts missing padding and stray trailing bits.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Supported transfer encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parse a Content-Transfer-Encoding value (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        match value.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "" | "7bit" | "7-bit" => Ok(Self::SevenBit),
            "8bit" | "8-bit" => Ok(Self::EightBit),
            "binary" => Ok(Self::Binary),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            other => Err(FieldError::TransferEncoding(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
        }
    }
}

/// Decode the body lines of one part.
///
/// Base64 and quoted-printable payloads of textual parts are transcoded from
/// `charset` to UTF-8 when the charset is one of the transcoded set. Other
/// bodies are already native text and are stored as UTF-8 bytes. A decoding
/// failure keeps the raw text and reports the problem.
pub fn decode_body(
    lines: &[String],
    encoding: TransferEncoding,
    charset: Option<&str>,
    textual: bool,
) -> (Vec<u8>, Option<FieldError>) {
    let (bytes, issue) = match encoding {
        TransferEncoding::Base64 => match decode_base64_lines(lines) {
            Ok(bytes) => (bytes, None),
            Err(reason) => (
                lines.join("\n").into_bytes(),
                Some(FieldError::Decode {
                    encoding: "base64",
                    reason,
                }),
            ),
        },
        TransferEncoding::QuotedPrintable => (decode_quoted_printable(lines), None),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            return (lines.join("\n").into_bytes(), None);
        }
    };

    if issue.is_some() || !textual {
        return (bytes, issue);
    }
    match charset {
        Some(cs) if TRANSCODED_CHARSETS.contains(&cs) => (decode_charset(cs, &bytes).into_bytes(), None),
        _ => (bytes, None),
    }
}

/// Base64-decode body lines, ignoring whitespace and anything after the padding.
fn decode_base64_lines(lines: &[String]) -> Result<Vec<u8>, String> {
    let mut joined = String::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        joined.push_str(line);
        if line.ends_with('=') {
            break;
        }
    }
    joined.retain(|c| !c.is_whitespace());
    LENIENT_BASE64.decode(joined.as_bytes()).map_err(|e| e.to_string())
}

/// Decode quoted-printable body lines; `=` at the end of a line is a soft break.
pub fn decode_quoted_printable(lines: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for (n, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches([' ', '\t']);
        let (content, soft_break) = match line.strip_suffix('=') {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        let bytes = content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'=' {
                if let Some(byte) = hex_byte(bytes.get(i + 1..i + 3)) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        if !soft_break && n + 1 < lines.len() {
            out.push(b'\n');
        }
    }
    out
}

/// Decode bytes using a named charset.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let charset_lower = charset.to_lowercase();
    match charset_lower.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(
                    charset = charset,
                    "Unknown charset, falling back to UTF-8 lossy"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}
