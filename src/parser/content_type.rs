//! Content-Type and Content-Disposition values.

use std::collections::BTreeMap;

use super::encoded_word;
use super::tables::canonical_charset;
use super::transfer::decode_charset;
use crate::error::FieldError;

/// A parsed Content-Type value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`. Empty when the value had none.
    pub mime_type: String,
    /// Recognized parameters, lowercase names.
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary")
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }
}

const REPORT_TYPES: &[&str] = &[
    "delivery-status",
    "disposition-notification",
    "feedback-report",
    "multi-recipient-report",
];
const REPLY_TYPES: &[&str] = &["original", "response"];

/// Parse a message-level Content-Type.
///
/// Parameters are stripped in a fixed order, each with its own validation:
/// `boundary`, `report-type`, `reply-type`, `protocol`, `micalg`, `method`,
/// `delsp`, `x-mac-type`, `x-mac-creator`, `x-action`, `x-unix-mode`,
/// `charset`, `format`, `name` and finally `type`, which is discarded.
/// Invalid values and anything left over are reported; leftovers are kept
/// under `residual`.
pub fn parse_header_content_type(value: &str) -> (ContentType, Vec<FieldError>) {
    let mut issues = Vec::new();
    let (mime_type, rest) = split_type(value);
    let mut ct = ContentType {
        mime_type,
        params: BTreeMap::new(),
    };
    if ct.mime_type.is_empty() || !ct.mime_type.contains('/') {
        issues.push(FieldError::ContentType(value.trim().to_string()));
    }

    let (mut params, mut residual) = split_params(rest);
    let mut take = |name: &str| -> Option<String> {
        let at = params.iter().position(|(k, _)| k == name)?;
        Some(params.remove(at).1)
    };

    if let Some(boundary) = take("boundary") {
        ct.params.insert("boundary".into(), boundary);
    }
    if let Some(v) = take("report-type") {
        check(&mut ct, &mut issues, "report-type", v, |v| REPORT_TYPES.contains(&v));
    }
    if let Some(v) = take("reply-type") {
        check(&mut ct, &mut issues, "reply-type", v, |v| REPLY_TYPES.contains(&v));
    }
    for name in ["protocol", "micalg"] {
        if let Some(v) = take(name) {
            ct.params.insert(name.into(), v.to_ascii_lowercase());
        }
    }
    if let Some(v) = take("method") {
        check(&mut ct, &mut issues, "method", v, |v| v == "cancel");
    }
    if let Some(v) = take("delsp") {
        check(&mut ct, &mut issues, "delsp", v, |v| v == "yes" || v == "no");
    }
    for name in ["x-mac-type", "x-mac-creator", "x-action", "x-unix-mode"] {
        if let Some(v) = take(name) {
            ct.params.insert(name.into(), v);
        }
    }
    if let Some(v) = take("charset") {
        match canonical_charset(&v) {
            Some(cs) => {
                ct.params.insert("charset".into(), cs.to_string());
            }
            None => issues.push(FieldError::ParamValue {
                param: "charset",
                value: v,
            }),
        }
    }
    if let Some(v) = take("format") {
        ct.params.insert("format".into(), v.to_ascii_lowercase());
    }
    if let Some(v) = take("name") {
        ct.params.insert("name".into(), encoded_word::decode(&v));
    }
    // Redundant with the type itself
    let _ = take("type");

    for (k, v) in params {
        residual.push(format!("{k}={v}"));
    }
    if !residual.is_empty() {
        let text = residual.join("; ");
        issues.push(FieldError::Residual(text.clone()));
        ct.params.insert("residual".into(), text);
    }
    (ct, issues)
}

/// Store a lowercased parameter value when `valid`, report it otherwise.
fn check(
    ct: &mut ContentType,
    issues: &mut Vec<FieldError>,
    param: &'static str,
    value: String,
    valid: impl Fn(&str) -> bool,
) {
    let lower = value.to_ascii_lowercase();
    if valid(&lower) {
        ct.params.insert(param.into(), lower);
    } else {
        issues.push(FieldError::ParamValue { param, value });
    }
}

/// Parse a part-level Content-Type: every parameter is kept, nothing is reported.
pub fn parse_part_content_type(value: &str) -> ContentType {
    let (mime_type, rest) = split_type(value);
    let (params, _) = split_params(rest);
    let mut ct = ContentType {
        mime_type,
        params: BTreeMap::new(),
    };
    for (k, v) in params {
        let v = match k.as_str() {
            "charset" => canonical_charset(&v)
                .map(str::to_string)
                .unwrap_or_else(|| v.to_ascii_lowercase()),
            "name" => encoded_word::decode(&v),
            _ => v,
        };
        ct.params.entry(k).or_insert(v);
    }
    ct
}

/// Parse a Content-Disposition value into `disposition`, `filename`,
/// `creation-date`, `modification-date` and `size`. Other parameters are dropped.
pub fn parse_disposition(value: &str) -> BTreeMap<String, String> {
    let (disposition, rest) = match value.split_once(';') {
        Some((d, rest)) => (d, rest),
        None => (value, ""),
    };
    let mut out = BTreeMap::new();
    let disposition = disposition.trim().to_ascii_lowercase();
    if !disposition.is_empty() {
        out.insert("disposition".to_string(), disposition);
    }
    let (params, _) = split_params(rest);
    for (k, v) in params {
        let v = match k.as_str() {
            "filename" => encoded_word::decode(&v),
            "creation-date" | "modification-date" | "size" => v,
            _ => continue,
        };
        out.entry(k).or_insert(v);
    }
    out
}

/// Lowercased `type/subtype` and the parameter text after it.
fn split_type(value: &str) -> (String, &str) {
    let (head, rest) = match value.split_once(';') {
        Some((head, rest)) => (head, rest),
        None => (value, ""),
    };
    let mut mime_type = head.trim().trim_matches('"').to_ascii_lowercase();
    if mime_type == "multipart/alternate" {
        mime_type = "multipart/alternative".to_string();
    }
    (mime_type, rest)
}

/// Split `; a=b; c="d;e"` into ordered pairs with lowercase names.
///
/// RFC 2231 continuations (`name*0=`, `name*1=`) are joined and extended
/// values (`name*=utf-8''caf%C3%A9`) are decoded. Segments that are not
/// `name=value` come back as residue.
fn split_params(text: &str) -> (Vec<(String, String)>, Vec<String>) {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut residue = Vec::new();
    // base name → (index in pairs, charset of the first extended piece)
    let mut continued: BTreeMap<String, (usize, Option<String>)> = BTreeMap::new();

    for segment in split_unquoted(text, ';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((name, raw_value)) = segment.split_once('=') else {
            residue.push(segment.to_string());
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let raw_value = raw_value.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            residue.push(segment.to_string());
            continue;
        }

        let extended = name.ends_with('*');
        let bare_name = name.trim_end_matches('*');
        let (base, section) = match bare_name.rsplit_once('*') {
            Some((base, n)) if n.chars().all(|c| c.is_ascii_digit()) => (base, Some(n)),
            _ => (bare_name, None),
        };
        let mut value = unquote(raw_value);
        let mut charset = None;
        if extended {
            match section {
                None | Some("0") => {
                    let (cs, decoded) = decode_extended(&value, None);
                    charset = cs;
                    value = decoded;
                }
                Some(_) => {
                    let cs = continued.get(base).and_then(|(_, cs)| cs.clone());
                    value = decode_extended(&value, cs.as_deref()).1;
                }
            }
        }

        let existing = continued.get(base).map(|(at, _)| *at);
        match (section, existing) {
            (Some(n), Some(at)) if n != "0" => pairs[at].1.push_str(&value),
            (Some(_), _) => {
                continued.insert(base.to_string(), (pairs.len(), charset));
                pairs.push((base.to_string(), value));
            }
            (None, _) => pairs.push((base.to_string(), value)),
        }
    }
    (pairs, residue)
}

/// Split on `sep` outside double quotes.
fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Decode an RFC 2231 extended value. The first piece carries
/// `charset'language'`; later pieces reuse the first piece's charset.
fn decode_extended(value: &str, charset: Option<&str>) -> (Option<String>, String) {
    let (cs, encoded) = match charset {
        Some(cs) => (cs.to_string(), value),
        None => {
            let mut pieces = value.splitn(3, '\'');
            match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(cs), Some(_lang), Some(rest)) => (cs.to_ascii_lowercase(), rest),
                _ => ("us-ascii".to_string(), value),
            }
        }
    };
    let bytes = percent_decode(encoded);
    let cs = if cs.is_empty() { "us-ascii".to_string() } else { cs };
    let text = decode_charset(&cs, &bytes);
    (Some(cs), text)
}

fn percent_decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(b) = super::encoded_word::hex_byte(bytes.get(i + 1..i + 3)) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_and_bare_boundary() {
        let (ct, issues) = parse_header_content_type(r#"multipart/mixed; boundary="X;Y""#);
        assert_eq!(ct.mime_type, "multipart/mixed");
        assert_eq!(ct.boundary(), Some("X;Y"));
        assert!(issues.is_empty());

        let (ct, _) = parse_header_content_type("Multipart/Mixed; Boundary=abc123");
        assert_eq!(ct.mime_type, "multipart/mixed");
        assert_eq!(ct.boundary(), Some("abc123"));
    }

    #[test]
    fn test_alternate_is_normalized() {
        let (ct, _) = parse_header_content_type("multipart/alternate; boundary=b");
        assert_eq!(ct.mime_type, "multipart/alternative");
    }

    #[test]
    fn test_charset_whitelist() {
        let (ct, issues) = parse_header_content_type("text/plain; charset=\"UTF8\"; format=flowed");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.param("format"), Some("flowed"));
        assert!(issues.is_empty());

        let (ct, issues) = parse_header_content_type("text/plain; charset=x-martian");
        assert_eq!(ct.charset(), None);
        assert_eq!(
            issues,
            vec![FieldError::ParamValue {
                param: "charset",
                value: "x-martian".into()
            }]
        );
    }

    #[test]
    fn test_signed_and_report_parameters() {
        let (ct, issues) = parse_header_content_type(
            r#"multipart/signed; micalg=SHA-256; protocol="application/pgp-signature"; boundary="s""#,
        );
        assert_eq!(ct.param("micalg"), Some("sha-256"));
        assert_eq!(ct.param("protocol"), Some("application/pgp-signature"));
        assert!(issues.is_empty());

        let (ct, issues) =
            parse_header_content_type("multipart/report; report-type=delivery-status; boundary=r");
        assert_eq!(ct.param("report-type"), Some("delivery-status"));
        assert!(issues.is_empty());

        let (_, issues) = parse_header_content_type("multipart/report; report-type=bogus; boundary=r");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_method_and_delsp_values() {
        let (ct, issues) = parse_header_content_type("text/calendar; method=CANCEL");
        assert_eq!(ct.param("method"), Some("cancel"));
        assert!(issues.is_empty());

        let (ct, issues) = parse_header_content_type("text/calendar; method=PUBLISH");
        assert_eq!(ct.param("method"), None);
        assert_eq!(issues.len(), 1);

        let (_, issues) = parse_header_content_type("text/plain; delsp=maybe");
        assert!(matches!(issues[0], FieldError::ParamValue { param: "delsp", .. }));
    }

    #[test]
    fn test_type_parameter_is_discarded() {
        let (ct, issues) =
            parse_header_content_type(r#"multipart/related; type="text/html"; boundary=b"#);
        assert_eq!(ct.param("type"), None);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_residual_information() {
        let (ct, issues) = parse_header_content_type("text/plain; charset=us-ascii; foo=bar; junk");
        assert_eq!(ct.param("residual"), Some("junk; foo=bar"));
        assert!(matches!(issues.as_slice(), [FieldError::Residual(_)]));
    }

    #[test]
    fn test_encoded_name() {
        let (ct, _) =
            parse_header_content_type("application/pdf; name=\"=?UTF-8?Q?Factura_n=C2=BA1.pdf?=\"");
        assert_eq!(ct.param("name"), Some("Factura nº1.pdf"));
    }

    #[test]
    fn test_rfc2231_parameters() {
        let ct = parse_part_content_type("application/pdf; name*=utf-8''caf%C3%A9.pdf");
        assert_eq!(ct.param("name"), Some("café.pdf"));

        let ct = parse_part_content_type(
            "application/pdf; name*0*=iso-8859-1''r%E9sum; name*1*=%E9; name*2=\".pdf\"",
        );
        assert_eq!(ct.param("name"), Some("résumé.pdf"));
    }

    #[test]
    fn test_part_content_type_keeps_everything() {
        let ct = parse_part_content_type("Text/HTML; Charset=ISO8859-1; x-other=1");
        assert_eq!(ct.mime_type, "text/html");
        assert_eq!(ct.charset(), Some("iso-8859-1"));
        assert_eq!(ct.param("x-other"), Some("1"));
        assert_eq!(parse_part_content_type("").mime_type, "");
    }

    #[test]
    fn test_disposition() {
        let d = parse_disposition(
            r#"attachment; filename="report.pdf"; size=1024; creation-date="Tue, 10 Jan 2017 19:28:58 +0100"; foo=bar"#,
        );
        assert_eq!(d.get("disposition").map(String::as_str), Some("attachment"));
        assert_eq!(d.get("filename").map(String::as_str), Some("report.pdf"));
        assert_eq!(d.get("size").map(String::as_str), Some("1024"));
        assert!(d.contains_key("creation-date"));
        assert!(!d.contains_key("foo"));
    }
}
