//! Fixed lookup tables shared by the parsers.

/// Content types parsed as a single opaque body.
pub const SIMPLE_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/enriched",
    "text/richtext",
    "text/calendar",
    "text/x-vcalendar",
    "text/vcard",
    "text/x-vcard",
    "text/directory",
    "text/csv",
    "text/xml",
    "text/rtf",
    "text/css",
    "text/x-patch",
    "text/x-diff",
    "text/rfc822-headers",
    "text/x-log",
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/svg+xml",
    "image/x-icon",
    "image/webp",
    "application/pdf",
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
    "application/x-tar",
    "application/gzip",
    "application/x-gzip",
    "application/x-compressed",
    "application/octet-stream",
    "application/msword",
    "application/rtf",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
    "application/ics",
    "application/json",
    "application/xml",
    "application/postscript",
    "application/applefile",
    "application/ms-tnef",
    "application/vnd.ms-tnef",
    "application/pgp",
    "application/pgp-encrypted",
    "application/pgp-signature",
    "application/pgp-keys",
    "application/pkcs7-mime",
    "application/x-pkcs7-mime",
    "application/pkcs7-signature",
    "application/x-pkcs7-signature",
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/x-wav",
    "audio/mp4",
    "audio/ogg",
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
    "message/rfc822",
    "message/delivery-status",
    "message/disposition-notification",
];

/// Multipart subtypes parsed as containers.
pub const MULTIPART_TYPES: &[&str] = &[
    "multipart/mixed",
    "multipart/alternative",
    "multipart/related",
    "multipart/signed",
    "multipart/encrypted",
    "multipart/report",
    "multipart/digest",
    "multipart/parallel",
    "multipart/appledouble",
];

/// Charset spellings accepted in Content-Type, with their canonical name.
pub const KNOWN_CHARSETS: &[(&str, &str)] = &[
    ("us-ascii", "us-ascii"),
    ("ascii", "us-ascii"),
    ("ansi_x3.4-1968", "us-ascii"),
    ("iso-8859-1", "iso-8859-1"),
    ("iso8859-1", "iso-8859-1"),
    ("iso_8859-1", "iso-8859-1"),
    ("latin1", "iso-8859-1"),
    ("iso-8859-2", "iso-8859-2"),
    ("iso8859-2", "iso-8859-2"),
    ("iso-8859-15", "iso-8859-15"),
    ("iso8859-15", "iso-8859-15"),
    ("utf-8", "utf-8"),
    ("utf8", "utf-8"),
    ("windows-1252", "windows-1252"),
    ("cp1252", "windows-1252"),
    ("windows-1250", "windows-1250"),
    ("iso-8859-9", "iso-8859-9"),
    ("koi8-r", "koi8-r"),
    ("iso-2022-jp", "iso-2022-jp"),
    ("shift_jis", "shift_jis"),
    ("gb2312", "gb2312"),
    ("big5", "big5"),
    ("euc-kr", "euc-kr"),
];

/// Charsets that are actually transcoded; others are kept as raw bytes.
pub const TRANSCODED_CHARSETS: &[&str] = &[
    "us-ascii",
    "iso-8859-1",
    "iso-8859-2",
    "iso-8859-15",
    "utf-8",
    "windows-1252",
];

/// Phrases (lowercase) standing in for a hidden recipient list.
pub const SUPPRESSED_RECIPIENTS: &[&str] = &[
    "recipient list suppressed",
    "unlisted-recipients",
    "recipient list not shown",
    "undisclosed recipients",
    "undisclosed-recipients",
    "whom it may concern",
];

/// Month names (lowercase prefix) and numbers. English first, then German/French forms.
pub const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("mär", 3),
    ("mrz", 3),
    ("mai", 5),
    ("okt", 10),
    ("dez", 12),
    ("fév", 2),
    ("avr", 4),
    ("juin", 6),
    ("juil", 7),
    ("aoû", 8),
    ("déc", 12),
];

/// Zone abbreviations and their offsets.
///
/// Regional and ambiguous: `MET DST` and `MESZ` name the same offset, `IST`
/// is taken as India. Collisions are not resolved beyond this table.
pub const TIMEZONES: &[(&str, &str)] = &[
    ("UT", "+0000"),
    ("UTC", "+0000"),
    ("GMT", "+0000"),
    ("Z", "+0000"),
    ("WET", "+0000"),
    ("WEST", "+0100"),
    ("BST", "+0100"),
    ("CET", "+0100"),
    ("MET", "+0100"),
    ("MEZ", "+0100"),
    ("CEST", "+0200"),
    ("MEST", "+0200"),
    ("MESZ", "+0200"),
    ("MET DST", "+0200"),
    ("EET", "+0200"),
    ("EEST", "+0300"),
    ("MSK", "+0300"),
    ("IST", "+0530"),
    ("HKT", "+0800"),
    ("SGT", "+0800"),
    ("JST", "+0900"),
    ("KST", "+0900"),
    ("AEST", "+1000"),
    ("AEDT", "+1100"),
    ("NZST", "+1200"),
    ("NZDT", "+1300"),
    ("AST", "-0400"),
    ("ADT", "-0300"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("AKST", "-0900"),
    ("AKDT", "-0800"),
    ("HST", "-1000"),
];

pub fn is_simple_type(content_type: &str) -> bool {
    SIMPLE_TYPES.contains(&content_type)
}

pub fn is_multipart_type(content_type: &str) -> bool {
    MULTIPART_TYPES.contains(&content_type)
}

/// Canonical charset name for a known spelling (case-insensitive).
pub fn canonical_charset(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    KNOWN_CHARSETS
        .iter()
        .find(|(spelling, _)| *spelling == lower)
        .map(|(_, canonical)| *canonical)
}

/// Month number for an English, German or French month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim_end_matches('.').to_lowercase();
    if lower.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, n)| *n)
}

/// Offset for a zone abbreviation (case-insensitive, inner whitespace collapsed).
pub fn timezone_offset(name: &str) -> Option<&'static str> {
    let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
    TIMEZONES
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(&normalized))
        .map(|(_, offset)| *offset)
}

/// The suppressed-recipient phrase contained in `text`, if any.
pub fn suppressed_phrase(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    SUPPRESSED_RECIPIENTS
        .iter()
        .find(|phrase| lower.contains(*phrase))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tables_are_lowercase_and_disjoint() {
        for t in SIMPLE_TYPES.iter().chain(MULTIPART_TYPES) {
            assert_eq!(*t, t.to_lowercase());
        }
        for t in MULTIPART_TYPES {
            assert!(!is_simple_type(t));
        }
        assert!(is_simple_type("message/delivery-status"));
        assert!(!is_simple_type("application/x-unheard-of"));
    }

    #[test]
    fn test_canonical_charset() {
        assert_eq!(canonical_charset("UTF8"), Some("utf-8"));
        assert_eq!(canonical_charset(" Latin1 "), Some("iso-8859-1"));
        assert_eq!(canonical_charset("klingon-1"), None);
        for (_, canonical) in KNOWN_CHARSETS {
            assert_eq!(canonical_charset(canonical), Some(*canonical));
        }
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Jan"), Some(1));
        assert_eq!(month_number("january"), Some(1));
        assert_eq!(month_number("Sept."), Some(9));
        assert_eq!(month_number("Okt"), Some(10));
        assert_eq!(month_number("Ma"), None);
        assert_eq!(month_number("Foo"), None);
    }

    #[test]
    fn test_timezone_offset() {
        assert_eq!(timezone_offset("cest"), Some("+0200"));
        assert_eq!(timezone_offset("MET  DST"), Some("+0200"));
        assert_eq!(timezone_offset("MEZ"), Some("+0100"));
        assert_eq!(timezone_offset("XYZ"), None);
    }

    #[test]
    fn test_suppressed_phrase() {
        assert_eq!(
            suppressed_phrase("Undisclosed-Recipients:;"),
            Some("undisclosed-recipients")
        );
        assert_eq!(
            suppressed_phrase("To Whom It May Concern"),
            Some("whom it may concern")
        );
        assert_eq!(suppressed_phrase("Friends"), None);
    }
}
