//! Header date parsing.
//!
//! Supported shapes, tried in order:
//!
//! - `[Tue,] 10 Jan 2017 19:28[:58] [+0100] [(CET)] [+0100]`
//! - `[Tue,] Jan 10 2017 19:28:58 ...` (month and day swapped)
//! - `10.01.2017` (noon)
//! - `[Tue,] 10 Jan 17` (noon)
//! - `2017-01-10[T ]19:28[:58] [Z|+0100|+01:00]`
//! - `Tue Jan 10 19:28:58 [CET] 2017 [+0100]` (ctime, as in mailbox postmarks)

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use super::tables::{month_number, timezone_offset};
use crate::error::FieldError;
use crate::model::date::DateRecord;

const WEEKDAY: &str = r"(?:[A-Za-z]+\.?,?\s+)?";
const MONTH: &str = r"(?P<mon>[^\W\d_]{3,}\.?)";
const TIME: &str = r"(?P<h>\d{1,2}):(?P<mi>\d{2})(?::(?P<s>\d{2}))?(?:\.\d+)?";

fn pattern(template: &str) -> Regex {
    let source = template
        .replace("WEEKDAY", WEEKDAY)
        .replace("MONTH", MONTH)
        .replace("TIME", TIME);
    Regex::new(&format!("^{source}$")).expect("valid regex")
}

static DAY_MONTH_YEAR_TIME: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"WEEKDAY(?P<d>\d{1,2})[\s\-]+MONTH[\s\-]+(?P<y>\d{1,4})\s+TIME\s*(?P<zone>.*)")
});
static MONTH_DAY_YEAR_TIME: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"WEEKDAYMONTH\s+(?P<d>\d{1,2}),?\s+(?P<y>\d{1,4})\s+TIME\s*(?P<zone>.*)")
});
static DOTTED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?P<d>\d{1,2})\.(?P<m>\d{1,2})\.(?P<y>\d{4})"));
static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"WEEKDAY(?P<d>\d{1,2})[\s\-]+MONTH[\s\-]+(?P<y>\d{1,4})"));
static ISO: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})(?:[T ]TIME)?\s*(?P<zone>Z|[+\-]\d{2}:?\d{2})?")
});
static CTIME: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"[A-Za-z]{3,}\s+MONTH\s+(?P<d>\d{1,2})\s+TIME(?:\s+(?P<zone>[A-Za-z]{1,5}))?\s+(?P<y>\d{4})(?:\s+(?P<offset>[+\-]\d{4}))?",
    )
});

static NUMERIC_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+\-])(\d{2}):?(\d{2})$").expect("valid regex"));
static ZONE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)").expect("valid regex"));

/// Numeric offset and zone name found after the time.
#[derive(Debug, Default, PartialEq)]
struct Zone {
    offset: Option<String>,
    name: Option<String>,
}

/// Parse a header date into a [`DateRecord`].
pub fn parse_date(text: &str) -> Result<DateRecord, FieldError> {
    let s = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let fail = || FieldError::Date(text.trim().to_string());

    if let Some(c) = DAY_MONTH_YEAR_TIME.captures(&s) {
        if let Some(record) = from_named_month(&c, c.name("zone").map_or("", |m| m.as_str())) {
            return Ok(record);
        }
    }
    if let Some(c) = MONTH_DAY_YEAR_TIME.captures(&s) {
        if let Some(record) = from_named_month(&c, c.name("zone").map_or("", |m| m.as_str())) {
            return Ok(record);
        }
    }
    if let Some(c) = DOTTED.captures(&s) {
        let month = c["m"].parse().ok();
        return build(&c["y"], month, &c["d"], None, &Zone::default()).ok_or_else(fail);
    }
    if let Some(c) = DAY_MONTH_YEAR.captures(&s) {
        let month = month_number(&c["mon"]);
        return build(&c["y"], month, &c["d"], None, &Zone::default()).ok_or_else(fail);
    }
    if let Some(c) = ISO.captures(&s) {
        let zone = c.name("zone").map_or("", |m| m.as_str());
        let zone = parse_zone(if zone == "Z" { "+0000" } else { zone }).ok_or_else(fail)?;
        let month = c["m"].parse().ok();
        return build(&c["y"], month, &c["d"], time_of(&c), &zone).ok_or_else(fail);
    }
    if let Some(c) = CTIME.captures(&s) {
        let zone_text = [c.name("offset"), c.name("zone")]
            .iter()
            .flatten()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(record) = from_named_month(&c, &zone_text) {
            return Ok(record);
        }
    }
    Err(fail())
}

fn from_named_month(c: &Captures<'_>, zone_text: &str) -> Option<DateRecord> {
    let month = month_number(&c["mon"])?;
    let zone = parse_zone(zone_text)?;
    build(&c["y"], Some(month), &c["d"], time_of(c), &zone)
}

fn time_of(c: &Captures<'_>) -> Option<(u32, u32, u32)> {
    let h = c.name("h")?.as_str().parse().ok()?;
    let mi = c.name("mi")?.as_str().parse().ok()?;
    let s = c.name("s").map_or(Some(0), |m| m.as_str().parse().ok())?;
    // Leap seconds are folded into the previous second
    Some((h, mi, s.min(59)))
}

/// Interpret the text after the time: numeric offsets, a parenthesized zone
/// name and zone abbreviations in any order. Unrecognized text fails the date.
fn parse_zone(text: &str) -> Option<Zone> {
    let mut zone = Zone::default();
    if let Some(c) = ZONE_COMMENT.captures(text) {
        let name = c[1].trim();
        if !name.is_empty() {
            zone.name = Some(name.to_string());
        }
    }
    let rest = ZONE_COMMENT.replace_all(text, " ");
    let mut words = Vec::new();
    for token in rest.split_whitespace() {
        if let Some(c) = NUMERIC_OFFSET.captures(token) {
            // The first numeric offset wins
            if zone.offset.is_none() {
                zone.offset = Some(format!("{}{}{}", &c[1], &c[2], &c[3]));
            }
        } else {
            words.push(token);
        }
    }
    if !words.is_empty() {
        let abbreviation = words.join(" ");
        let offset = timezone_offset(&abbreviation)?;
        zone.offset.get_or_insert_with(|| offset.to_string());
        zone.name.get_or_insert(abbreviation);
    } else if zone.offset.is_none() {
        if let Some(offset) = zone.name.as_deref().and_then(timezone_offset) {
            zone.offset = Some(offset.to_string());
        }
    }
    Some(zone)
}

/// Expand a short year: 0–79 → 20xx, 80–99 → 19xx, three digits → +1900.
fn expand_year(year: &str) -> Option<i32> {
    let n: i32 = year.parse().ok()?;
    Some(match year.len() {
        1 | 2 if n < 80 => n + 2000,
        1 | 2 => n + 1900,
        3 => n + 1900,
        _ => n,
    })
}

/// Offset in seconds east of UTC for `+HHMM` / `-HHMM`.
fn offset_seconds(offset: &str) -> Option<i64> {
    let (sign, digits) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => (1, offset),
    };
    let hours: i64 = digits.get(..2)?.parse().ok()?;
    let minutes: i64 = digits.get(2..4)?.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

fn build(
    year: &str,
    month: Option<u32>,
    day: &str,
    time: Option<(u32, u32, u32)>,
    zone: &Zone,
) -> Option<DateRecord> {
    let date = NaiveDate::from_ymd_opt(expand_year(year)?, month?, day.parse().ok()?)?;
    let (h, mi, s) = time.unwrap_or((12, 0, 0));
    let local = NaiveDateTime::new(date, NaiveTime::from_hms_opt(h, mi, s)?);
    let utc = match zone.offset.as_deref() {
        Some(offset) => local - Duration::seconds(offset_seconds(offset)?),
        None => local,
    };
    Some(DateRecord {
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%H:%M:%S").to_string(),
        timezone: zone.offset.as_deref().map(|o| {
            if o == "+0000" {
                "0000".to_string()
            } else {
                o.to_string()
            }
        }),
        timezone_name: zone.name.clone(),
        date_utc: utc.format("%Y-%m-%d").to_string(),
        time_utc: utc.format("%H:%M:%S").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc2822_with_offset() {
        let d = parse_date("Tue, 10 Jan 2017 19:28:58 +0100").unwrap();
        assert_eq!(d.date, "2017-01-10");
        assert_eq!(d.time, "19:28:58");
        assert_eq!(d.timezone.as_deref(), Some("+0100"));
        assert_eq!(d.date_utc, "2017-01-10");
        assert_eq!(d.time_utc, "18:28:58");
    }

    #[test]
    fn test_utc_offset_normalized() {
        let d = parse_date("10 Jan 2017 19:28:58 +0000").unwrap();
        assert_eq!(d.timezone.as_deref(), Some("0000"));
        assert_eq!(d.time_utc, "19:28:58");
    }

    #[test]
    fn test_offset_with_zone_comment() {
        let d = parse_date("Mon, 2 Feb 2009 08:05:00 -0500 (EST)").unwrap();
        assert_eq!(d.timezone.as_deref(), Some("-0500"));
        assert_eq!(d.timezone_name.as_deref(), Some("EST"));
        assert_eq!(d.time_utc, "13:05:00");
    }

    #[test]
    fn test_utc_shift_crosses_midnight() {
        let d = parse_date("Sat, 31 Dec 2016 23:30:00 -0200").unwrap();
        assert_eq!(d.date_utc, "2017-01-01");
        assert_eq!(d.time_utc, "01:30:00");
    }

    #[test]
    fn test_named_zone_only() {
        let d = parse_date("Tue, 10 Jan 2017 19:28:58 MET DST").unwrap();
        assert_eq!(d.timezone.as_deref(), Some("+0200"));
        assert_eq!(d.timezone_name.as_deref(), Some("MET DST"));
        assert_eq!(d.time_utc, "17:28:58");
    }

    #[test]
    fn test_missing_seconds_and_short_year() {
        let d = parse_date("10 Jan 17 19:28 +0100").unwrap();
        assert_eq!(d.date, "2017-01-10");
        assert_eq!(d.time, "19:28:00");
        let d = parse_date("3 Mar 98 10:00:00 GMT").unwrap();
        assert_eq!(d.date, "1998-03-03");
        let d = parse_date("3 Mar 5 10:00:00").unwrap();
        assert_eq!(d.date, "2005-03-03");
        let d = parse_date("3 Mar 101 10:00:00").unwrap();
        assert_eq!(d.date, "2001-03-03");
    }

    #[test]
    fn test_month_day_swapped() {
        let d = parse_date("Tue, Jan 10 2017 19:28:58 +0100").unwrap();
        assert_eq!(d.date, "2017-01-10");
        assert_eq!(d.time_utc, "18:28:58");
    }

    #[test]
    fn test_dotted_date_defaults_to_noon() {
        let d = parse_date("24.12.2016").unwrap();
        assert_eq!(d.date, "2016-12-24");
        assert_eq!(d.time, "12:00:00");
        assert_eq!(d.timezone, None);
    }

    #[test]
    fn test_day_month_short_year_without_time() {
        let d = parse_date("5 Nov 04").unwrap();
        assert_eq!(d.date, "2004-11-05");
        assert_eq!(d.time, "12:00:00");
    }

    #[test]
    fn test_german_month() {
        let d = parse_date("Di, 10 Okt 2017 08:00:00 +0200").unwrap();
        assert_eq!(d.date, "2017-10-10");
    }

    #[test]
    fn test_iso_and_ctime_forms() {
        let d = parse_date("2017-01-10T19:28:58+01:00").unwrap();
        assert_eq!(d.timezone.as_deref(), Some("+0100"));
        assert_eq!(d.time_utc, "18:28:58");
        let d = parse_date("Tue Jan 10 19:28:58 2017").unwrap();
        assert_eq!(d.date, "2017-01-10");
        assert_eq!(d.timezone, None);
        let d = parse_date("Tue Jan 10 19:28:58 CET 2017").unwrap();
        assert_eq!(d.timezone.as_deref(), Some("+0100"));
    }

    #[test]
    fn test_canonical_form_reparses_to_same_utc() {
        for input in [
            "Tue, 10 Jan 2017 19:28:58 +0100",
            "10 Jan 2017 19:28:58 +0000",
            "Mon, 2 Feb 2009 08:05:00 -0500 (EST)",
            "Tue, 10 Jan 2017 19:28:58 MET DST",
            "24.12.2016",
            "5 Nov 04",
            "Tue Jan 10 19:28:58 2017",
        ] {
            let first = parse_date(input).unwrap();
            let again = parse_date(&first.canonical()).unwrap();
            assert_eq!(
                (&first.date_utc, &first.time_utc),
                (&again.date_utc, &again.time_utc),
                "{input}"
            );
        }
    }

    #[test]
    fn test_unparseable_dates() {
        for input in ["", "yesterday", "32 Jan 2017 10:00:00", "10 Foo 2017 10:00:00", "10 Jan 2017 25:00:00"] {
            assert!(matches!(parse_date(input), Err(FieldError::Date(_))), "{input}");
        }
        assert!(parse_date("10 Jan 2017 10:00:00 +0100 nonsense").is_err());
    }
}
