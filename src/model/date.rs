//! Normalized date records.

use serde::{Deserialize, Serialize};

/// A parsed header date.
///
/// `date`/`time` are the local values as written; `date_utc`/`time_utc`
/// are shifted by `timezone`. Without any zone information the UTC values
/// equal the local ones and `timezone` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRecord {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    /// Raw offset such as `+0100`; `+0000` is normalized to `0000`.
    pub timezone: Option<String>,
    /// Zone name, from a parenthesized comment or an abbreviation.
    pub timezone_name: Option<String>,
    pub date_utc: String,
    pub time_utc: String,
}

impl DateRecord {
    /// Populated `(key, value)` pairs, keyed as in the message field map.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![("date", self.date.as_str()), ("time", self.time.as_str())];
        if let Some(tz) = &self.timezone {
            out.push(("timezone", tz.as_str()));
        }
        if let Some(name) = &self.timezone_name {
            out.push(("timezone name", name.as_str()));
        }
        out.push(("date UTC", self.date_utc.as_str()));
        out.push(("time UTC", self.time_utc.as_str()));
        out
    }

    /// `YYYY-MM-DD HH:MM:SS [±HHMM]`, accepted back by the date parser.
    pub fn canonical(&self) -> String {
        match self.timezone.as_deref() {
            Some("0000") => format!("{} {} +0000", self.date, self.time),
            Some(tz) => format!("{} {} {}", self.date, self.time, tz),
            None => format!("{} {}", self.date, self.time),
        }
    }
}
