//! Date helpers shared by commands and list filters.
//!
//! Clients send either full RFC 3339 timestamps or bare `YYYY-MM-DD` dates;
//! bare dates are read as midnight UTC.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

pub fn parse_flexible(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(start_of_day)
        .map_err(|_| format!("'{raw}' is not a valid date or RFC 3339 timestamp"))
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Serde adapter: `#[serde(deserialize_with = "dates::flexible")]`.
pub fn flexible<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible(&raw).map_err(serde::de::Error::custom)
}

/// Serde adapter for optional fields; pair with `#[serde(default)]`.
pub fn flexible_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_flexible(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

/// Inclusive calendar-date range turned into half-open timestamp bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Lower bound (inclusive).
    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.start.map(start_of_day)
    }

    /// Upper bound (exclusive): midnight after `end`, so the whole end day matches.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.end
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(start_of_day)
    }

    #[cfg(test)]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from().map_or(true, |from| ts >= from) && self.until().map_or(true, |until| ts < until)
    }
}
