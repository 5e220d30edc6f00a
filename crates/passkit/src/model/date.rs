//! Date codec for pass documents.
//!
//! Dates are written with minute precision and a signed numeric offset,
//! e.g. `2024-05-01T18:30+02:00`. Reading is more lenient and also accepts
//! seconds and a `Z` suffix.
//!
//! Use with `#[serde(with = "crate::model::date")]` or
//! `#[serde(with = "crate::model::date::option")]`.

use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serializer};

/// `yyyy-MM-dd'T'HH:mmZZZZZ`
pub const PASS_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

pub fn format_pass_date(date: &DateTime<FixedOffset>) -> String {
    date.format(PASS_DATE_FORMAT).to_string()
}

pub fn parse_pass_date(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let normalized;
    let text = match text.strip_suffix('Z') {
        Some(rest) => {
            normalized = format!("{rest}+00:00");
            normalized.as_str()
        }
        None => text,
    };
    DateTime::parse_from_str(text, PASS_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%:z"))
        .or_else(|_| DateTime::parse_from_rfc3339(text))
}

pub fn serialize<S: Serializer>(date: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_pass_date(date))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_pass_date(&text).map_err(de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => super::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| parse_pass_date(&text).map_err(de::Error::custom))
            .transpose()
    }
}
