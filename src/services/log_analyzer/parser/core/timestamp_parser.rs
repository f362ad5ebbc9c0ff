//! Timestamp parsing for HBase, Hadoop and JVM log headers
//!
//! Supported prefixes:
//! - `2025-09-12 16:00:01,234` (log4j default)
//! - `2025-09-12 16:00:01.234`
//! - `2025-09-12T16:00:01.234+0000` / `...Z` / `...+08:00` (ISO-8601, GC logs)
//! - `25/09/12 16:00:01` (Hadoop short form)
//!
//! Timestamps without an explicit offset are taken as UTC.

use crate::services::log_analyzer::parser::error::{ParseError, ParseResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_LIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[?(\d{4})-(\d{2})-(\d{2})[ T](\d{2}):(\d{2}):(\d{2})(?:[,.](\d{1,9}))?(Z|[+-]\d{2}:?\d{2})?",
    )
    .unwrap()
});

static SHORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[?(\d{2})/(\d{2})/(\d{2}) (\d{2}):(\d{2}):(\d{2})").unwrap());

/// Parser for the timestamp prefix of a log line
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a timestamp at the start of `line`.
    ///
    /// Returns the instant and the number of bytes consumed.
    pub fn parse_prefix(line: &str) -> Option<(DateTime<Utc>, usize)> {
        if let Some(cap) = ISO_LIKE_REGEX.captures(line) {
            let whole = cap.get(0)?;
            let num = |i: usize| cap.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let year = cap.get(1)?.as_str().parse::<i32>().ok()?;
            let nanos = cap.get(7).map_or(0, |m| fraction_to_nanos(m.as_str()));
            let naive = build_naive(year, num(2)?, num(3)?, num(4)?, num(5)?, num(6)?, nanos)?;
            let ts = match cap.get(8) {
                Some(offset) => apply_offset(naive, offset.as_str())?,
                None => Utc.from_utc_datetime(&naive),
            };
            return Some((ts, whole.end()));
        }

        if let Some(cap) = SHORT_REGEX.captures(line) {
            let whole = cap.get(0)?;
            let num = |i: usize| cap.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let year = 2000 + num(1)? as i32;
            let naive = build_naive(year, num(2)?, num(3)?, num(4)?, num(5)?, num(6)?, 0)?;
            return Some((Utc.from_utc_datetime(&naive), whole.end()));
        }

        None
    }

    /// Parse a full timestamp string (configuration values, CLI flags).
    ///
    /// Accepts RFC 3339 in addition to the log formats.
    pub fn parse(input: &str) -> ParseResult<DateTime<Utc>> {
        let trimmed = input.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(ts.with_timezone(&Utc));
        }
        match Self::parse_prefix(trimmed) {
            Some((ts, consumed)) if consumed == trimmed.len() => Ok(ts),
            _ => Err(ParseError::ParseTimestampError(input.to_string())),
        }
    }
}

fn fraction_to_nanos(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

fn build_naive(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some(NaiveDateTime::new(date, time))
}

fn apply_offset(naive: NaiveDateTime, offset: &str) -> Option<DateTime<Utc>> {
    if offset == "Z" {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    let fixed = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    fixed.from_local_datetime(&naive).single().map(|dt| dt.with_timezone(&Utc))
}
