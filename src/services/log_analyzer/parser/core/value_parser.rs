//! Value parsing utilities for HBase log messages
//!
//! Handles durations ("45ms", "5sec", "1.2 s"), sizes ("128M", "1.2 GB")
//! and plain numbers with thousands separators.

use crate::services::log_analyzer::parser::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(ms|msec|us|ns|s|sec|secs|seconds|m|min|mins|h)?$").unwrap()
});

static SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(TB|GB|MB|KB|T|G|M|K|B)?$").unwrap());

/// Value parser for log message fragments
pub struct ValueParser;

impl ValueParser {
    /// Parse a number, tolerating thousands separators ("1,234")
    pub fn parse_number(input: &str) -> ParseResult<f64> {
        let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
        cleaned
            .parse::<f64>()
            .map_err(|_| ParseError::ParseNumberError(input.to_string()))
    }

    /// Parse a duration into milliseconds; a bare number is milliseconds
    pub fn parse_duration_ms(input: &str) -> ParseResult<f64> {
        let trimmed = input.trim();
        let cap = DURATION_REGEX
            .captures(trimmed)
            .ok_or_else(|| ParseError::ParseDurationError(input.to_string()))?;
        let num: f64 = cap[1]
            .parse()
            .map_err(|_| ParseError::ParseDurationError(input.to_string()))?;
        let factor = match cap.get(2).map(|m| m.as_str()) {
            None | Some("ms") | Some("msec") => 1.0,
            Some("us") => 0.001,
            Some("ns") => 0.000_001,
            Some("s") | Some("sec") | Some("secs") | Some("seconds") => 1_000.0,
            Some("m") | Some("min") | Some("mins") => 60_000.0,
            Some("h") => 3_600_000.0,
            Some(other) => {
                return Err(ParseError::ParseDurationError(format!(
                    "unsupported unit '{}' in '{}'",
                    other, input
                )));
            },
        };
        Ok(num * factor)
    }

    /// Parse a size into megabytes; a bare number is bytes
    pub fn parse_size_mb(input: &str) -> ParseResult<f64> {
        let trimmed = input.trim();
        let cap = SIZE_REGEX
            .captures(trimmed)
            .ok_or_else(|| ParseError::ParseSizeError(input.to_string()))?;
        let num: f64 = cap[1]
            .parse()
            .map_err(|_| ParseError::ParseSizeError(input.to_string()))?;
        let mb = match cap.get(2).map(|m| m.as_str()) {
            None | Some("B") => num / (1024.0 * 1024.0),
            Some("K") | Some("KB") => num / 1024.0,
            Some("M") | Some("MB") => num,
            Some("G") | Some("GB") => num * 1024.0,
            Some("T") | Some("TB") => num * 1024.0 * 1024.0,
            Some(other) => {
                return Err(ParseError::ParseSizeError(format!(
                    "unsupported unit '{}' in '{}'",
                    other, input
                )));
            },
        };
        Ok(mb)
    }
}
