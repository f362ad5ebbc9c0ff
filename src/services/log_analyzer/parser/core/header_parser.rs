//! Log line header parsing
//!
//! A header is a timestamp followed by a log level. JVM GC log lines
//! (`<timestamp>: <uptime>: [GC ...`) carry no level and are read as INFO.

use super::timestamp_parser::TimestampParser;
use crate::services::log_analyzer::models::Severity;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static LEVEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\]?\s*(?:\[[^\]]*\]\s*)?(?:\[(?i:(fatal|error|warn(?:ing)?|info|debug|trace))\]|(FATAL|ERROR|WARN(?:ING)?|INFO|DEBUG|TRACE)\b)",
    )
    .unwrap()
});

static GC_UPTIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:\s*\d+(?:\.\d+)?s?:\s*").unwrap());

/// Outcome of header parsing for one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeader {
    /// Timestamp and level both recognized; `body_offset` is where the message starts
    Full { timestamp: DateTime<Utc>, severity: Severity, body_offset: usize },
    /// Timestamp recognized but no level; the message still starts at `body_offset`
    TimestampOnly { timestamp: DateTime<Utc>, body_offset: usize },
    /// Nothing recognized (stack frames, wrapped lines, garbage)
    Missing,
}

pub struct HeaderParser;

impl HeaderParser {
    pub fn parse(line: &str) -> LineHeader {
        let Some((timestamp, consumed)) = TimestampParser::parse_prefix(line) else {
            return LineHeader::Missing;
        };
        let rest = &line[consumed..];

        if let Some(cap) = LEVEL_REGEX.captures(rest) {
            let level = cap.get(1).or_else(|| cap.get(2)).map_or("", |m| m.as_str());
            let end = cap.get(0).map_or(0, |m| m.end());
            let body_offset = consumed + end + count_leading_ws(&rest[end..]);
            return LineHeader::Full {
                timestamp,
                severity: Severity::from_level(level),
                body_offset,
            };
        }

        if let Some(m) = GC_UPTIME_REGEX.find(rest) {
            return LineHeader::Full {
                timestamp,
                severity: Severity::Info,
                body_offset: consumed + m.end(),
            };
        }

        LineHeader::TimestampOnly { timestamp, body_offset: consumed + count_leading_ws(rest) }
    }
}

fn count_leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(line: &str) -> (Severity, &str) {
        match HeaderParser::parse(line) {
            LineHeader::Full { severity, body_offset, .. } => (severity, &line[body_offset..]),
            other => panic!("expected full header, got {:?}", other),
        }
    }

    #[test]
    fn test_log4j_header() {
        let (sev, msg) =
            body("2025-09-12 16:00:01,234 WARN  [sync.0] wal.FSHLog: Slow sync cost: 312 ms");
        assert_eq!(sev, Severity::Warn);
        assert_eq!(msg, "[sync.0] wal.FSHLog: Slow sync cost: 312 ms");
    }

    #[test]
    fn test_thread_before_level() {
        let (sev, msg) = body("2025-09-12 16:00:01,234 [RS_OPEN_REGION-1] ERROR handler.X: boom");
        assert_eq!(sev, Severity::Error);
        assert_eq!(msg, "handler.X: boom");
    }

    #[test]
    fn test_unified_jvm_header() {
        let (sev, msg) = body("[2025-09-12T16:00:01.234+0000][info][gc] GC(7) Pause Young 12.5ms");
        assert_eq!(sev, Severity::Info);
        assert_eq!(msg, "[gc] GC(7) Pause Young 12.5ms");
    }

    #[test]
    fn test_gc_log_uptime_header() {
        let (sev, msg) = body("2025-09-12T16:00:01.234+0000: 1234.567: [GC pause (young) 0.12 secs]");
        assert_eq!(sev, Severity::Info);
        assert!(msg.starts_with("[GC pause"));
    }

    #[test]
    fn test_timestamp_without_level() {
        let line = "2025-09-12 16:00:01,234 something odd";
        match HeaderParser::parse(line) {
            LineHeader::TimestampOnly { body_offset, .. } => assert_eq!(&line[body_offset..], "something odd"),
            other => panic!("expected timestamp-only header, got {:?}", other),
        }
        assert_eq!(HeaderParser::parse("\tat java.lang.Thread.run"), LineHeader::Missing);
    }
}
