//! Event parser
//!
//! Turns one node's raw log lines into a lazy, restartable sequence of
//! [`LogRecord`]s. Every input line yields exactly one record: lines whose
//! header cannot be parsed are kept as UNCLASSIFIED with their raw text.

use super::core::{HeaderParser, LineHeader, TimestampParser};
use super::specialized::{ClassifierRegistry, ClassifyContext};
use crate::services::log_analyzer::models::{Domain, FieldMap, LogRecord, NodeRole, Severity};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::sync::Arc;

/// Counters collected while iterating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub records: u64,
    /// Lines without a full timestamp + level header
    pub headerless: u64,
    /// The input had no parseable timestamp at all
    pub epoch_fallback: bool,
}

/// Parser for raw node logs
#[derive(Clone)]
pub struct EventParser {
    registry: Arc<ClassifierRegistry>,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(Arc::new(ClassifierRegistry::new()))
    }
}

impl EventParser {
    pub fn new(registry: Arc<ClassifierRegistry>) -> Self {
        Self { registry }
    }

    /// Iterate records for `lines`; calling again restarts from the first line
    pub fn parse<'a, L: AsRef<[u8]>>(
        &'a self,
        node_id: &'a str,
        role: NodeRole,
        lines: &'a [L],
    ) -> RecordIter<'a, L> {
        RecordIter {
            registry: &self.registry,
            node_id,
            role,
            lines,
            pos: 0,
            last_timestamp: None,
            earliest: None,
            stats: ParseStats::default(),
        }
    }
}

/// Lazy record sequence over one node's lines
pub struct RecordIter<'a, L> {
    registry: &'a ClassifierRegistry,
    node_id: &'a str,
    role: NodeRole,
    lines: &'a [L],
    pos: usize,
    last_timestamp: Option<DateTime<Utc>>,
    /// Earliest timestamp in the whole input, computed on first need
    earliest: Option<Option<DateTime<Utc>>>,
    stats: ParseStats,
}

impl<L: AsRef<[u8]>> RecordIter<'_, L> {
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    fn earliest_timestamp(&mut self) -> Option<DateTime<Utc>> {
        if self.earliest.is_none() {
            let earliest = self
                .lines
                .iter()
                .filter_map(|l| TimestampParser::parse_prefix(&String::from_utf8_lossy(l.as_ref())))
                .map(|(ts, _)| ts)
                .min();
            self.earliest = Some(earliest);
        }
        self.earliest.flatten()
    }

    fn fallback_timestamp(&mut self) -> DateTime<Utc> {
        if let Some(ts) = self.last_timestamp {
            return ts;
        }
        match self.earliest_timestamp() {
            Some(ts) => ts,
            None => {
                if !self.stats.epoch_fallback {
                    tracing::warn!(
                        "Node {}: no parseable timestamp in input, using Unix epoch",
                        self.node_id
                    );
                }
                self.stats.epoch_fallback = true;
                DateTime::<Utc>::UNIX_EPOCH
            },
        }
    }
}

impl<L: AsRef<[u8]>> Iterator for RecordIter<'_, L> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines;
        let raw = lines.get(self.pos)?;
        self.pos += 1;
        let line_number = self.pos as u64;

        let text: Cow<'_, str> = String::from_utf8_lossy(raw.as_ref());
        let text = text.trim_end_matches(['\r', '\n']);

        let (timestamp, severity, domain, fields) = match HeaderParser::parse(text) {
            LineHeader::Full { timestamp, severity, body_offset } => {
                self.last_timestamp = Some(timestamp);
                let ctx = ClassifyContext { message: &text[body_offset..], severity, role: self.role };
                let (domain, fields) = self.registry.classify(&ctx);
                (timestamp, severity, domain, fields)
            },
            LineHeader::TimestampOnly { timestamp, body_offset } => {
                self.last_timestamp = Some(timestamp);
                self.stats.headerless += 1;
                let ctx = ClassifyContext {
                    message: &text[body_offset..],
                    severity: Severity::Unknown,
                    role: self.role,
                };
                let (domain, fields) = self.registry.classify(&ctx);
                (timestamp, Severity::Unknown, domain, fields)
            },
            LineHeader::Missing => {
                self.stats.headerless += 1;
                let ts = self.fallback_timestamp();
                (ts, Severity::Unknown, Domain::Unclassified, FieldMap::new())
            },
        };

        self.stats.records += 1;
        Some(LogRecord {
            node_id: self.node_id.to_string(),
            node_role: self.role,
            line_number,
            timestamp,
            domain,
            severity,
            raw_text: text.to_string(),
            extracted_fields: fields,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lines.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}
