//! Record and error summaries for the report
//!
//! Counters are accumulated per node while records stream past and merged
//! by the aggregator, so a partial node can be dropped without touching the
//! totals of the others.

use crate::services::log_analyzer::models::{
    Domain, ErrorCategory, ErrorSummary, EventSummary, LogRecord, Severity,
};
use chrono::Timelike;
use std::collections::BTreeMap;

const TOP_DOMAINS: usize = 5;
const TOP_ERROR_CATEGORIES: usize = 3;

/// Keyword rules, checked in order against the lowercased line
const CATEGORY_KEYWORDS: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Timeout, &["timed out", "timeout"]),
    (ErrorCategory::Memory, &["outofmemoryerror", "out of memory"]),
    (ErrorCategory::Network, &["connection", "socket", "network"]),
    (ErrorCategory::Io, &["ioexception", "disk", "file"]),
    (ErrorCategory::Permission, &["permission", "access denied", "unauthorized"]),
    (ErrorCategory::Configuration, &["configuration", "config", "property"]),
    (ErrorCategory::Data, &["corrupt", "checksum", "data"]),
    (ErrorCategory::Resource, &["resource", "quota", "limit"]),
];

/// Category of an error-like record, `None` for ordinary records.
///
/// Error-like means WARN or worse, or a line mentioning an exception or a
/// timeout whatever its level.
pub fn classify_error(record: &LogRecord) -> Option<ErrorCategory> {
    let raw = record.raw_text.as_str();
    let leveled = matches!(record.severity, Severity::Fatal | Severity::Error | Severity::Warn);
    if !leveled && !raw.contains("Exception") && !raw.contains("timed out") {
        return None;
    }

    let lower = raw.to_lowercase();
    let by_keyword = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category);

    Some(by_keyword.unwrap_or(match record.severity {
        Severity::Fatal => ErrorCategory::Fatal,
        Severity::Error => ErrorCategory::Error,
        Severity::Warn => ErrorCategory::Warning,
        _ if raw.contains("Exception") => ErrorCategory::Exception,
        _ => ErrorCategory::Unknown,
    }))
}

/// Mergeable counters behind [`EventSummary`] and [`ErrorSummary`]
#[derive(Debug, Clone, Default)]
pub struct RecordSummary {
    total_records: u64,
    by_domain: BTreeMap<Domain, u64>,
    by_node: BTreeMap<String, BTreeMap<Domain, u64>>,
    hourly: BTreeMap<u32, u64>,
    errors: BTreeMap<ErrorCategory, u64>,
}

impl RecordSummary {
    pub fn observe(&mut self, record: &LogRecord) {
        self.total_records += 1;
        *self.by_domain.entry(record.domain).or_default() += 1;
        *self
            .by_node
            .entry(record.node_id.clone())
            .or_default()
            .entry(record.domain)
            .or_default() += 1;
        *self.hourly.entry(record.timestamp.hour()).or_default() += 1;

        if let Some(category) = classify_error(record) {
            *self.errors.entry(category).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: RecordSummary) {
        self.total_records += other.total_records;
        for (domain, n) in other.by_domain {
            *self.by_domain.entry(domain).or_default() += n;
        }
        for (node, counts) in other.by_node {
            let entry = self.by_node.entry(node).or_default();
            for (domain, n) in counts {
                *entry.entry(domain).or_default() += n;
            }
        }
        for (hour, n) in other.hourly {
            *self.hourly.entry(hour).or_default() += n;
        }
        for (category, n) in other.errors {
            *self.errors.entry(category).or_default() += n;
        }
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn event_summary(&self) -> EventSummary {
        let classified = self
            .by_domain
            .iter()
            .filter(|(domain, _)| **domain != Domain::Unclassified)
            .map(|(d, n)| (*d, *n));
        EventSummary {
            total_records: self.total_records,
            by_domain: self.by_domain.clone(),
            by_node: self.by_node.clone(),
            hourly_distribution: self.hourly.clone(),
            top_domains: top_counts(classified, TOP_DOMAINS),
        }
    }

    pub fn error_summary(&self) -> ErrorSummary {
        ErrorSummary {
            total: self.errors.values().sum(),
            by_category: self.errors.clone(),
            top_categories: top_counts(self.errors.iter().map(|(c, n)| (*c, *n)), TOP_ERROR_CATEGORIES),
        }
    }
}

/// Highest counts first, ties by key
fn top_counts<K: Ord + Copy>(counts: impl Iterator<Item = (K, u64)>, n: usize) -> Vec<(K, u64)> {
    let mut all: Vec<(K, u64)> = counts.collect();
    all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    all.truncate(n);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldMap, NodeRole};
    use chrono::{TimeZone, Utc};

    fn record(node: &str, hour: u32, domain: Domain, severity: Severity, raw: &str) -> LogRecord {
        LogRecord {
            node_id: node.into(),
            node_role: NodeRole::RegionServer,
            line_number: 1,
            timestamp: Utc.with_ymd_and_hms(2025, 9, 12, hour, 0, 0).unwrap(),
            domain,
            severity,
            raw_text: raw.into(),
            extracted_fields: FieldMap::new(),
        }
    }

    #[test]
    fn test_classify_error_keywords() {
        let cases = [
            ("Call timed out after 60000 ms", Severity::Warn, Some(ErrorCategory::Timeout)),
            ("java.lang.OutOfMemoryError: Java heap space", Severity::Fatal, Some(ErrorCategory::Memory)),
            ("Connection reset by peer", Severity::Error, Some(ErrorCategory::Network)),
            ("Failed to open hdfs file", Severity::Error, Some(ErrorCategory::Io)),
            ("Region server aborting", Severity::Fatal, Some(ErrorCategory::Fatal)),
            ("Something odd", Severity::Warn, Some(ErrorCategory::Warning)),
            ("NullPointerException in handler", Severity::Info, Some(ErrorCategory::Exception)),
            ("Flushed memstore", Severity::Info, None),
        ];
        for (raw, severity, expected) in cases {
            let r = record("n1", 0, Domain::Unclassified, severity, raw);
            assert_eq!(classify_error(&r), expected, "line: {}", raw);
        }
    }

    #[test]
    fn test_summary_merge_and_tops() {
        let mut a = RecordSummary::default();
        a.observe(&record("n1", 16, Domain::Wal, Severity::Warn, "Slow sync cost: 300 ms"));
        a.observe(&record("n1", 16, Domain::Wal, Severity::Info, "Rolled WAL"));
        a.observe(&record("n1", 17, Domain::Unclassified, Severity::Info, "hello"));

        let mut b = RecordSummary::default();
        b.observe(&record("n2", 17, Domain::Gc, Severity::Info, "GC pause 50ms"));
        b.observe(&record("n2", 17, Domain::Unclassified, Severity::Info, "hello"));
        b.observe(&record("n2", 17, Domain::Unclassified, Severity::Info, "hello"));
        a.merge(b);

        let events = a.event_summary();
        assert_eq!(events.total_records, 6);
        assert_eq!(events.by_domain[&Domain::Unclassified], 3);
        assert_eq!(events.by_node["n2"][&Domain::Gc], 1);
        assert_eq!(events.hourly_distribution[&17], 4);
        assert_eq!(events.top_domains, vec![(Domain::Wal, 2), (Domain::Gc, 1)]);

        let errors = a.error_summary();
        assert_eq!(errors.total, 1);
        assert_eq!(errors.top_categories, vec![(ErrorCategory::Warning, 1)]);
    }
}
