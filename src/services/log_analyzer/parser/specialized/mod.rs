//! Domain classifiers for HBase log messages
//!
//! Each classifier recognizes one technical domain and extracts its typed
//! fields. Classifiers are pure and stateless; the registry asks them in a
//! fixed priority order and the first match wins.

use crate::services::log_analyzer::models::{Domain, FieldMap, FieldValue, NodeRole, Severity};
use crate::services::log_analyzer::parser::core::ValueParser;
use regex::Regex;

mod connection_classifier;
mod jvm_classifier;
mod performance_classifier;
mod region_classifier;
mod replication_classifier;
mod rpc_classifier;
mod table_classifier;
mod timeout_classifier;
mod wal_classifier;

pub use connection_classifier::{ClientConnectionClassifier, NetworkClassifier};
pub use jvm_classifier::{GcClassifier, MemoryClassifier};
pub use performance_classifier::PerformanceClassifier;
pub use region_classifier::{
    BalancerClassifier, CompactionClassifier, FlushClassifier, SplitClassifier,
};
pub use replication_classifier::ReplicationClassifier;
pub use rpc_classifier::RpcHandlerClassifier;
pub use table_classifier::TableClassifier;
pub use timeout_classifier::TimeoutRetryClassifier;
pub use wal_classifier::WalClassifier;

// ============================================================================
// Classifier Trait
// ============================================================================

/// Input handed to every classifier
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Message text after the header
    pub message: &'a str,
    pub severity: Severity,
    pub role: NodeRole,
}

/// A domain matcher
pub trait DomainClassifier: Send + Sync {
    fn domain(&self) -> Domain;

    /// Returns the extracted fields when the message belongs to this domain
    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap>;
}

/// All classifiers in priority order
pub fn get_all_classifiers() -> Vec<Box<dyn DomainClassifier>> {
    vec![
        Box::new(WalClassifier),
        Box::new(GcClassifier),
        Box::new(MemoryClassifier),
        Box::new(ReplicationClassifier),
        Box::new(TimeoutRetryClassifier),
        Box::new(RpcHandlerClassifier),
        Box::new(CompactionClassifier),
        Box::new(SplitClassifier),
        Box::new(FlushClassifier),
        Box::new(BalancerClassifier),
        Box::new(ClientConnectionClassifier),
        Box::new(NetworkClassifier),
        Box::new(PerformanceClassifier),
        Box::new(TableClassifier),
    ]
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered set of classifiers; first match wins
pub struct ClassifierRegistry {
    classifiers: Vec<Box<dyn DomainClassifier>>,
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self { classifiers: get_all_classifiers() }
    }

    /// Registry without the classifier for `domain`
    pub fn without(domain: Domain) -> Self {
        Self {
            classifiers: get_all_classifiers()
                .into_iter()
                .filter(|c| c.domain() != domain)
                .collect(),
        }
    }

    pub fn classify(&self, ctx: &ClassifyContext) -> (Domain, FieldMap) {
        self.classifiers
            .iter()
            .find_map(|c| c.classify(ctx).map(|fields| (c.domain(), fields)))
            .unwrap_or((Domain::Unclassified, FieldMap::new()))
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.classifiers.iter().map(|c| c.domain()).collect()
    }
}

// ============================================================================
// Extraction helpers
// ============================================================================

pub(crate) fn capture_str<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

pub(crate) fn capture_i64(re: &Regex, text: &str) -> Option<i64> {
    capture_str(re, text).and_then(|s| s.replace(',', "").parse().ok())
}

pub(crate) fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    capture_str(re, text).and_then(|s| ValueParser::parse_number(s).ok())
}

pub(crate) fn insert_opt(fields: &mut FieldMap, key: &str, value: Option<impl Into<FieldValue>>) {
    if let Some(v) = value {
        fields.insert(key.to_string(), v.into());
    }
}

pub(crate) fn event(fields: &mut FieldMap, name: &str) {
    fields.insert("event".to_string(), FieldValue::Text(name.to_string()));
}
