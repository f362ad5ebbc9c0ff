//! Replication source/sink classifier

use super::{ClassifyContext, DomainClassifier, capture_i64, capture_str, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static REPLICATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\breplication|Replication(?:Source|Sink)").unwrap());

static PEER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)peer(?:Id|ClusterId)?[=:\s]+([\w\-]+)").unwrap());

static LOG_QUEUE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sizeOfLogQueue=(\d+)").unwrap());

static LAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:replication lag\D*?|ageOfLastShippedOp=|replicationLag=)(\d+)").unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct ReplicationClassifier;

impl DomainClassifier for ReplicationClassifier {
    fn domain(&self) -> Domain {
        Domain::Replication
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        if !REPLICATION_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        insert_opt(&mut fields, "peer_id", capture_str(&PEER_REGEX, msg));
        insert_opt(&mut fields, "log_queue_size", capture_i64(&LOG_QUEUE_REGEX, msg));
        insert_opt(&mut fields, "lag_ms", capture_i64(&LAG_REGEX, msg));
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    #[test]
    fn test_replication_source_stats() {
        let ctx = ClassifyContext {
            message: "regionserver.ReplicationSource: Normal source for cluster peer1: sizeOfLogQueue=17, ageOfLastShippedOp=45000",
            severity: Severity::Info,
            role: NodeRole::RegionServer,
        };
        let fields = ReplicationClassifier.classify(&ctx).unwrap();
        assert_eq!(fields.get("log_queue_size"), Some(&FieldValue::Int(17)));
        assert_eq!(fields.get("lag_ms"), Some(&FieldValue::Int(45000)));
    }
}
