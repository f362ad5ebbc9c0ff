//! Slow request classifier

use super::{ClassifyContext, DomainClassifier, capture_i64};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static SLOW_QUERY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)slow query.*?(\d+)\s*ms").unwrap());

static RESPONSE_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)response time.*?(\d+)\s*ms").unwrap());

static TOO_SLOW_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((?:responseTooSlow|operationTooSlow|responseTooLarge)\)").unwrap());

static PROCESSING_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""processingtimems"\s*:\s*(\d+)"#).unwrap());

#[derive(Debug, Clone, Default)]
pub struct PerformanceClassifier;

impl DomainClassifier for PerformanceClassifier {
    fn domain(&self) -> Domain {
        Domain::Performance
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let duration = capture_i64(&SLOW_QUERY_REGEX, msg)
            .or_else(|| capture_i64(&RESPONSE_TIME_REGEX, msg))
            .or_else(|| capture_i64(&PROCESSING_TIME_REGEX, msg));

        if duration.is_none() && !TOO_SLOW_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        if let Some(ms) = duration {
            fields.insert("duration_ms".into(), ms.into());
        }
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    #[test]
    fn test_response_too_slow() {
        let ctx = ClassifyContext {
            message: r#"ipc.RpcServer: (responseTooSlow): {"call":"Multi","starttimems":1,"processingtimems":12034}"#,
            severity: Severity::Warn,
            role: NodeRole::RegionServer,
        };
        let fields = PerformanceClassifier.classify(&ctx).unwrap();
        assert_eq!(fields.get("duration_ms"), Some(&FieldValue::Int(12034)));
    }
}
