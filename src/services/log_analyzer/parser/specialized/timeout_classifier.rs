//! Timeout and retry classifier

use super::{ClassifyContext, DomainClassifier, capture_i64, capture_str, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static TIMEOUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)timed out|\btimeout\b|CallTimeoutException|SocketTimeoutException|RetriesExhaustedException|\bretrying\b|\btries=\d+|\bretries=\d+",
    )
    .unwrap()
});

static TIMEOUT_MS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:timeout=|timed out after |callTimeout=|timeout of )(\d+)\s*(?:ms)?").unwrap()
});

static RETRY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:tries|retries|attempt|retry)[=#\s]+(\d+)").unwrap());

static OPERATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:method(?:Name)?|operation)[=:\s]+(\w+)").unwrap());

static EXCEPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\w*(?:Timeout|Retries\w*)Exception)\b").unwrap());

#[derive(Debug, Clone, Default)]
pub struct TimeoutRetryClassifier;

impl DomainClassifier for TimeoutRetryClassifier {
    fn domain(&self) -> Domain {
        Domain::TimeoutRetry
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        if !TIMEOUT_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        let operation = capture_str(&OPERATION_REGEX, msg).or_else(|| capture_str(&EXCEPTION_REGEX, msg));
        insert_opt(&mut fields, "operation", operation);
        insert_opt(&mut fields, "timeout_ms", capture_i64(&TIMEOUT_MS_REGEX, msg));
        insert_opt(&mut fields, "retry_count", capture_i64(&RETRY_REGEX, msg));
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    fn ctx(message: &str) -> ClassifyContext<'_> {
        ClassifyContext { message, severity: Severity::Warn, role: NodeRole::RegionServer }
    }

    #[test]
    fn test_call_timeout() {
        let fields = TimeoutRetryClassifier
            .classify(&ctx("client.RpcRetryingCaller: Call exception, tries=7, retries=16, started=38000 ms ago, method=Get, callTimeout=60000"))
            .unwrap();
        assert_eq!(fields.get("retry_count"), Some(&FieldValue::Int(7)));
        assert_eq!(fields.get("timeout_ms"), Some(&FieldValue::Int(60000)));
        assert_eq!(fields.get("operation"), Some(&FieldValue::Text("Get".into())));
    }

    #[test]
    fn test_socket_timeout_exception() {
        let fields = TimeoutRetryClassifier
            .classify(&ctx("java.net.SocketTimeoutException: 20000 millis timeout while waiting"))
            .unwrap();
        assert_eq!(
            fields.get("operation"),
            Some(&FieldValue::Text("SocketTimeoutException".into()))
        );
    }
}
