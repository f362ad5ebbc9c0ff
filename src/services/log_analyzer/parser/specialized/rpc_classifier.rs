//! RPC handler and call queue classifier

use super::{ClassifyContext, DomainClassifier, capture_i64, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static HANDLER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhandler=(\d+)").unwrap());

static QUEUE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:queue|callQueueLen|queueSize)=(\d+)").unwrap());

static QUEUE_FULL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:call )?queue (?:is )?full|queue overflow|CallQueueTooBigException").unwrap()
});

static RPC_SERVER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bRpcServer\b.*(?i:responder|handler|listener)").unwrap());

#[derive(Debug, Clone, Default)]
pub struct RpcHandlerClassifier;

impl DomainClassifier for RpcHandlerClassifier {
    fn domain(&self) -> Domain {
        Domain::RpcHandler
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let handlers = capture_i64(&HANDLER_REGEX, msg);
        let queue = capture_i64(&QUEUE_REGEX, msg);
        let full = QUEUE_FULL_REGEX.is_match(msg);

        if handlers.is_none() && queue.is_none() && !full && !RPC_SERVER_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        insert_opt(&mut fields, "active_handlers", handlers);
        insert_opt(&mut fields, "queue_size", queue);
        event(&mut fields, if full { "queue_full" } else { "rpc" });
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    #[test]
    fn test_queue_full() {
        let ctx = ClassifyContext {
            message: "ipc.RpcServer: Call queue is full on default.FPBQ.Fifo.handler=29,queue=2,port=16020",
            severity: Severity::Warn,
            role: NodeRole::RegionServer,
        };
        let fields = RpcHandlerClassifier.classify(&ctx).unwrap();
        assert_eq!(fields.get("active_handlers"), Some(&FieldValue::Int(29)));
        assert_eq!(fields.get("queue_size"), Some(&FieldValue::Int(2)));
        assert_eq!(fields.get("event"), Some(&FieldValue::Text("queue_full".into())));
    }
}
