//! Client connection and network error classifiers

use super::{ClassifyContext, DomainClassifier, capture_str, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static CLIENT_IP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)connection(?: from)?:?\s+/?(\d{1,3}(?:\.\d{1,3}){3}):\d+").unwrap());

static DISCONNECT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)client.*disconnect|disconnecting client|connection closed|closing connection").unwrap()
});

static NETWORK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(connection reset|connection refused|no route to host|broken pipe|network is unreachable|UnknownHostException|ConnectException)",
    )
    .unwrap()
});

// ============================================================================
// Client connections
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ClientConnectionClassifier;

impl DomainClassifier for ClientConnectionClassifier {
    fn domain(&self) -> Domain {
        Domain::ClientConnection
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let client_ip = capture_str(&CLIENT_IP_REGEX, msg);
        let disconnect = DISCONNECT_REGEX.is_match(msg);
        if client_ip.is_none() && !disconnect {
            return None;
        }

        let mut fields = FieldMap::new();
        insert_opt(&mut fields, "client_ip", client_ip);
        event(&mut fields, if disconnect { "disconnect" } else { "connect" });
        Some(fields)
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NetworkClassifier;

impl DomainClassifier for NetworkClassifier {
    fn domain(&self) -> Domain {
        Domain::Network
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let kind = capture_str(&NETWORK_REGEX, ctx.message)?;
        let mut fields = FieldMap::new();
        event(&mut fields, &kind.to_lowercase().replace(' ', "_"));
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    fn ctx(message: &str) -> ClassifyContext<'_> {
        ClassifyContext { message, severity: Severity::Info, role: NodeRole::RegionServer }
    }

    #[test]
    fn test_client_connection() {
        let fields = ClientConnectionClassifier
            .classify(&ctx("ipc.ServerRpcConnection: Connection from 10.25.130.7:51234, version=2.4.17"))
            .unwrap();
        assert_eq!(fields.get("client_ip"), Some(&FieldValue::Text("10.25.130.7".into())));
    }

    #[test]
    fn test_network_error() {
        let fields = NetworkClassifier
            .classify(&ctx("java.io.IOException: Connection reset by peer"))
            .unwrap();
        assert_eq!(fields.get("event"), Some(&FieldValue::Text("connection_reset".into())));
    }
}
