// Common test utilities and helpers

use crate::config::Config;
use crate::services::log_analyzer::models::TimeWindow;
use crate::services::log_analyzer::{RawMetricRow, SourceError};
use crate::services::sources::{ClusterNode, ClusterRole, RawDataSource, StaticTopology, TopologySource};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 2025-09-12 16:00:00 UTC
pub const BASE: i64 = 1_757_692_800;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE + secs, 0).unwrap()
}

/// One HBase log4j line at `BASE + secs`
pub fn log_line(secs: i64, level: &str, msg: &str) -> String {
    format!("{} {:<5} [main] {}", at(secs).format("%Y-%m-%d %H:%M:%S,000"), level, msg)
}

pub const WAL_SLOW_SYNC: &str = "wal.FSHLog: Slow sync cost: 300 ms, current pipeline: []";
pub const SERVING: &str = "regionserver.HRegionServer: Serving as rs1";
pub const CLIENT_CONNECT: &str = "ipc.ServerRpcConnection: Connection from 10.25.130.7:51234, version=2.4.17";
pub const CALL_QUEUE_FULL: &str =
    "ipc.RpcServer: Call queue is full on default.FPBQ.Fifo.handler=29,queue=2,port=16020";
pub const CALL_RETRY: &str = "client.RpcRetryingCaller: Call exception, tries=7, retries=16, started=38000 ms ago, method=Get, callTimeout=60000";

/// 1000 lines at 1/s; three of every five are slow WAL syncs
pub fn wal_scenario() -> Vec<String> {
    (0..1000)
        .map(|i| if i % 5 < 3 { log_line(i, "WARN", WAL_SLOW_SYNC) } else { log_line(i, "INFO", SERVING) })
        .collect()
}

/// Core node named after its private ip
pub fn core_node(last_octet: u8) -> ClusterNode {
    ClusterNode::new(
        format!("ip-10-0-0-{}", last_octet),
        format!("10.0.0.{}", last_octet),
        ClusterRole::Core,
    )
}

/// Config with defaults and a short node budget
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.analysis.node_task_budget_secs = 10;
    config
}

/// In-memory raw data keyed by node id
#[derive(Default)]
pub struct MockSource {
    logs: HashMap<String, Vec<String>>,
    metrics: HashMap<String, Vec<RawMetricRow>>,
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(mut self, node_id: &str, lines: Vec<String>) -> Self {
        self.logs.insert(node_id.to_string(), lines);
        self
    }

    pub fn with_metrics(mut self, node_id: &str, rows: Vec<RawMetricRow>) -> Self {
        self.metrics.insert(node_id.to_string(), rows);
        self
    }

    /// Log fetches for `node_id` sleep before answering
    pub fn with_delay(mut self, node_id: &str, delay: Duration) -> Self {
        self.delays.insert(node_id.to_string(), delay);
        self
    }

    /// Log fetches for `node_id` fail
    pub fn with_failure(mut self, node_id: &str) -> Self {
        self.failing.push(node_id.to_string());
        self
    }
}

#[async_trait]
impl RawDataSource for MockSource {
    async fn fetch_logs(
        &self,
        node: &ClusterNode,
        _window: Option<TimeWindow>,
    ) -> Result<Vec<Vec<u8>>, SourceError> {
        if let Some(delay) = self.delays.get(&node.node_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&node.node_id) {
            return Err(SourceError::Unavailable(format!("no logs for {}", node.node_id)));
        }
        Ok(self
            .logs
            .get(&node.node_id)
            .map(|lines| lines.iter().map(|l| l.clone().into_bytes()).collect())
            .unwrap_or_default())
    }

    async fn fetch_metrics(
        &self,
        node: &ClusterNode,
        _window: Option<TimeWindow>,
    ) -> Result<Vec<RawMetricRow>, SourceError> {
        Ok(self.metrics.get(&node.node_id).cloned().unwrap_or_default())
    }
}

/// Topology whose discovery call fails
pub struct BrokenTopology;

#[async_trait]
impl TopologySource for BrokenTopology {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, SourceError> {
        Err(SourceError::Unavailable("cluster API unreachable".to_string()))
    }
}

pub fn topology(nodes: Vec<ClusterNode>) -> Arc<dyn TopologySource> {
    Arc::new(StaticTopology::new(nodes))
}
