// Raw Data Sources
// Purpose: Seams to the collaborators that own cluster topology and raw data
// Design: async traits behind Arc<dyn ...>, swapped freely in tests

use crate::services::log_analyzer::SourceError;
use crate::services::log_analyzer::metrics::RawMetricRow;
use crate::services::log_analyzer::models::{NodeRole, TimeWindow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cluster role as reported by the topology collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusterRole {
    Master,
    Core,
}

/// One node of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub node_id: String,
    pub private_ip: String,
    pub role: ClusterRole,
}

impl ClusterNode {
    pub fn new(node_id: impl Into<String>, private_ip: impl Into<String>, role: ClusterRole) -> Self {
        Self { node_id: node_id.into(), private_ip: private_ip.into(), role }
    }

    /// CORE nodes run region servers
    pub fn log_role(&self) -> NodeRole {
        match self.role {
            ClusterRole::Master => NodeRole::Master,
            ClusterRole::Core => NodeRole::RegionServer,
        }
    }
}

/// Topology discovery
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, SourceError>;
}

/// Raw log lines and metric rows per node
#[async_trait]
pub trait RawDataSource: Send + Sync {
    /// Raw log lines of one node, oldest first
    async fn fetch_logs(
        &self,
        node: &ClusterNode,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Vec<u8>>, SourceError>;

    async fn fetch_metrics(
        &self,
        node: &ClusterNode,
        window: Option<TimeWindow>,
    ) -> Result<Vec<RawMetricRow>, SourceError>;
}

/// Fixed node list
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    nodes: Vec<ClusterNode>,
}

impl StaticTopology {
    pub fn new(nodes: Vec<ClusterNode>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl TopologySource for StaticTopology {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, SourceError> {
        Ok(self.nodes.clone())
    }
}
