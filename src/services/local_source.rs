// Local Directory Source
// Purpose: Serve topology, logs and metrics from downloaded files on disk
// Design: Scan once on construction, read file contents lazily per node
//
// Log files follow the collector's naming, e.g.
//   hbase-hbase-regionserver-ip-10-25-130-219.log.2025-09-12-16.gz
//   hbase-hbase-master-ip-10-25-130-10.log
// Metric files are Grafana exports named after the metric, e.g.
//   rpc_queue_length.json (plain download.json holds handler counts)

use super::sources::{ClusterNode, ClusterRole, RawDataSource, TopologySource};
use crate::services::log_analyzer::SourceError;
use crate::services::log_analyzer::metrics::{GrafanaExportParser, RawMetricRow, extract_node_id};
use crate::services::log_analyzer::models::TimeWindow;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Metric name used for a bare `download.json`
const DEFAULT_EXPORT_METRIC: &str = "rpc_handler_active";

#[derive(Debug, Clone, Default)]
struct NodeFiles {
    role: Option<ClusterRole>,
    logs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalDirectorySource {
    nodes: BTreeMap<String, NodeFiles>,
    metrics: BTreeMap<String, Vec<RawMetricRow>>,
}

impl LocalDirectorySource {
    /// Scan the log and metric directories; either may be absent
    pub fn scan(log_dir: Option<&Path>, metrics_dir: Option<&Path>) -> Result<Self, SourceError> {
        let mut source = Self::default();
        if let Some(dir) = log_dir {
            source.scan_logs(dir)?;
        }
        if let Some(dir) = metrics_dir {
            source.scan_metrics(dir)?;
        }
        tracing::info!(
            "Local source: {} node(s) with logs, {} node(s) with metrics",
            source.nodes.values().filter(|n| !n.logs.is_empty()).count(),
            source.metrics.len()
        );
        Ok(source)
    }

    fn scan_logs(&mut self, dir: &Path) -> Result<(), SourceError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_log_file(name) {
                tracing::debug!("Skipping non-log file {}", path.display());
                continue;
            }

            let node_id = node_id_from_file_name(name);
            let role = if name.to_lowercase().contains("master") {
                ClusterRole::Master
            } else {
                ClusterRole::Core
            };
            let files = self.nodes.entry(node_id).or_default();
            // Any master file marks the whole node as MASTER
            if files.role != Some(ClusterRole::Master) {
                files.role = Some(role);
            }
            files.logs.push(path);
        }

        for files in self.nodes.values_mut() {
            files.logs.sort_by(|a, b| log_order_key(a).cmp(&log_order_key(b)));
        }
        Ok(())
    }

    fn scan_metrics(&mut self, dir: &Path) -> Result<(), SourceError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let metric_name = metric_name_from_path(&path);
            let content = fs::read_to_string(&path)?;
            match GrafanaExportParser::parse(&content, &metric_name) {
                Ok(per_node) => {
                    for (node_id, rows) in per_node {
                        self.nodes.entry(node_id.clone()).or_default();
                        self.metrics.entry(node_id).or_default().extend(rows);
                    }
                },
                Err(e) => tracing::warn!("Skipping metric export {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    fn read_log_file(path: &Path) -> Result<Vec<u8>, SourceError> {
        let raw = fs::read(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            let mut decoded = Vec::with_capacity(raw.len() * 4);
            GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            Ok(decoded)
        } else {
            Ok(raw)
        }
    }
}

fn is_log_file(name: &str) -> bool {
    name.contains(".log") || name.contains(".out") || name.ends_with(".gz")
}

/// Node id embedded in the file name, otherwise the name up to the first dot
fn node_id_from_file_name(name: &str) -> String {
    extract_node_id(name).unwrap_or_else(|| name.split('.').next().unwrap_or(name).to_string())
}

/// Rotated files first in name order, the live file last
fn log_order_key(path: &Path) -> (bool, String) {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let live = name.ends_with(".log") || name.ends_with(".out") || name.ends_with(".log.gz");
    (live, name.to_string())
}

fn metric_name_from_path(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    if stem.is_empty() || stem.starts_with("download") {
        DEFAULT_EXPORT_METRIC.to_string()
    } else {
        stem.to_string()
    }
}

/// `ip-10-25-130-219` → `10.25.130.219`
fn private_ip(node_id: &str) -> String {
    node_id.strip_prefix("ip-").map(|ip| ip.replace('-', ".")).unwrap_or_default()
}

fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    let mut lines: Vec<Vec<u8>> = content.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[async_trait]
impl TopologySource for LocalDirectorySource {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, SourceError> {
        Ok(self
            .nodes
            .iter()
            .map(|(node_id, files)| {
                ClusterNode::new(
                    node_id.clone(),
                    private_ip(node_id),
                    files.role.unwrap_or(ClusterRole::Core),
                )
            })
            .collect())
    }
}

#[async_trait]
impl RawDataSource for LocalDirectorySource {
    async fn fetch_logs(
        &self,
        node: &ClusterNode,
        _window: Option<TimeWindow>,
    ) -> Result<Vec<Vec<u8>>, SourceError> {
        let Some(files) = self.nodes.get(&node.node_id) else {
            return Ok(Vec::new());
        };

        let paths = files.logs.clone();
        let node_id = node.node_id.clone();
        tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            for path in &paths {
                let content = Self::read_log_file(path)?;
                tracing::debug!("Node {}: read {} bytes from {}", node_id, content.len(), path.display());
                lines.extend(split_lines(&content));
            }
            Ok::<_, SourceError>(lines)
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("log reader task failed: {}", e)))?
    }

    async fn fetch_metrics(
        &self,
        node: &ClusterNode,
        _window: Option<TimeWindow>,
    ) -> Result<Vec<RawMetricRow>, SourceError> {
        Ok(self.metrics.get(&node.node_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_from_file_name() {
        assert_eq!(
            node_id_from_file_name("hbase-hbase-regionserver-ip-10-25-130-219.log.2025-09-12-16.gz"),
            "ip-10-25-130-219"
        );
        assert_eq!(node_id_from_file_name("rs1.log"), "rs1");
    }

    #[test]
    fn test_metric_name_from_path() {
        assert_eq!(metric_name_from_path(Path::new("/m/download.json")), "rpc_handler_active");
        assert_eq!(metric_name_from_path(Path::new("/m/gc_pause_ms.export.json")), "gc_pause_ms");
    }

    #[test]
    fn test_log_order_live_last() {
        let mut paths = vec![
            PathBuf::from("rs-ip-1-2-3-4.log"),
            PathBuf::from("rs-ip-1-2-3-4.log.2025-09-12-17.gz"),
            PathBuf::from("rs-ip-1-2-3-4.log.2025-09-12-16.gz"),
        ];
        paths.sort_by(|a, b| log_order_key(a).cmp(&log_order_key(b)));
        assert_eq!(paths[0], PathBuf::from("rs-ip-1-2-3-4.log.2025-09-12-16.gz"));
        assert_eq!(paths[2], PathBuf::from("rs-ip-1-2-3-4.log"));
    }

    #[test]
    fn test_split_lines_and_ip() {
        assert_eq!(split_lines(b"a\nb\n").len(), 2);
        assert_eq!(split_lines(b"").len(), 0);
        assert_eq!(private_ip("ip-10-25-130-219"), "10.25.130.219");
        assert_eq!(private_ip("rs1"), "");
    }
}
