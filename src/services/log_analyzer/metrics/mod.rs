//! Metric ingestion: raw rows and Grafana exports into ordered series

pub mod grafana;
pub mod loader;

pub use grafana::{GrafanaExportParser, extract_node_id};
pub use loader::{LoadedMetrics, MetricSeries, MetricSeriesLoader, RawMetricRow};
