//! Grafana panel export parser
//!
//! Reads the `download.json` produced by Grafana's "Inspect → Data → Download"
//! action:
//!
//! ```text
//! { "series": [ { "name": "Total: ip-10-25-130-219",
//!                 "fields": [ { "type": "time",   "values": [1757692800000, ...] },
//!                             { "type": "number", "values": [12, ...] } ] } ] }
//! ```
//!
//! Each series becomes rows for the node named in the series name.

use super::loader::RawMetricRow;
use crate::services::log_analyzer::error::DataQualityError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

static NODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"ip-\d+-\d+-\d+-\d+").unwrap());

#[derive(Debug, Deserialize)]
struct GrafanaExport {
    #[serde(default)]
    series: Vec<GrafanaSeries>,
}

#[derive(Debug, Deserialize)]
struct GrafanaSeries {
    #[serde(default)]
    name: String,
    #[serde(default)]
    fields: Vec<GrafanaField>,
}

#[derive(Debug, Deserialize)]
struct GrafanaField {
    #[serde(rename = "type", default)]
    field_type: String,
    #[serde(default)]
    values: Vec<Option<f64>>,
}

/// Extract a node id (`ip-a-b-c-d`) from a series or file name
pub fn extract_node_id(name: &str) -> Option<String> {
    NODE_REGEX.find(name).map(|m| m.as_str().to_string())
}

pub struct GrafanaExportParser;

impl GrafanaExportParser {
    /// Parse an export into rows keyed by node id.
    ///
    /// Null values are skipped; series without a recognizable node fall back
    /// to the series name after any "Total: " prefix.
    pub fn parse(
        json: &str,
        metric_name: &str,
    ) -> Result<BTreeMap<String, Vec<RawMetricRow>>, DataQualityError> {
        let export: GrafanaExport = serde_json::from_str(json)
            .map_err(|e| DataQualityError::MalformedExport(e.to_string()))?;

        let mut rows: BTreeMap<String, Vec<RawMetricRow>> = BTreeMap::new();
        for series in export.series {
            let node_id = extract_node_id(&series.name).unwrap_or_else(|| {
                series.name.trim_start_matches("Total:").trim().to_string()
            });
            if node_id.is_empty() {
                tracing::warn!("Skipping Grafana series without a name");
                continue;
            }

            let times = series.fields.iter().find(|f| f.field_type == "time");
            let values = series.fields.iter().find(|f| f.field_type == "number");
            let (Some(times), Some(values)) = (times, values) else {
                tracing::warn!("Series {} has no time/number columns", series.name);
                continue;
            };

            if times.values.len() != values.values.len() {
                tracing::warn!(
                    "Series {}: {} timestamps vs {} values, extra points ignored",
                    series.name,
                    times.values.len(),
                    values.values.len()
                );
            }

            let entry = rows.entry(node_id).or_default();
            for (ts, value) in times.values.iter().zip(values.values.iter()) {
                let (Some(ts), Some(value)) = (ts, value) else {
                    continue;
                };
                if let Some(timestamp) = DateTime::<Utc>::from_timestamp_millis(*ts as i64) {
                    entry.push(RawMetricRow::new(metric_name, timestamp, *value));
                }
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "series": [
            { "name": "Total: ip-10-25-130-219",
              "fields": [
                { "name": "Time", "type": "time", "values": [1757692800000, 1757692860000, 1757692920000] },
                { "name": "Value", "type": "number", "values": [12, null, 59] }
              ] },
            { "name": "Total: ip-10-25-130-220",
              "fields": [
                { "name": "Time", "type": "time", "values": [1757692800000] },
                { "name": "Value", "type": "number", "values": [3.5] }
              ] }
        ]
    }"#;

    #[test]
    fn test_parse_export() {
        let rows = GrafanaExportParser::parse(EXPORT, "rpc_handler_active").unwrap();
        assert_eq!(rows.len(), 2);
        let first = &rows["ip-10-25-130-219"];
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].value, 59.0);
        assert_eq!(first[1].metric_name, "rpc_handler_active");
    }

    #[test]
    fn test_malformed_export() {
        assert!(GrafanaExportParser::parse("{ not json", "m").is_err());
    }

    #[test]
    fn test_extract_node_id() {
        assert_eq!(
            extract_node_id("hbase-regionserver-ip-10-1-2-3.log.gz").as_deref(),
            Some("ip-10-1-2-3")
        );
        assert_eq!(extract_node_id("hbase.log"), None);
    }
}
