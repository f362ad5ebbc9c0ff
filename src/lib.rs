//! HBase Insight Library
//!
//! Diagnostic analysis engine for HBase clusters: per-node log and metric
//! ingestion, domain classification, anomaly detection and root cause ranking.

pub mod config;
pub mod services;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use services::log_analyzer::models::DiagnosisReport;
pub use services::{DiagnosisService, LocalDirectorySource};
