pub mod diagnosis_service;
pub mod local_source;
pub mod log_analyzer;
pub mod sources;

pub use diagnosis_service::DiagnosisService;
pub use local_source::LocalDirectorySource;
pub use sources::{ClusterNode, ClusterRole, RawDataSource, StaticTopology, TopologySource};
