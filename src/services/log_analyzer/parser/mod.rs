//! Log parsing module
//!
//! - `core`: header, timestamp and value parsing
//! - `specialized`: one classifier per technical domain
//! - `event_parser`: composes both into a record stream

pub mod core;
pub mod error;
pub mod event_parser;
pub mod specialized;

pub use error::{ParseError, ParseResult};
pub use event_parser::{EventParser, ParseStats, RecordIter};
pub use specialized::{ClassifierRegistry, ClassifyContext, DomainClassifier, get_all_classifiers};
