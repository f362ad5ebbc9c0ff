//! Core parsing components shared by the event parser and classifiers

pub mod header_parser;
pub mod timestamp_parser;
pub mod value_parser;

pub use header_parser::{HeaderParser, LineHeader};
pub use timestamp_parser::TimestampParser;
pub use value_parser::ValueParser;
