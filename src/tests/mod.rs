// Test modules

pub mod common;
mod pipeline_test;
