//! Core library: scanning, content extraction, ownership and type
//! classification, reporting.

pub mod classifier;
pub mod config;
pub mod expectations;
pub mod extractor;
pub mod models;
pub mod ownership;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod scanner;
