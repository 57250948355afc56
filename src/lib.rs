pub mod aggregate;
pub mod cli;
pub mod engine;
pub mod error;
pub mod exec;
pub mod ingest;
pub mod model;
pub mod report;
