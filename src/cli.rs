//! Command handler for the minicov CLI.
//!
//! `cmd_report` returns its output as a `String`, making it easy to test
//! without capturing stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::engine::CoverageEngine;
use crate::{ingest, report};

/// Generate the report for the given inputs and write it to `json`.
pub fn cmd_report(
    engine: &dyn CoverageEngine,
    exec_files: &[PathBuf],
    class_files: &[PathBuf],
    json: &Path,
) -> Result<String> {
    let coverage = ingest::generate_report(engine, exec_files, class_files)
        .context("Failed to generate coverage report")?;
    let written = report::write_report(&coverage, json)?;
    Ok(format!("Report generated: {}\n", written.display()))
}
