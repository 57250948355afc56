pub mod jacoco;
pub mod xml;

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::exec::{self, ExecutionDataStore};
use crate::model::ClassCoverage;

pub use jacoco::JacocoCliEngine;

/// Capability of an analysis engine: turn execution traces plus compiled
/// classes into per-class coverage.
pub trait CoverageEngine {
    /// Accumulate one execution trace into `store`. Traces from several
    /// inputs merge into the same store.
    fn load_trace(&self, input: &mut dyn Read, store: &mut ExecutionDataStore) -> Result<()> {
        exec::read_exec(input, store)
    }

    /// Analyze a class file, or every class file below a directory, against
    /// the merged execution data.
    fn analyze(&self, path: &Path, store: &ExecutionDataStore) -> Result<Vec<ClassCoverage>>;
}
