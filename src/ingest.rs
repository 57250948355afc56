use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::aggregate::aggregate;
use crate::engine::CoverageEngine;
use crate::error::{InputKind, MinicovError, Result};
use crate::exec::ExecutionDataStore;
use crate::model::{ClassCoverage, ClassesCoverage};

/// Load every exec file into one store, then analyze each class path
/// against it. Returns one entry per distinct class name.
pub fn analyze_coverage(
    engine: &dyn CoverageEngine,
    exec_files: &[PathBuf],
    class_files: &[PathBuf],
) -> Result<Vec<ClassCoverage>> {
    // Fail before reading anything if an input is missing.
    check_exists(exec_files, InputKind::ExecFile)?;
    check_exists(class_files, InputKind::ClassFiles)?;

    let mut store = ExecutionDataStore::new();
    for path in exec_files {
        let read_err = |source| MinicovError::Read {
            path: path.clone(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
        engine
            .load_trace(&mut reader, &mut store)
            .map_err(|e| match e {
                MinicovError::Io(source) => read_err(source),
                other => other,
            })?;
        tracing::debug!("loaded {} ({} classes so far)", path.display(), store.len());
    }

    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    for path in class_files {
        let analyzed = engine.analyze(path, &store)?;
        tracing::debug!("analyzed {}: {} classes", path.display(), analyzed.len());
        for class in analyzed {
            if seen.insert(class.name.clone()) {
                classes.push(class);
            } else {
                tracing::warn!(
                    "class {} found again under {}, keeping the first analysis",
                    class.name,
                    path.display()
                );
            }
        }
    }
    Ok(classes)
}

/// Analyze the inputs and reduce them to the minimal report.
pub fn generate_report(
    engine: &dyn CoverageEngine,
    exec_files: &[PathBuf],
    class_files: &[PathBuf],
) -> Result<ClassesCoverage> {
    let classes = analyze_coverage(engine, exec_files, class_files)?;
    let report = aggregate(&classes);
    tracing::debug!("{} of {} classes covered", report.len(), classes.len());
    Ok(report)
}

fn check_exists(paths: &[PathBuf], kind: InputKind) -> Result<()> {
    match paths.iter().find(|p| !p.exists()) {
        Some(missing) => Err(MinicovError::PathNotFound {
            kind,
            path: missing.clone(),
        }),
        None => Ok(()),
    }
}
