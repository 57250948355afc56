#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use minicov::engine::CoverageEngine;
use minicov::exec::{self, ExecutionData, ExecutionDataStore};
use minicov::model::{ClassCoverage, Counter, LineStatus, MethodCoverage};
use tempfile::TempDir;

/// A method whose probes map one-to-one onto consecutive source lines,
/// starting at `first_line`. `first_line: None` models missing debug info.
#[derive(Clone)]
pub struct FakeMethod {
    pub name: &'static str,
    pub desc: &'static str,
    pub first_line: Option<u32>,
    pub probes: usize,
}

#[derive(Clone)]
pub struct FakeClass {
    pub id: u64,
    pub name: &'static str,
    pub methods: Vec<FakeMethod>,
}

impl FakeClass {
    pub fn probe_count(&self) -> usize {
        self.methods.iter().map(|m| m.probes).sum()
    }
}

/// Engine that "analyzes" a class path by looking up the classes registered
/// for its file name and reading their probes from the store.
#[derive(Default)]
pub struct FakeEngine {
    classes: HashMap<String, Vec<FakeClass>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, file_name: &str, class: FakeClass) {
        self.classes
            .entry(file_name.to_string())
            .or_default()
            .push(class);
    }
}

impl CoverageEngine for FakeEngine {
    fn analyze(
        &self,
        path: &Path,
        store: &ExecutionDataStore,
    ) -> minicov::error::Result<Vec<ClassCoverage>> {
        let key = path.file_name().unwrap().to_string_lossy().into_owned();
        let Some(classes) = self.classes.get(&key) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        for fake in classes {
            let probes = store
                .get(fake.id)
                .map(|d| d.probes.clone())
                .unwrap_or_else(|| vec![false; fake.probe_count()]);

            let mut class = ClassCoverage::new(fake.name);
            let mut offset = 0;
            for fm in &fake.methods {
                let slice = &probes[offset..offset + fm.probes];
                offset += fm.probes;

                let hits = slice.iter().filter(|&&p| p).count() as u64;
                let mut method = MethodCoverage::new(fm.name, fm.desc);
                method.instructions = Counter::new(slice.len() as u64 - hits, hits);
                if let Some(first) = fm.first_line {
                    method.first_line = Some(first);
                    method.last_line = Some(first + fm.probes as u32 - 1);
                    for (i, &hit) in slice.iter().enumerate() {
                        let status = if hit {
                            LineStatus::FullyCovered
                        } else {
                            LineStatus::NotCovered
                        };
                        method.lines.insert(first + i as u32, status);
                    }
                }
                class.instructions.missed += method.instructions.missed;
                class.instructions.covered += method.instructions.covered;
                class.methods.push(method);
            }
            result.push(class);
        }
        Ok(result)
    }
}

/// Write an exec file holding the given probe arrays.
pub fn write_exec(dir: &TempDir, file_name: &str, entries: &[(u64, &str, Vec<bool>)]) -> PathBuf {
    let mut store = ExecutionDataStore::new();
    for (id, name, probes) in entries {
        store
            .put(ExecutionData::new(*id, *name, probes.clone()))
            .unwrap();
    }
    let path = dir.path().join(file_name);
    let mut file = std::fs::File::create(&path).unwrap();
    exec::write_exec(&mut file, &store).unwrap();
    path
}

/// Create an (empty) class path entry; the fake engine only looks at its name.
pub fn class_dir(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::create_dir_all(&path).unwrap();
    path
}
