//! Class analysis through the JaCoCo command-line tool.
//!
//! The merged execution data is written to a scratch exec file, `jacococli
//! report` analyzes the class files against it and emits an XML report,
//! which is then converted back into the coverage model.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{xml, CoverageEngine};
use crate::error::{MinicovError, Result};
use crate::exec::{self, ExecutionDataStore};
use crate::model::ClassCoverage;

/// Engine backed by `java -jar jacococli.jar report`.
#[derive(Debug, Clone)]
pub struct JacocoCliEngine {
    java: PathBuf,
    jar: PathBuf,
}

impl JacocoCliEngine {
    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }

    fn report_command(&self, exec_file: &Path, class_path: &Path, xml_file: &Path) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .arg("report")
            .arg(exec_file)
            .arg("--classfiles")
            .arg(class_path)
            .arg("--xml")
            .arg(xml_file)
            .arg("--quiet");
        cmd
    }
}

impl CoverageEngine for JacocoCliEngine {
    fn analyze(&self, path: &Path, store: &ExecutionDataStore) -> Result<Vec<ClassCoverage>> {
        let scratch = tempfile::tempdir()?;
        let exec_file = scratch.path().join("merged.exec");
        let xml_file = scratch.path().join("report.xml");

        let mut writer = BufWriter::new(File::create(&exec_file)?);
        exec::write_exec(&mut writer, store)?;
        writer.flush()?;
        drop(writer);

        let mut cmd = self.report_command(&exec_file, path, &xml_file);
        tracing::debug!("running {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MinicovError::Analysis {
                path: path.to_path_buf(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        let content = std::fs::read(&xml_file)?;
        xml::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_command_arguments() {
        let engine = JacocoCliEngine::new("/opt/jdk/bin/java", "/opt/jacoco/jacococli.jar");
        let cmd = engine.report_command(
            Path::new("/tmp/merged.exec"),
            Path::new("target/classes"),
            Path::new("/tmp/report.xml"),
        );

        assert_eq!(cmd.get_program(), "/opt/jdk/bin/java");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-jar",
                "/opt/jacoco/jacococli.jar",
                "report",
                "/tmp/merged.exec",
                "--classfiles",
                "target/classes",
                "--xml",
                "/tmp/report.xml",
                "--quiet",
            ]
        );
    }

    #[test]
    fn test_missing_java_is_io_error() {
        let engine = JacocoCliEngine::new("/nonexistent/bin/java", "jacococli.jar");
        let result = engine.analyze(Path::new("classes"), &ExecutionDataStore::new());
        assert!(matches!(result, Err(MinicovError::Io(_))));
    }
}
