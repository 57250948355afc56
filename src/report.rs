//! JSON output for the minimal coverage report.
//!
//! Layout: every object entry sits on its own line, indented two spaces per
//! level, written as `"key":value` without spaces. Arrays of line numbers
//! stay on one line (`[12,13,20]`). Empty containers render as `{ }` and
//! `[ ]`. There is no trailing newline.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::{MinicovError, Result};
use crate::model::ClassesCoverage;

const INDENT: &[u8] = b"  ";

/// Pretty-printer with indented objects and inline arrays.
#[derive(Debug, Default)]
pub struct CompactEntriesFormatter {
    depth: usize,
    has_value: bool,
}

impl CompactEntriesFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn newline<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b"\n")?;
        for _ in 0..self.depth {
            writer.write_all(INDENT)?;
        }
        Ok(())
    }
}

impl Formatter for CompactEntriesFormatter {
    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.depth -= 1;
        if self.has_value {
            self.newline(writer)?;
        } else {
            writer.write_all(b" ")?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b":")
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !self.has_value {
            writer.write_all(b" ")?;
        }
        writer.write_all(b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b",")
        }
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }
}

/// Serialize the report to its canonical JSON text.
pub fn to_json(report: &ClassesCoverage) -> Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CompactEntriesFormatter::new());
    report.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Write the report to `path`, replacing any existing file, and return the
/// absolute path of the written file.
pub fn write_report(report: &ClassesCoverage, path: &Path) -> Result<PathBuf> {
    let json = to_json(report)?;
    let write_err = |source| MinicovError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(path, json).map_err(write_err)?;
    std::path::absolute(path).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MethodsCoverage;

    fn report(entries: &[(&str, &[(&str, &[u32])])]) -> ClassesCoverage {
        entries
            .iter()
            .map(|(class, methods)| {
                let methods: MethodsCoverage = methods
                    .iter()
                    .map(|(id, lines)| (id.to_string(), lines.to_vec()))
                    .collect();
                (class.to_string(), methods)
            })
            .collect()
    }

    #[test]
    fn test_single_method_layout() {
        let json = to_json(&report(&[("a.B", &[("m()", &[10])])])).unwrap();
        assert_eq!(json, "{\n  \"a.B\":{\n    \"m()\":[10]\n  }\n}");
    }

    #[test]
    fn test_empty_line_list() {
        let json = to_json(&report(&[("a.B", &[("m()", &[])])])).unwrap();
        assert_eq!(json, "{\n  \"a.B\":{\n    \"m()\":[ ]\n  }\n}");
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(to_json(&ClassesCoverage::new()).unwrap(), "{ }");
        let json = to_json(&report(&[("a.B", &[])])).unwrap();
        assert_eq!(json, "{\n  \"a.B\":{ }\n}");
    }

    #[test]
    fn test_multiple_entries_are_sorted() {
        let json = to_json(&report(&[
            (
                "com.example.MyClass",
                &[
                    ("otherMethod()", &[]),
                    ("myMethod(Ljava/lang/String;)", &[12, 13, 20]),
                ],
            ),
            ("com.example.Another", &[("<init>()", &[3])]),
        ]))
        .unwrap();
        let expected = "{\n\
            \x20 \"com.example.Another\":{\n\
            \x20   \"<init>()\":[3]\n\
            \x20 },\n\
            \x20 \"com.example.MyClass\":{\n\
            \x20   \"myMethod(Ljava/lang/String;)\":[12,13,20],\n\
            \x20   \"otherMethod()\":[ ]\n\
            \x20 }\n\
            }";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_output_parses_back() {
        let original = report(&[("a.B", &[("m(I)", &[1, 2]), ("n()", &[])])]);
        let json = to_json(&original).unwrap();
        let parsed: ClassesCoverage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        std::fs::write(&path, "stale content that is longer than the report").unwrap();

        let written = write_report(&report(&[("a.B", &[("m()", &[10])])]), &path).unwrap();

        assert!(written.is_absolute());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n  \"a.B\":{\n    \"m()\":[10]\n  }\n}"
        );
    }

    #[test]
    fn test_write_report_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("coverage.json");

        let result = write_report(&ClassesCoverage::new(), &path);
        let err = result.unwrap_err();
        assert!(matches!(err, MinicovError::Write { .. }));
        assert!(err.to_string().contains("no-such-dir"), "{err}");
    }
}
