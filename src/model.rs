//! In-memory representation of analyzed coverage, as produced by a
//! [`CoverageEngine`](crate::engine::CoverageEngine), and the nested report
//! shape that the aggregator builds from it.

use std::collections::BTreeMap;

/// Missed/covered pair for one kind of countable item (instructions,
/// branches).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    #[must_use]
    pub fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.missed + self.covered
    }
}

/// Coverage status of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// The line carries no instructions (blank line, comment, declaration).
    Empty,
    NotCovered,
    PartlyCovered,
    FullyCovered,
}

impl LineStatus {
    /// Derive the status of a line from its instruction and branch counters.
    ///
    /// Missed items mark the line as not covered, covered items as fully
    /// covered; a mix of both is partly covered.
    #[must_use]
    pub fn from_counters(instructions: Counter, branches: Counter) -> Self {
        let missed = instructions.missed > 0 || branches.missed > 0;
        let covered = instructions.covered > 0 || branches.covered > 0;
        match (missed, covered) {
            (false, false) => LineStatus::Empty,
            (true, false) => LineStatus::NotCovered,
            (false, true) => LineStatus::FullyCovered,
            (true, true) => LineStatus::PartlyCovered,
        }
    }

    /// Whether at least one instruction on the line was executed.
    #[must_use]
    pub fn is_covered(self) -> bool {
        matches!(self, LineStatus::PartlyCovered | LineStatus::FullyCovered)
    }
}

/// Coverage of a single method.
#[derive(Debug, Clone, Default)]
pub struct MethodCoverage {
    pub name: String,
    /// Type descriptor, e.g. `(Ljava/lang/String;)V`.
    pub desc: String,
    pub instructions: Counter,
    /// First source line, `None` when the class has no line debug info.
    pub first_line: Option<u32>,
    /// Last source line, `None` when the class has no line debug info.
    pub last_line: Option<u32>,
    /// Per-line status inside `first_line..=last_line`. A line missing from
    /// the map means the engine has no information about it.
    pub lines: BTreeMap<u32, LineStatus>,
}

impl MethodCoverage {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            ..Default::default()
        }
    }

    /// Status of line `nr`, or `None` when nothing is known about it.
    #[must_use]
    pub fn line(&self, nr: u32) -> Option<LineStatus> {
        self.lines.get(&nr).copied()
    }
}

/// Coverage of a single class.
#[derive(Debug, Clone, Default)]
pub struct ClassCoverage {
    /// Internal, slash-separated class name (`com/example/Foo`).
    pub name: String,
    pub source_file: Option<String>,
    pub instructions: Counter,
    pub methods: Vec<MethodCoverage>,
}

impl ClassCoverage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fully-qualified, dot-separated class name (`com.example.Foo`).
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.name.replace('/', ".")
    }
}

/// Covered source lines of one method, ascending. Empty when the method was
/// executed but no line granularity is available.
pub type LinesCoverage = Vec<u32>;

/// Covered methods of one class, keyed by name plus parameter descriptor.
pub type MethodsCoverage = BTreeMap<String, LinesCoverage>;

/// Covered classes, keyed by fully-qualified class name.
pub type ClassesCoverage = BTreeMap<String, MethodsCoverage>;
