//! Reduction of analyzed classes to the minimal covered-lines report.

use std::collections::btree_map::Entry;

use crate::model::{ClassCoverage, ClassesCoverage, LinesCoverage, MethodCoverage, MethodsCoverage};

/// Build the report for every class with at least one covered instruction.
#[must_use]
pub fn aggregate(classes: &[ClassCoverage]) -> ClassesCoverage {
    let mut report = ClassesCoverage::new();
    for class in classes {
        if class.instructions.covered == 0 {
            continue;
        }
        report.insert(class.qualified_name(), aggregate_class(class));
    }
    report
}

/// Covered methods of one class. May be empty when the class counters show
/// coverage but no single method does; the class is still reported then.
#[must_use]
pub fn aggregate_class(class: &ClassCoverage) -> MethodsCoverage {
    let mut methods = MethodsCoverage::new();
    for method in &class.methods {
        if method.instructions.covered == 0 {
            continue;
        }
        let lines = aggregate_method(method);
        match methods.entry(method_id(&method.name, &method.desc)) {
            Entry::Vacant(entry) => {
                entry.insert(lines);
            }
            // Overloads differing only in return type (bridge methods).
            Entry::Occupied(mut entry) => {
                tracing::debug!(
                    "merging lines of {}.{}{} into {}",
                    class.name,
                    method.name,
                    method.desc,
                    entry.key()
                );
                let existing = entry.get_mut();
                // An empty list stands for the whole method and absorbs any
                // detail from the other.
                if existing.is_empty() || lines.is_empty() {
                    existing.clear();
                } else {
                    existing.extend(lines);
                    existing.sort_unstable();
                    existing.dedup();
                }
            }
        }
    }
    methods
}

/// Covered lines of a method, ascending.
///
/// Returns an empty list when the method has no line information, or when
/// any line in its range cannot be resolved: the method then counts as
/// covered as a whole rather than with partial detail.
#[must_use]
pub fn aggregate_method(method: &MethodCoverage) -> LinesCoverage {
    let (Some(first), Some(last)) = (method.first_line, method.last_line) else {
        return LinesCoverage::new();
    };

    let mut covered = LinesCoverage::new();
    for nr in first..=last {
        match method.line(nr) {
            Some(status) if status.is_covered() => covered.push(nr),
            Some(_) => {}
            None => return LinesCoverage::new(),
        }
    }
    covered
}

/// Method identifier: the name followed by the parameter part of the
/// descriptor, e.g. `equals(Ljava/lang/Object;)`.
#[must_use]
pub fn method_id(name: &str, desc: &str) -> String {
    format!("{}{}", name, trim_descriptor(desc))
}

/// Cut the return type off a method descriptor, keeping everything up to
/// and including the first `)`. A descriptor without `)` is returned whole.
#[must_use]
pub fn trim_descriptor(desc: &str) -> &str {
    match desc.find(')') {
        Some(end) => &desc[..=end],
        None => desc,
    }
}
