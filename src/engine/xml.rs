/// Conversion of a JaCoCo XML report into the coverage model.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <package name="com/example">
///       <class name="com/example/Foo" sourcefilename="Foo.java">
///         <method name="doStuff" desc="()V" line="10">
///           <counter type="INSTRUCTION" missed="0" covered="5"/>
///           ...
///         </method>
///         <counter type="INSTRUCTION" missed="2" covered="10"/>
///         ...
///       </class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///         ...
///       </sourcefile>
///     </package>
///   </report>
///
/// Methods only carry their first line, and line data lives per source
/// file rather than per method. Once a package is complete, each method is
/// given the lines from its first line onwards whose instructions add up to
/// the method's own instruction count. Methods whose lines cannot be told
/// apart from another method's get no line data at all.
use std::collections::{BTreeMap, HashMap};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{MinicovError, Result};
use crate::model::{ClassCoverage, Counter, LineStatus, MethodCoverage};

/// One `<line>` of a source file.
#[derive(Debug, Clone, Copy)]
struct SourceLine {
    status: LineStatus,
    /// Instructions of every method on this line, missed and covered.
    instructions: u64,
}

/// Line data by line number, for one source file.
type SourceLines = BTreeMap<u32, SourceLine>;

/// Classes and source files of the package currently being read.
#[derive(Default)]
struct PackageScope {
    classes: Vec<ClassCoverage>,
    sources: HashMap<String, SourceLines>,
}

/// A method's first line within its source file.
struct MethodStart<'a> {
    line: u32,
    class: &'a str,
    name: &'a str,
    instructions: u64,
    /// Class and method position within the package.
    index: (usize, usize),
}

impl MethodStart<'_> {
    /// Whether this method's lines may sit inside `owner`'s: lambdas and
    /// other compiler-generated methods of the same class, and any method of
    /// a class nested in the owner's.
    fn is_nested_in(&self, owner: &MethodStart<'_>) -> bool {
        if self.class == owner.class {
            return self.name.contains('$');
        }
        self.class
            .strip_prefix(owner.class)
            .is_some_and(|rest| rest.starts_with('$'))
    }
}

impl PackageScope {
    /// Attach line data to every method whose lines can be identified, then
    /// hand back the classes.
    fn resolve(mut self) -> Vec<ClassCoverage> {
        let resolved = self.method_lines();
        for class in &mut self.classes {
            for method in &mut class.methods {
                method.last_line = method.first_line;
            }
        }
        for ((ci, mi), lines) in resolved {
            let method = &mut self.classes[ci].methods[mi];
            method.last_line = lines.keys().next_back().copied().or(method.first_line);
            method.lines = lines;
        }
        self.classes
    }

    fn method_lines(&self) -> Vec<((usize, usize), BTreeMap<u32, LineStatus>)> {
        // Method starts per source file, across every class compiled from it.
        let mut starts: HashMap<&str, Vec<MethodStart<'_>>> = HashMap::new();
        for (ci, class) in self.classes.iter().enumerate() {
            let Some(source) = class.source_file.as_deref() else {
                continue;
            };
            for (mi, method) in class.methods.iter().enumerate() {
                if let Some(line) = method.first_line {
                    starts.entry(source).or_default().push(MethodStart {
                        line,
                        class: &class.name,
                        name: &method.name,
                        instructions: method.instructions.total(),
                        index: (ci, mi),
                    });
                }
            }
        }

        let mut resolved = Vec::new();
        for (source, list) in &mut starts {
            // No line data for this source file: the start is known, the
            // content is not.
            let Some(lines) = self.sources.get(*source) else {
                continue;
            };
            list.sort_by_key(|s| s.line);
            let list = &*list;

            let ranges: Vec<_> = list.iter().map(|owner| lines_of(owner, list, lines)).collect();
            // A nested method whose lines fall inside its enclosing method's
            // range shares them with it.
            let enclosed = |owner: &MethodStart<'_>| {
                list.iter().zip(&ranges).any(|(other, range)| {
                    other.index != owner.index
                        && owner.is_nested_in(other)
                        && range.as_ref().is_some_and(|r| r.contains_key(&owner.line))
                })
            };
            let shared: Vec<bool> = list.iter().map(enclosed).collect();

            for ((owner, range), shared) in list.iter().zip(ranges).zip(shared) {
                match range {
                    Some(range) if !shared => resolved.push((owner.index, range)),
                    _ => tracing::debug!(
                        "no line detail for {}.{}: lines shared with another method",
                        owner.class,
                        owner.name
                    ),
                }
            }
        }
        resolved
    }
}

/// Lines belonging to `owner`, or `None` when they cannot be told apart
/// from another method's.
///
/// Walks the source lines from the method's first line, summing their
/// instructions until they match the method's own plus those of the methods
/// nested in it. Overshooting the sum, running out of lines, or passing the
/// start of a method that is not nested makes the range ambiguous.
fn lines_of(
    owner: &MethodStart<'_>,
    starts: &[MethodStart<'_>],
    lines: &SourceLines,
) -> Option<BTreeMap<u32, LineStatus>> {
    let mut others = starts
        .iter()
        .filter(|s| s.index != owner.index && s.line >= owner.line)
        .peekable();
    let mut expected = owner.instructions;
    let mut seen = 0;

    for (&nr, line) in lines.range(owner.line..) {
        while let Some(other) = others.next_if(|s| s.line <= nr) {
            if !other.is_nested_in(owner) {
                return None;
            }
            expected += other.instructions;
        }
        seen += line.instructions;
        if seen > expected {
            return None;
        }
        if seen == expected {
            let status = |n: u32| lines.get(&n).map_or(LineStatus::Empty, |l| l.status);
            return Some((owner.line..=nr).map(|n| (n, status(n))).collect());
        }
    }
    None
}
/// Parse a JaCoCo XML report.
pub fn parse(input: &[u8]) -> Result<Vec<ClassCoverage>> {
    let mut xml = Reader::from_reader(input);
    xml.trim_text(true);
    let mut buf = Vec::new();

    let mut classes = Vec::new();
    let mut package = PackageScope::default();
    let mut current_class: Option<ClassCoverage> = None;
    let mut current_method: Option<MethodCoverage> = None;
    let mut current_source: Option<(String, SourceLines)> = None;

    loop {
        let event = xml.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(e, &xml)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"class" => {
                    let mut class = ClassCoverage::new(get_attr(e, b"name").unwrap_or_default());
                    class.source_file = get_attr(e, b"sourcefilename");
                    if is_start_event {
                        current_class = Some(class);
                    } else {
                        package.classes.push(class);
                    }
                }
                b"method" => {
                    let mut method = MethodCoverage::new(
                        get_attr(e, b"name").unwrap_or_default(),
                        get_attr(e, b"desc").unwrap_or_default(),
                    );
                    method.first_line = get_attr(e, b"line").and_then(|v| v.parse().ok());
                    if is_start_event {
                        current_method = Some(method);
                    } else if let Some(class) = current_class.as_mut() {
                        class.methods.push(method);
                    }
                }
                b"counter" => {
                    // Only instruction counters matter; the innermost open
                    // element owns the counter.
                    if get_attr(e, b"type").as_deref() == Some("INSTRUCTION") {
                        let counter = Counter::new(get_num(e, b"missed"), get_num(e, b"covered"));
                        if let Some(method) = current_method.as_mut() {
                            method.instructions = counter;
                        } else if let Some(class) = current_class.as_mut() {
                            class.instructions = counter;
                        }
                    }
                }
                b"sourcefile" if is_start_event => {
                    current_source = get_attr(e, b"name").map(|name| (name, SourceLines::new()));
                }
                b"line" => {
                    if let Some((_, lines)) = current_source.as_mut() {
                        if let Some(nr) = get_attr(e, b"nr").and_then(|v| v.parse::<u32>().ok()) {
                            let instructions = Counter::new(get_num(e, b"mi"), get_num(e, b"ci"));
                            let branches = Counter::new(get_num(e, b"mb"), get_num(e, b"cb"));
                            lines.insert(
                                nr,
                                SourceLine {
                                    status: LineStatus::from_counters(instructions, branches),
                                    instructions: instructions.total(),
                                },
                            );
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"method" => {
                    if let (Some(method), Some(class)) =
                        (current_method.take(), current_class.as_mut())
                    {
                        class.methods.push(method);
                    }
                }
                b"class" => {
                    if let Some(class) = current_class.take() {
                        package.classes.push(class);
                    }
                }
                b"sourcefile" => {
                    if let Some((name, lines)) = current_source.take() {
                        package.sources.insert(name, lines);
                    }
                }
                b"package" => {
                    classes.extend(std::mem::take(&mut package).resolve());
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    // Classes reported outside of any <package> element.
    classes.extend(package.resolve());
    Ok(classes)
}

fn xml_err(source: quick_xml::Error, xml: &Reader<&[u8]>) -> MinicovError {
    MinicovError::Xml {
        source,
        position: xml.buffer_position(),
    }
}

fn get_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn get_num(e: &BytesStart<'_>, name: &[u8]) -> u64 {
    get_attr(e, name).and_then(|v| v.parse().ok()).unwrap_or(0)
}
