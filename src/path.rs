//! Field-name path resolution.
//!
//! A field name such as `addresses[2].street` addresses a location inside the
//! nested values of a form. Parsing splits it into an ordered list of
//! [`Segment`]s: `["addresses", 2, "street"]`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// `name[1][2]`: a key followed by one or more numeric indices.
static INDEXED_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)((?:\[[0-9]+\])+)$").unwrap());

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([0-9]+)\]").unwrap());

/// A single step into a nested value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Object key access.
    Key(String),
    /// List index access.
    Index(usize),
}

impl Segment {
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Key(s.to_string())
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// Parses a dotted/bracket-indexed field name into path segments.
///
/// Total over any input: a dot-separated part whose brackets do not hold a
/// plain non-negative integer is kept as a literal key, and a name without
/// dots or brackets yields a single segment.
pub fn parse_path(name: &str) -> Vec<Segment> {
    let mut path = Vec::new();

    for part in name.split('.') {
        match INDEXED_PART_RE.captures(part) {
            Some(caps) => {
                let indices: Option<Vec<usize>> = INDEX_RE
                    .captures_iter(&caps[2])
                    .map(|c| c[1].parse::<usize>().ok())
                    .collect();
                match indices {
                    Some(indices) => {
                        path.push(Segment::Key(caps[1].to_string()));
                        path.extend(indices.into_iter().map(Segment::Index));
                    }
                    // index too large for usize
                    None => path.push(Segment::Key(part.to_string())),
                }
            }
            None => path.push(Segment::Key(part.to_string())),
        }
    }

    path
}

/// Renders segments back into field-name syntax (`a.b[0].c`).
pub fn format_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            Segment::Index(i) => {
                out.push_str(&format!("[{}]", i));
            }
        }
    }
    out
}

/// If `candidate` lies under `container` followed directly by an index
/// segment, returns that index.
///
/// Matching is over parsed segments, so `addr[0]` is never a descendant of
/// `address`.
pub fn indexed_child_index(container: &[Segment], candidate: &[Segment]) -> Option<usize> {
    if candidate.len() <= container.len() || !candidate.starts_with(container) {
        return None;
    }
    candidate[container.len()].as_index()
}

/// Whether `candidate` is an indexed descendant of `container`, i.e. has the
/// form `container[i]...`.
pub fn is_indexed_descendant(container: &str, candidate: &str) -> bool {
    indexed_child_index(&parse_path(container), &parse_path(candidate)).is_some()
}

/// Paths of every potential array container above `path`, innermost first.
///
/// Each returned prefix is immediately followed by an index segment in
/// `path`: for `a[0].b[1].c` this yields `a[0].b` then `a`.
pub fn array_ancestors(path: &[Segment]) -> Vec<&[Segment]> {
    (1..path.len())
        .rev()
        .filter(|&i| path[i].is_index())
        .map(|i| &path[..i])
        .collect()
}
