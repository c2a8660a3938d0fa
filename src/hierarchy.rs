//! Materialized-path hierarchy
//!
//! Derives parent/child relationships and sibling order from flat records whose only
//! structural signal is a dot-delimited path (`"week1.ex1"`) and a sibling `position`.
//! Everything here is pure: no state survives a call.
//!
//! Sibling order is `position` ascending, never path order. Duplicate paths are the
//! producer's problem; they do not panic here, but their relative order is unspecified.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const PATH_SEPARATOR: char = '.';

/// A record placed in the hierarchy by its materialized path.
pub trait PathRecord {
    fn record_id(&self) -> &str;
    fn path(&self) -> &str;
    fn position(&self) -> i64;
}

/// Bare hierarchy record as delivered by the course API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub path: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_derived: Option<String>,
}

impl ContentRecord {
    pub fn new(id: impl Into<String>, path: impl Into<String>, position: i64) -> Self {
        let path = path.into();
        let parent_derived = parent_path(&path).map(str::to_string);
        Self {
            id: id.into(),
            path,
            position,
            parent_derived,
        }
    }
}

impl PathRecord for ContentRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn position(&self) -> i64 {
        self.position
    }
}

/// Number of segments in `path`; 0 for an empty path.
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split(PATH_SEPARATOR).count()
    }
}

/// All segments except the last, or `None` for a root path.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once(PATH_SEPARATOR).map(|(parent, _)| parent)
}

/// Whether `path` lies strictly below `ancestor` (separator boundary respected).
pub fn is_descendant_path(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(PATH_SEPARATOR)
}

/// Whether `path` is exactly one segment below `parent`.
pub fn is_child_path(path: &str, parent: &str) -> bool {
    is_descendant_path(path, parent) && !path[parent.len() + 1..].contains(PATH_SEPARATOR)
}

fn sort_by_position<R: PathRecord>(records: &mut [&R]) {
    records.sort_by_key(|r| r.position());
}

/// Depth-1 records, by position.
pub fn roots_of<R: PathRecord>(records: &[R]) -> Vec<&R> {
    let mut roots: Vec<&R> = records.iter().filter(|r| depth(r.path()) == 1).collect();
    sort_by_position(&mut roots);
    roots
}

/// Direct children of `parent`, by position.
///
/// `"a.bc"` is a child of `"a"`, `"a.b.c"` is not, and `"ab"` never is.
pub fn children_of<'a, R: PathRecord>(parent: &R, records: &'a [R]) -> Vec<&'a R> {
    let mut children: Vec<&R> = records
        .iter()
        .filter(|r| is_child_path(r.path(), parent.path()))
        .collect();
    sort_by_position(&mut children);
    children
}

/// True iff any record lies below `record`.
pub fn has_children<R: PathRecord>(record: &R, records: &[R]) -> bool {
    records
        .iter()
        .any(|r| is_descendant_path(r.path(), record.path()))
}

pub fn parent_path_of<R: PathRecord>(record: &R) -> Option<&str> {
    parent_path(record.path())
}

/// Per-call index over one record set.
///
/// Same answers as the free functions, computed in one pass so that materializing
/// thousands of siblings does not rescan the set for every `has_children` check.
pub struct HierarchyIndex<'a, R> {
    roots: Vec<&'a R>,
    children: HashMap<&'a str, Vec<&'a R>>,
    with_descendants: HashSet<&'a str>,
}

impl<'a, R: PathRecord> HierarchyIndex<'a, R> {
    pub fn build(records: &'a [R]) -> Self {
        let mut roots = Vec::new();
        let mut children: HashMap<&'a str, Vec<&'a R>> = HashMap::new();
        let mut with_descendants = HashSet::new();

        for record in records {
            let path = record.path();
            if path.is_empty() {
                continue;
            }
            match parent_path(path) {
                None => roots.push(record),
                Some(parent) => children.entry(parent).or_default().push(record),
            }
            let mut ancestor = parent_path(path);
            while let Some(current) = ancestor {
                if !with_descendants.insert(current) {
                    break;
                }
                ancestor = parent_path(current);
            }
        }

        sort_by_position(&mut roots);
        for siblings in children.values_mut() {
            sort_by_position(siblings);
        }

        Self {
            roots,
            children,
            with_descendants,
        }
    }

    pub fn roots(&self) -> &[&'a R] {
        &self.roots
    }

    pub fn children_of_path(&self, path: &str) -> &[&'a R] {
        self.children.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, parent: &R) -> &[&'a R] {
        self.children_of_path(parent.path())
    }

    pub fn has_children_path(&self, path: &str) -> bool {
        self.with_descendants.contains(path)
    }

    pub fn has_children(&self, record: &R) -> bool {
        self.has_children_path(record.path())
    }
}
