use crate::changes::FileChange;
use std::collections::BTreeMap;

/// Directory/file hierarchy derived from a flat change list.
///
/// Directory children and leaf lists are kept apart so that a file and a
/// directory with the same name can live side by side. A leaf list holds every
/// change reported for the same path; duplicates are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeNode {
    pub dirs: BTreeMap<String, TreeNode>,
    pub leaves: BTreeMap<String, Vec<FileChange>>,
}

/// One line of the rendered tree, in display order
#[derive(Debug, Clone, PartialEq)]
pub enum TreeRow {
    Dir { depth: usize, name: String },
    File { depth: usize, change: FileChange },
}

impl TreeRow {
    pub fn depth(&self) -> usize {
        match self {
            TreeRow::Dir { depth, .. } | TreeRow::File { depth, .. } => *depth,
        }
    }
}

/// Build the tree for a page load. Input order does not matter.
pub fn build(changes: &[FileChange]) -> TreeNode {
    let mut root = TreeNode::default();
    for change in changes {
        root.insert(change.clone());
    }
    root
}

impl TreeNode {
    fn insert(&mut self, change: FileChange) {
        let mut segments: Vec<String> = change.path.split('/').map(str::to_string).collect();
        // split always yields at least one segment
        let leaf = segments.pop().unwrap_or_default();
        let mut node = self;
        for segment in segments {
            node = node.dirs.entry(segment).or_default();
        }
        node.leaves.entry(leaf).or_default().push(change);
    }

    /// All changes terminating at `path`
    pub fn lookup(&self, path: &str) -> &[FileChange] {
        let segments: Vec<&str> = path.split('/').collect();
        let Some((leaf, dirs)) = segments.split_last() else {
            return &[];
        };
        let mut node = self;
        for segment in dirs {
            match node.dirs.get(*segment) {
                Some(child) => node = child,
                None => return &[],
            }
        }
        node.leaves.get(*leaf).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Longest path, in segments
    pub fn depth(&self) -> usize {
        let own = usize::from(!self.leaves.is_empty());
        let nested = self
            .dirs
            .values()
            .map(|d| d.depth() + 1)
            .max()
            .unwrap_or(0);
        own.max(nested)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.leaves.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.leaves.values().map(Vec::len).sum::<usize>()
            + self.dirs.values().map(TreeNode::file_count).sum::<usize>()
    }

    /// Rendered order: depth-first, each directory row before its children,
    /// directories before files at every level.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.walk(0, &mut rows);
        rows
    }

    fn walk(&self, depth: usize, rows: &mut Vec<TreeRow>) {
        for (name, child) in &self.dirs {
            rows.push(TreeRow::Dir {
                depth,
                name: name.clone(),
            });
            child.walk(depth + 1, rows);
        }
        for changes in self.leaves.values() {
            for change in changes {
                rows.push(TreeRow::File {
                    depth,
                    change: change.clone(),
                });
            }
        }
    }

    /// File changes in rendered order
    pub fn files(&self) -> Vec<&FileChange> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileChange>) {
        for child in self.dirs.values() {
            child.collect_files(out);
        }
        for changes in self.leaves.values() {
            out.extend(changes.iter());
        }
    }
}

/// Directory part of a path for display: every segment but the last
pub fn display_prefix(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// File name part of a path for display
pub fn display_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
