use super::view::{ScrollBehavior, Target, ViewOp, ViewSink};
use crate::changes::{ChangeKind, FileChange};
use crate::diff::{DiffLineRecord, LineKind};
use crate::review::ReviewState;
use glob::{MatchOptions, Pattern};
use std::collections::HashMap;

pub const COLLAPSED: &str = "collapsed";
pub const HIDE_COMMENTS: &str = "hide-comments";
pub const HIDE_DELETIONS: &str = "hide-deletions";

const HEADING_GRADIENT: &str = "linear-gradient(0deg, #ceffd7 0, #ffffff 100%)";
const REMOVED_HEADING_GRADIENT: &str =
    "linear-gradient(0deg, rgb(255, 223, 224) 0px, rgb(255, 255, 255) 100%)";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// View-only projections over the diff. Neither touches review state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewFilters {
    pub hide_comments: bool,
    pub hide_deletions: bool,
}

/// Expand/collapse state of every file section
pub struct CollapseController {
    order: Vec<String>,
    collapsed: HashMap<String, bool>,
    lock_patterns: Vec<Pattern>,
    filters: ViewFilters,
}

impl CollapseController {
    /// Invalid patterns are skipped.
    pub fn new(lock_patterns: &[String]) -> Self {
        let lock_patterns = lock_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Ignoring lock pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self {
            order: Vec::new(),
            collapsed: HashMap::new(),
            lock_patterns,
            filters: ViewFilters::default(),
        }
    }

    fn register(&mut self, path: &str) {
        if !self.collapsed.contains_key(path) {
            self.order.push(path.to_string());
            self.collapsed.insert(path.to_string(), false);
        }
    }

    pub fn is_lock_file(&self, path: &str) -> bool {
        self.lock_patterns
            .iter()
            .any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    pub fn should_auto_collapse(&self, change: &FileChange, state: &ReviewState) -> bool {
        change.kind == ChangeKind::Removed
            || self.is_lock_file(&change.path)
            || state.is_reviewed(&change.path)
    }

    /// Style every heading and collapse what should start collapsed
    pub fn apply_initial(
        &mut self,
        changes: &[FileChange],
        state: &ReviewState,
        sink: &mut dyn ViewSink,
    ) {
        for change in changes {
            self.register(&change.path);
            let heading = Target::Heading(change.path.clone());
            sink.apply(ViewOp::add_class(heading.clone(), "file-heading"));
            sink.apply(ViewOp::add_class(
                heading.clone(),
                format!("type-{}", change.kind.css_name()),
            ));
            let gradient = if change.kind == ChangeKind::Removed {
                REMOVED_HEADING_GRADIENT
            } else {
                HEADING_GRADIENT
            };
            sink.apply(ViewOp::style(heading, "background", gradient));

            if self.should_auto_collapse(change, state) {
                self.collapse(&change.path, sink);
            }
        }
    }

    #[cfg(test)]
    fn files(&self) -> &[String] {
        &self.order
    }

    pub fn is_collapsed(&self, path: &str) -> bool {
        self.collapsed.get(path).copied().unwrap_or(false)
    }

    pub fn collapse(&mut self, path: &str, sink: &mut dyn ViewSink) {
        self.set_collapsed(path, true, sink);
    }

    pub fn expand(&mut self, path: &str, sink: &mut dyn ViewSink) {
        self.set_collapsed(path, false, sink);
    }

    fn set_collapsed(&mut self, path: &str, value: bool, sink: &mut dyn ViewSink) {
        self.register(path);
        self.collapsed.insert(path.to_string(), value);
        let container = Target::Container(path.to_string());
        if value {
            sink.apply(ViewOp::add_class(container, COLLAPSED));
        } else {
            sink.apply(ViewOp::remove_class(container, COLLAPSED));
        }
    }

    /// Flip `path` and mirror the new value onto it, or onto every file.
    /// Returns the new collapsed value.
    pub fn toggle(&mut self, path: &str, apply_to_all: bool, sink: &mut dyn ViewSink) -> bool {
        let value = !self.is_collapsed(path);
        let targets: Vec<String> = if apply_to_all {
            self.order.clone()
        } else {
            vec![path.to_string()]
        };
        for target in &targets {
            self.set_collapsed(target, value, sink);
        }
        value
    }

    /// Bring a file into view for a new comment: expand it if needed, then
    /// scroll its section to the top.
    pub fn reveal(&mut self, path: &str, sink: &mut dyn ViewSink) {
        if self.is_collapsed(path) {
            self.expand(path, sink);
        }
        sink.apply(ViewOp::scroll(
            Target::Container(path.to_string()),
            ScrollBehavior::Smooth,
        ));
    }

    // ── Filters ──

    pub fn filters(&self) -> ViewFilters {
        self.filters
    }

    pub fn set_hide_comments(&mut self, hide: bool, sink: &mut dyn ViewSink) {
        self.filters.hide_comments = hide;
        toggle_root_class(HIDE_COMMENTS, hide, sink);
    }

    pub fn set_hide_deletions(&mut self, hide: bool, sink: &mut dyn ViewSink) {
        self.filters.hide_deletions = hide;
        toggle_root_class(HIDE_DELETIONS, hide, sink);
    }

    pub fn reset_filters(&mut self, sink: &mut dyn ViewSink) {
        if self.filters.hide_comments {
            self.set_hide_comments(false, sink);
        }
        if self.filters.hide_deletions {
            self.set_hide_deletions(false, sink);
        }
    }

    /// Lines left visible by the active filters
    pub fn visible_lines<'a>(&self, records: &'a [DiffLineRecord]) -> Vec<&'a DiffLineRecord> {
        records
            .iter()
            .filter(|r| !(self.filters.hide_deletions && r.kind == LineKind::Deletion))
            .collect()
    }

    pub fn shows_comments(&self) -> bool {
        !self.filters.hide_comments
    }
}

fn toggle_root_class(class: &str, on: bool, sink: &mut dyn ViewSink) {
    if on {
        sink.apply(ViewOp::add_class(Target::DiffRoot, class));
    } else {
        sink.apply(ViewOp::remove_class(Target::DiffRoot, class));
    }
}
