use super::store::{ReviewState, ReviewStateStore};
use crate::app::collapse::CollapseController;
use crate::app::view::{ScrollBehavior, Target, ViewOp, ViewSink};
use crate::changes::FileChange;
use crate::tree::TreeNode;
use std::collections::HashSet;

pub const REVIEWED: &str = "reviewed";
pub const UN_REVIEWED: &str = "un-reviewed";

/// Keeps the tree view, the diff checkboxes and persisted review state in
/// step. Owns the live [`ReviewState`] of one session.
pub struct ReviewSyncController {
    store: ReviewStateStore,
    key: String,
    state: ReviewState,
    files: Vec<String>,
}

impl ReviewSyncController {
    /// Load the stored state for `key` and remember the page's files
    pub fn load(store: ReviewStateStore, key: impl Into<String>, changes: &[FileChange]) -> Self {
        let key = key.into();
        let state = store.load(&key);
        let mut seen = HashSet::with_capacity(changes.len());
        let files: Vec<String> = changes
            .iter()
            .filter(|change| seen.insert(change.path.as_str()))
            .map(|change| change.path.clone())
            .collect();
        Self {
            store,
            key,
            state,
            files,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn is_reviewed(&self, path: &str) -> bool {
        self.state.is_reviewed(path)
    }

    /// Mark every known file in both views according to the loaded state
    pub fn apply_initial(&self, sink: &mut dyn ViewSink) {
        for path in &self.files {
            mark(path, self.state.is_reviewed(path), sink);
        }
    }

    /// Set `path` (or every known file) reviewed or not, update both views
    /// and persist once.
    pub fn toggle(
        &mut self,
        path: &str,
        checked: bool,
        propagate_to_all: bool,
        collapse: &mut CollapseController,
        sink: &mut dyn ViewSink,
    ) {
        let affected: Vec<String> = if propagate_to_all {
            self.files.clone()
        } else {
            vec![path.to_string()]
        };
        let newly_reviewed: Vec<String> = affected
            .iter()
            .filter(|p| checked && !self.state.is_reviewed(p))
            .cloned()
            .collect();

        let next = affected
            .iter()
            .fold(self.state.clone(), |state, p| state.set_reviewed(p, checked));
        self.state = next;
        self.store.save(&self.key, &self.state);
        log::debug!(
            "Marked {} file(s) {}",
            affected.len(),
            if checked { REVIEWED } else { UN_REVIEWED }
        );

        for p in &affected {
            mark(p, checked, sink);
        }

        if !checked {
            return;
        }
        let to_collapse: Vec<&String> = if propagate_to_all {
            newly_reviewed
                .iter()
                .filter(|p| !collapse.is_collapsed(p))
                .collect()
        } else {
            affected
                .iter()
                .filter(|p| !collapse.is_collapsed(p))
                .collect()
        };
        for p in &to_collapse {
            collapse.collapse(p, sink);
        }
        if !to_collapse.is_empty() {
            sink.apply(ViewOp::scroll(Target::TreeRoot, ScrollBehavior::Instant));
        }
    }

    /// First file in rendered tree order that is not reviewed
    pub fn find_next_unreviewed<'a>(&self, tree: &'a TreeNode) -> Option<&'a FileChange> {
        tree.files()
            .into_iter()
            .find(|change| !self.state.is_reviewed(&change.path))
    }

    /// `(reviewed, total)` over the page's files
    pub fn reviewed_count(&self) -> (usize, usize) {
        let reviewed = self
            .files
            .iter()
            .filter(|p| self.state.is_reviewed(p))
            .count();
        (reviewed, self.files.len())
    }
}

fn mark(path: &str, reviewed: bool, sink: &mut dyn ViewSink) {
    sink.apply(ViewOp::SetChecked {
        target: Target::Checkbox(path.to_string()),
        checked: reviewed,
    });
    let item = Target::TreeItem(path.to_string());
    let (on, off) = if reviewed {
        (REVIEWED, UN_REVIEWED)
    } else {
        (UN_REVIEWED, REVIEWED)
    };
    sink.apply(ViewOp::add_class(item.clone(), on));
    sink.apply(ViewOp::remove_class(item, off));
}
