use crate::tree::TreeRow;

// ── Targets ──

/// Identifies one diff line: its file and its position in the section
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId {
    pub path: String,
    pub index: usize,
}

impl LineId {
    pub fn new(path: impl Into<String>, index: usize) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }
}

/// A page element the core wants to change. Per-file elements are keyed by
/// file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The host's flat file-summary list
    FileList,
    /// Scroll anchor above the tree
    TreeRoot,
    /// The diff container holding every section
    DiffRoot,
    TreeItem(String),
    Checkbox(String),
    Heading(String),
    Container(String),
    Line(LineId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

// ── Operations ──

/// A mutation requested from the page
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    ReplaceList { target: Target, rows: Vec<TreeRow> },
    AddClass { target: Target, class: String },
    RemoveClass { target: Target, class: String },
    SetStyle { target: Target, property: &'static str, value: String },
    SetChecked { target: Target, checked: bool },
    SetHtml { target: Target, html: String },
    SetLocationHash(String),
    ScrollIntoView { target: Target, behavior: ScrollBehavior },
}

impl ViewOp {
    pub fn add_class(target: Target, class: impl Into<String>) -> Self {
        ViewOp::AddClass {
            target,
            class: class.into(),
        }
    }

    pub fn remove_class(target: Target, class: impl Into<String>) -> Self {
        ViewOp::RemoveClass {
            target,
            class: class.into(),
        }
    }

    pub fn style(target: Target, property: &'static str, value: impl Into<String>) -> Self {
        ViewOp::SetStyle {
            target,
            property,
            value: value.into(),
        }
    }

    pub fn scroll(target: Target, behavior: ScrollBehavior) -> Self {
        ViewOp::ScrollIntoView { target, behavior }
    }
}

/// Receives the view mutations emitted by the core
pub trait ViewSink {
    fn apply(&mut self, op: ViewOp);
}

impl ViewSink for Vec<ViewOp> {
    fn apply(&mut self, op: ViewOp) {
        self.push(op);
    }
}

// ── Folded element state ──

#[cfg(test)]
pub use state::ViewState;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_state_tracks_classes() {
        let mut view = ViewState::default();
        let item = Target::TreeItem("a.txt".into());
        view.apply(ViewOp::add_class(item.clone(), "reviewed"));
        assert!(view.has_class(&item, "reviewed"));
        view.apply(ViewOp::remove_class(item.clone(), "reviewed"));
        assert!(!view.has_class(&item, "reviewed"));
    }

    #[test]
    fn remove_class_on_unknown_target_is_noop() {
        let mut view = ViewState::default();
        view.apply(ViewOp::remove_class(Target::DiffRoot, "hide-comments"));
        assert!(!view.has_class(&Target::DiffRoot, "hide-comments"));
    }

    #[test]
    fn view_state_keeps_latest_style_and_scroll() {
        let mut view = ViewState::default();
        let heading = Target::Heading("a.txt".into());
        view.apply(ViewOp::style(heading.clone(), "border-bottom", "0"));
        view.apply(ViewOp::style(heading.clone(), "border-bottom", "1px solid #e2e2e2"));
        view.apply(ViewOp::scroll(Target::TreeRoot, ScrollBehavior::Instant));
        assert_eq!(view.style(&heading, "border-bottom"), Some("1px solid #e2e2e2"));
        assert_eq!(
            view.last_scroll(),
            Some(&(Target::TreeRoot, ScrollBehavior::Instant))
        );
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut ops: Vec<ViewOp> = Vec::new();
        ops.apply(ViewOp::SetLocationHash("#a".into()));
        ops.apply(ViewOp::SetChecked {
            target: Target::Checkbox("a".into()),
            checked: true,
        });
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], ViewOp::SetLocationHash("#a".into()));
    }
}
