//! One page load: the tree, both controllers and every line observation.
//!
//! A session is created once the host has rendered its diff container and
//! lives until the container goes away. Nothing outlives [`Session::teardown`].

use super::collapse::CollapseController;
use super::view::{LineId, ScrollBehavior, Target, ViewOp, ViewSink};
use crate::changes::{DiffSection, FileChange, PageSnapshot};
use crate::config::RtConfig;
use crate::diff::{DiffLineRecord, LineTone, ObservationHandle, ObserveLimits, ObserveMode, Observations};
use crate::review::{storage_key, ReviewStateStore, ReviewSyncController, Storage};
use crate::tree::{self, display_name, display_prefix, TreeNode};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

const PINNED_BORDER: &str = "1px solid #e2e2e2";
const WARNING_COLOR: &str = "#8a6d3b";
const WARNING_BACKGROUND: &str = "#fcf8e3";
const DIVIDER_HEIGHT: &str = "2px";

pub struct Session {
    key: String,
    fingerprint: String,
    changes: Vec<FileChange>,
    tree: TreeNode,
    sections: Vec<DiffSection>,
    /// path -> index into `sections`
    section_index: HashMap<String, usize>,
    lines: HashMap<String, Vec<DiffLineRecord>>,
    review: ReviewSyncController,
    collapse: CollapseController,
    observations: Observations,
    handles: Vec<ObservationHandle>,
    pinned_heading: Option<String>,
}

impl Session {
    /// Build the session for a freshly rendered page and push the initial
    /// view: tree, heading styles, checkbox marks, normalized lines.
    pub fn start(
        snapshot: &PageSnapshot,
        storage: Box<dyn Storage>,
        config: &RtConfig,
        mode: ObserveMode,
        now: Instant,
        sink: &mut dyn ViewSink,
    ) -> Result<Self> {
        if !snapshot.has_container() {
            anyhow::bail!("Diff container for {} has not rendered", snapshot.document);
        }
        let key = storage_key(&config.storage.namespace, &snapshot.document);
        let changes = snapshot.changes();
        let tree = tree::build(&changes);

        let sections: Vec<DiffSection> = unique_sections(snapshot).cloned().collect();
        if sections.len() < snapshot.sections().len() {
            log::warn!(
                "{} duplicate diff section(s) ignored, keeping the first of each path",
                snapshot.sections().len() - sections.len()
            );
        }
        let section_index = sections
            .iter()
            .enumerate()
            .map(|(i, section)| (section.path.clone(), i))
            .collect();

        let review = ReviewSyncController::load(ReviewStateStore::new(storage), key.clone(), &changes);
        let collapse = CollapseController::new(&config.collapse.lock_patterns);
        let observations = Observations::new(mode, ObserveLimits::from(&config.observe));

        let mut session = Self {
            key,
            fingerprint: snapshot.fingerprint(),
            changes,
            tree,
            sections,
            section_index,
            lines: HashMap::new(),
            review,
            collapse,
            observations,
            handles: Vec::new(),
            pinned_heading: None,
        };

        sink.apply(ViewOp::ReplaceList {
            target: Target::FileList,
            rows: session.tree.rows(),
        });
        session.render_headings(sink);
        session
            .collapse
            .apply_initial(&session.changes, session.review.state(), sink);
        session.review.apply_initial(sink);
        session.observe_lines(snapshot, now, sink);

        log::debug!(
            "Session {} started: {} file(s), {} observed line(s)",
            session.key,
            session.changes.len(),
            session.handles.len()
        );
        Ok(session)
    }

    fn render_headings(&self, sink: &mut dyn ViewSink) {
        for section in &self.sections {
            let prefix = display_prefix(&section.path);
            let name = display_name(&section.path);
            let html = if prefix.is_empty() {
                format!("<b>{}</b>", name)
            } else {
                format!("{}/<b>{}</b>", prefix, name)
            };
            sink.apply(ViewOp::SetHtml {
                target: Target::Heading(section.path.clone()),
                html,
            });
        }
    }

    /// Start observing every line of every section, and any line the host
    /// appended since the last call. Returns how many new lines were rewritten.
    pub fn observe_lines(&mut self, snapshot: &PageSnapshot, now: Instant, sink: &mut dyn ViewSink) -> usize {
        let mut rewritten = 0;
        for section in unique_sections(snapshot) {
            let known = self.lines.get(&section.path).map(Vec::len).unwrap_or(0);
            for (index, raw) in section.lines.iter().enumerate().skip(known) {
                let id = LineId::new(section.path.clone(), index);
                self.handles.push(self.observations.observe(id.clone(), now));
                let record = self
                    .observations
                    .on_mutation(&id, raw, now)
                    .unwrap_or_else(|| crate::diff::normalize(raw));
                if record.changed() {
                    rewritten += 1;
                }
                apply_record(&id, &record, sink);
                self.lines.entry(section.path.clone()).or_default().push(record);
            }
        }
        rewritten
    }

    // ── Line mutations ──

    /// The host replaced a line's markup. Returns whether it was rewritten.
    pub fn on_line_mutation(
        &mut self,
        id: &LineId,
        raw: &str,
        now: Instant,
        sink: &mut dyn ViewSink,
    ) -> bool {
        let Some(slot) = self
            .lines
            .get_mut(&id.path)
            .and_then(|lines| lines.get_mut(id.index))
        else {
            return false;
        };
        if slot.raw_html == raw || slot.normalized_html == raw {
            return false;
        }
        match self.observations.on_mutation(id, raw, now) {
            Some(record) => {
                apply_record(id, &record, sink);
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Feed every changed line of a same-page snapshot to its observer.
    /// Returns how many lines were rewritten.
    pub fn sync_lines(&mut self, snapshot: &PageSnapshot, now: Instant, sink: &mut dyn ViewSink) -> usize {
        let mut rewritten = 0;
        for section in unique_sections(snapshot) {
            for (index, raw) in section.lines.iter().enumerate() {
                let id = LineId::new(section.path.clone(), index);
                if self.on_line_mutation(&id, raw, now, sink) {
                    rewritten += 1;
                }
            }
        }
        rewritten + self.observe_lines(snapshot, now, sink)
    }

    /// Periodic work: re-read due lines in polling mode, then dispose quiet
    /// observers.
    pub fn tick(&mut self, snapshot: Option<&PageSnapshot>, now: Instant, sink: &mut dyn ViewSink) {
        if let Some(snapshot) = snapshot {
            for id in self.observations.due_polls(now) {
                let raw = snapshot
                    .sections()
                    .iter()
                    .find(|s| s.path == id.path)
                    .and_then(|s| s.lines.get(id.index));
                if let Some(raw) = raw {
                    self.on_line_mutation(&id, raw, now, sink);
                }
            }
        }
        if self.observations.sweep(now) > 0 {
            self.handles.retain(ObservationHandle::is_active);
        }
    }

    // ── User actions ──

    pub fn toggle_reviewed(
        &mut self,
        path: &str,
        checked: bool,
        propagate_to_all: bool,
        sink: &mut dyn ViewSink,
    ) {
        self.review
            .toggle(path, checked, propagate_to_all, &mut self.collapse, sink);
    }

    pub fn toggle_collapse(&mut self, path: &str, apply_to_all: bool, sink: &mut dyn ViewSink) -> bool {
        self.collapse.toggle(path, apply_to_all, sink)
    }

    /// A file comment was opened on `path`
    pub fn reveal(&mut self, path: &str, sink: &mut dyn ViewSink) {
        self.collapse.reveal(path, sink);
    }

    pub fn set_hide_comments(&mut self, hide: bool, sink: &mut dyn ViewSink) {
        self.collapse.set_hide_comments(hide, sink);
    }

    pub fn set_hide_deletions(&mut self, hide: bool, sink: &mut dyn ViewSink) {
        self.collapse.set_hide_deletions(hide, sink);
    }

    pub fn scroll_to_tree(&self, sink: &mut dyn ViewSink) {
        sink.apply(ViewOp::scroll(Target::TreeRoot, ScrollBehavior::Instant));
    }

    /// Navigate to the first unreviewed file in tree order. Filters are
    /// cleared first, whether or not anything is left to review.
    pub fn jump_to_next_unreviewed(&mut self, sink: &mut dyn ViewSink) -> Option<FileChange> {
        self.collapse.reset_filters(sink);
        let change = self.review.find_next_unreviewed(&self.tree)?.clone();
        sink.apply(ViewOp::SetLocationHash(self.anchor_for(&change)));
        if self.collapse.is_collapsed(&change.path) {
            self.collapse.expand(&change.path, sink);
            sink.apply(ViewOp::scroll(
                Target::Container(change.path.clone()),
                ScrollBehavior::Smooth,
            ));
        }
        Some(change)
    }

    /// Location hash of a file's diff section, falling back to the summary link
    pub fn anchor_for(&self, change: &FileChange) -> String {
        let anchor = self
            .section(&change.path)
            .map(|s| s.anchor.as_str())
            .filter(|a| !a.is_empty())
            .unwrap_or(change.anchor.as_str());
        if anchor.starts_with('#') {
            anchor.to_string()
        } else {
            format!("#{}", anchor)
        }
    }

    /// The heading stuck to the top of the viewport changed. Collapsed files
    /// never get the pinned border.
    pub fn pin_heading(&mut self, path: Option<&str>, sink: &mut dyn ViewSink) {
        let path = path.filter(|p| !self.collapse.is_collapsed(p));
        if self.pinned_heading.as_deref() == path {
            return;
        }
        if let Some(prev) = self.pinned_heading.take() {
            sink.apply(ViewOp::style(Target::Heading(prev), "border-bottom", "0"));
        }
        if let Some(p) = path {
            sink.apply(ViewOp::style(
                Target::Heading(p.to_string()),
                "border-bottom",
                PINNED_BORDER,
            ));
            self.pinned_heading = Some(p.to_string());
        }
    }

    /// Release every observation. The session is inert afterwards.
    pub fn teardown(&mut self) {
        let released = self.handles.len();
        self.handles.clear();
        log::debug!("Session {} torn down, released {} observer(s)", self.key, released);
    }

    // ── Accessors ──

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    pub fn review(&self) -> &ReviewSyncController {
        &self.review
    }

    pub fn collapse(&self) -> &CollapseController {
        &self.collapse
    }

    pub fn section(&self, path: &str) -> Option<&DiffSection> {
        self.section_index.get(path).map(|&i| &self.sections[i])
    }

    pub fn sections(&self) -> &[DiffSection] {
        &self.sections
    }

    /// Current records of a file's lines
    pub fn lines(&self, path: &str) -> &[DiffLineRecord] {
        self.lines.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn live_observers(&self) -> usize {
        self.observations.active_count()
    }
}

/// Sections in host order, skipping any later section for a path already seen
fn unique_sections(snapshot: &PageSnapshot) -> impl Iterator<Item = &DiffSection> {
    let mut seen = HashSet::new();
    snapshot
        .sections()
        .iter()
        .filter(move |section| seen.insert(section.path.as_str()))
}

fn apply_record(id: &LineId, record: &DiffLineRecord, sink: &mut dyn ViewSink) {
    let target = Target::Line(id.clone());
    if record.changed() {
        sink.apply(ViewOp::SetHtml {
            target: target.clone(),
            html: record.normalized_html.clone(),
        });
    }
    match record.tone {
        LineTone::Plain => {}
        LineTone::Warning => {
            sink.apply(ViewOp::style(target.clone(), "color", WARNING_COLOR));
            sink.apply(ViewOp::style(target, "background", WARNING_BACKGROUND));
        }
        LineTone::Divider => {
            sink.apply(ViewOp::style(target, "height", DIVIDER_HEIGHT));
        }
    }
}
