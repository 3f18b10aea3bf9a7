use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement for a stripped `+`/`-`, keeps columns aligned
pub const NBSP: &str = "&nbsp;";

/// Semantic kind of one rendered diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Insertion,
    Deletion,
    ConflictStart,
    ConflictEnd,
    ConflictSeparator,
}

/// How the line should be presented after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTone {
    Plain,
    /// Conflict banner annotation
    Warning,
    /// Minimal-height separator between conflict sides
    Divider,
}

/// A classified line and its rewritten markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLineRecord {
    pub raw_html: String,
    pub kind: LineKind,
    pub normalized_html: String,
    pub tone: LineTone,
}

impl DiffLineRecord {
    pub fn changed(&self) -> bool {
        self.raw_html != self.normalized_html
    }
}

// Markers arrive HTML-escaped and may follow indentation or an `&nbsp;`
// left behind by an earlier rewrite.
static CONFLICT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s|&nbsp;)*(?:&lt;){7,}").expect("conflict start regex should be valid")
});
static CONFLICT_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s|&nbsp;)*(?:&gt;){7,}").expect("conflict end regex should be valid")
});
static CONFLICT_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s|&nbsp;)*={7}(?:\s|&nbsp;)*$")
        .expect("conflict separator regex should be valid")
});
static CONFLICT_META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(source|destination):([0-9a-fA-F]+):(.*)$")
        .expect("conflict metadata regex should be valid")
});

/// First match wins: conflict start, conflict end, separator, +/-, context.
pub fn classify(raw: &str) -> LineKind {
    if CONFLICT_START_RE.is_match(raw) {
        LineKind::ConflictStart
    } else if CONFLICT_END_RE.is_match(raw) {
        LineKind::ConflictEnd
    } else if CONFLICT_SEPARATOR_RE.is_match(raw) {
        LineKind::ConflictSeparator
    } else if raw.starts_with('+') {
        LineKind::Insertion
    } else if raw.starts_with('-') {
        LineKind::Deletion
    } else {
        LineKind::Context
    }
}

/// Rewrite a line of the given kind. Pure; never fails.
pub fn rewrite(raw: &str, kind: LineKind) -> (String, LineTone) {
    match kind {
        LineKind::Insertion | LineKind::Deletion => (format!("{}{}", NBSP, &raw[1..]), LineTone::Plain),
        LineKind::ConflictStart | LineKind::ConflictEnd => {
            (conflict_annotation(raw), LineTone::Warning)
        }
        LineKind::ConflictSeparator => (String::new(), LineTone::Divider),
        LineKind::Context => (raw.to_string(), LineTone::Plain),
    }
}

/// Classify and rewrite in one step
pub fn normalize(raw: &str) -> DiffLineRecord {
    let kind = classify(raw);
    let (normalized_html, tone) = rewrite(raw, kind);
    DiffLineRecord {
        raw_html: raw.to_string(),
        kind,
        normalized_html,
        tone,
    }
}

/// `" role: sha6: label"`, or the line with its marker removed when the
/// metadata is not there. The fallback always starts with whitespace and
/// never reads as a separator, so it classifies as context next time.
fn conflict_annotation(raw: &str) -> String {
    let rest = strip_markers(raw);
    match CONFLICT_META_RE.captures(rest) {
        Some(caps) => {
            let sha = &caps[2];
            format!(" {}: {}: {}", &caps[1], &sha[..sha.len().min(6)], &caps[3])
        }
        None => {
            log::debug!("Conflict marker without metadata: {}", raw);
            let text = if rest.starts_with(char::is_whitespace) {
                rest.to_string()
            } else {
                format!(" {}", rest)
            };
            if CONFLICT_SEPARATOR_RE.is_match(&text) {
                text.replacen('=', "&#61;", 1)
            } else {
                text
            }
        }
    }
}

fn strip_markers(mut s: &str) -> &str {
    loop {
        let found = CONFLICT_START_RE
            .find(s)
            .or_else(|| CONFLICT_END_RE.find(s));
        match found {
            Some(m) => s = &s[m.end()..],
            None => return s,
        }
    }
}
