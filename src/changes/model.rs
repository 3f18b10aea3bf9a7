/// How a file changed in the reviewed change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl ChangeKind {
    /// Decode the host page's status code. Accepts the single-letter lozenge
    /// (`A`, `M`, `D`, `R`) or the spelled-out word, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "a" | "added" => Some(ChangeKind::Added),
            "m" | "modified" => Some(ChangeKind::Modified),
            "d" | "deleted" | "removed" => Some(ChangeKind::Removed),
            "r" | "renamed" => Some(ChangeKind::Renamed),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeKind::Added => "+",
            ChangeKind::Modified => "~",
            ChangeKind::Removed => "-",
            ChangeKind::Renamed => "R",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Added => "ADDED",
            ChangeKind::Modified => "MODIFIED",
            ChangeKind::Removed => "DELETED",
            ChangeKind::Renamed => "RENAMED",
        }
    }

    /// Suffix of the `type-*` heading class
    pub fn css_name(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

/// One changed file as listed by the host's change summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    /// Link target of the summary entry (`#chg-...`)
    pub anchor: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind, anchor: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            anchor: anchor.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_accepts_letters() {
        assert_eq!(ChangeKind::from_code("A"), Some(ChangeKind::Added));
        assert_eq!(ChangeKind::from_code("M"), Some(ChangeKind::Modified));
        assert_eq!(ChangeKind::from_code("D"), Some(ChangeKind::Removed));
        assert_eq!(ChangeKind::from_code("R"), Some(ChangeKind::Renamed));
    }

    #[test]
    fn from_code_accepts_words_case_insensitive() {
        assert_eq!(ChangeKind::from_code("ADDED"), Some(ChangeKind::Added));
        assert_eq!(ChangeKind::from_code(" deleted "), Some(ChangeKind::Removed));
        assert_eq!(ChangeKind::from_code("Removed"), Some(ChangeKind::Removed));
        assert_eq!(ChangeKind::from_code("renamed"), Some(ChangeKind::Renamed));
    }

    #[test]
    fn from_code_unknown_returns_none() {
        assert_eq!(ChangeKind::from_code("X"), None);
        assert_eq!(ChangeKind::from_code(""), None);
    }

    #[test]
    fn removed_uses_deleted_css_name() {
        assert_eq!(ChangeKind::Removed.css_name(), "deleted");
        assert_eq!(ChangeKind::Removed.label(), "DELETED");
    }
}
