use super::model::{ChangeKind, FileChange};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

// ── Snapshot schema ──

/// An entry of the host's file-summary list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub filename: String,
    pub status_code: String,
    #[serde(default)]
    pub anchor: String,
}

/// One file section of the host's diff container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSection {
    pub path: String,
    #[serde(default)]
    pub change_kind_label: String,
    /// Element id of the section container, used as the navigation target
    #[serde(default)]
    pub anchor: String,
    /// Raw line markup as the host renders it
    #[serde(default)]
    pub lines: Vec<String>,
    /// Number of comment threads attached to the file
    #[serde(default)]
    pub comments: usize,
}

impl DiffSection {
    pub fn kind(&self) -> ChangeKind {
        ChangeKind::from_code(&self.change_kind_label).unwrap_or(ChangeKind::Modified)
    }
}

/// Everything scraped from one review page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Logical identity of the page (its path), used to derive the storage key
    pub document: String,
    #[serde(default)]
    pub files: Vec<SummaryEntry>,
    /// `None` until the host has rendered its diff container
    #[serde(default)]
    pub sections: Option<Vec<DiffSection>>,
}

impl PageSnapshot {
    pub fn parse(json: &str) -> Result<Self> {
        let mut snapshot: PageSnapshot =
            serde_json::from_str(json).context("Failed to parse page snapshot")?;
        for entry in &mut snapshot.files {
            entry.filename = entry.filename.trim().to_string();
        }
        if let Some(sections) = snapshot.sections.as_mut() {
            for (i, section) in sections.iter_mut().enumerate() {
                section.path = section.path.trim().to_string();
                if section.path.is_empty() {
                    anyhow::bail!("Diff section #{} has no file path", i);
                }
            }
        }
        Ok(snapshot)
    }

    /// Read a snapshot from disk. A missing file means the page is not there yet.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot '{}'", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid snapshot '{}'", path.display()))
            .map(Some)
    }

    pub fn has_container(&self) -> bool {
        self.sections.is_some()
    }

    pub fn sections(&self) -> &[DiffSection] {
        self.sections.as_deref().unwrap_or(&[])
    }

    /// The change list in host order. Falls back to the diff sections when the
    /// summary list is empty.
    pub fn changes(&self) -> Vec<FileChange> {
        if self.files.is_empty() {
            return self
                .sections()
                .iter()
                .map(|s| FileChange::new(s.path.clone(), s.kind(), format!("#{}", s.anchor)))
                .collect();
        }
        self.files
            .iter()
            .map(|entry| {
                let kind = ChangeKind::from_code(&entry.status_code).unwrap_or_else(|| {
                    log::warn!(
                        "Unknown status code '{}' for {}, assuming modified",
                        entry.status_code,
                        entry.filename
                    );
                    ChangeKind::Modified
                });
                FileChange::new(entry.filename.clone(), kind, entry.anchor.clone())
            })
            .collect()
    }

    /// SHA-256 over the document identity and its change list. Two snapshots
    /// with the same fingerprint belong to the same page load; only their line
    /// content may differ.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.document.as_bytes());
        hasher.update([0u8]);
        for change in self.changes() {
            hasher.update(change.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(change.kind.symbol().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([u8::from(self.has_container())]);
        format!("{:x}", hasher.finalize())
    }
}
