use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Events emitted by the snapshot watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The snapshot file was written, replaced or removed
    SnapshotChanged,
    /// The OS stopped delivering events
    Failed(String),
}

/// A debounced watcher on one page snapshot file.
///
/// Scrapers usually replace the file (write temp + rename), so the parent
/// directory is watched and events are filtered down to the snapshot path.
pub struct SnapshotWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
}

impl SnapshotWatcher {
    pub fn new(snapshot: &Path, debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let target = absolute(snapshot)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .context("Snapshot path has no parent directory")?;
        let file_name = target.file_name().map(|n| n.to_os_string());

        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| {
                let event = match result {
                    Ok(events) => {
                        let touched = events.iter().any(|e| {
                            e.kind == DebouncedEventKind::Any
                                && e.path.file_name().map(|n| n.to_os_string()) == file_name
                        });
                        if !touched {
                            return;
                        }
                        WatchEvent::SnapshotChanged
                    }
                    Err(e) => WatchEvent::Failed(e.to_string()),
                };
                if tx.send(event).is_err() {
                    log::debug!("Snapshot event dropped, receiver is gone");
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch '{}'", dir.display()))?;
        log::debug!("Watching {} for snapshot changes", target.display());

        Ok(SnapshotWatcher {
            _watcher: debouncer,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path))
}
