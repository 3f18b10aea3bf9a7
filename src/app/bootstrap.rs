use super::session::Session;
use super::view::ViewSink;
use crate::changes::PageSnapshot;
use crate::config::RtConfig;
use crate::diff::ObserveMode;
use crate::review::Storage;
use anyhow::{Context, Result};
use std::time::Instant;

/// Opens the storage backend for each new session
pub type StorageFactory = Box<dyn FnMut() -> Result<Box<dyn Storage>>>;

/// What a snapshot did to the page lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No diff container yet (or a failed start is waiting for a change)
    Waiting,
    Started,
    /// The page changed underneath a live session
    Rebuilt,
    /// Same page; this many lines were rewritten
    Updated(usize),
    /// The container went away; the session is gone
    TornDown,
    Failed,
}

/// Outermost entry point. Starts exactly one session per page load, tears it
/// down when the diff container disappears and re-arms for the next one.
pub struct Bootstrap {
    config: RtConfig,
    mode: ObserveMode,
    storage: StorageFactory,
    session: Option<Session>,
    latest: Option<PageSnapshot>,
    /// Fingerprint of a page whose start failed; retried only once it changes
    failed: Option<String>,
}

impl Bootstrap {
    pub fn new(config: RtConfig, mode: ObserveMode, storage: StorageFactory) -> Self {
        Self {
            config,
            mode,
            storage,
            session: None,
            latest: None,
            failed: None,
        }
    }

    /// Feed the current state of the page. `None` means the page is gone.
    pub fn on_snapshot(
        &mut self,
        snapshot: Option<PageSnapshot>,
        now: Instant,
        sink: &mut dyn ViewSink,
    ) -> Phase {
        let Some(snapshot) = snapshot.filter(PageSnapshot::has_container) else {
            self.latest = None;
            self.failed = None;
            return match self.session.take() {
                Some(mut session) => {
                    session.teardown();
                    log::info!("Diff container gone, waiting for the next page");
                    Phase::TornDown
                }
                None => Phase::Waiting,
            };
        };

        let fingerprint = snapshot.fingerprint();
        let same_page = self
            .session
            .as_ref()
            .map(|s| s.fingerprint() == fingerprint);
        let phase = match same_page {
            Some(true) => {
                let rewritten = match (self.mode, self.session.as_mut()) {
                    (ObserveMode::Active, Some(session)) => session.sync_lines(&snapshot, now, sink),
                    // existing lines are re-read by polls; appended ones need an observer
                    (ObserveMode::Polling, Some(session)) => session.observe_lines(&snapshot, now, sink),
                    (_, None) => 0,
                };
                Phase::Updated(rewritten)
            }
            Some(false) => {
                if let Some(mut old) = self.session.take() {
                    old.teardown();
                }
                match self.start(&snapshot, &fingerprint, now, sink) {
                    Phase::Started => Phase::Rebuilt,
                    other => other,
                }
            }
            None if self.failed.as_deref() == Some(fingerprint.as_str()) => Phase::Waiting,
            None => self.start(&snapshot, &fingerprint, now, sink),
        };
        self.latest = Some(snapshot);
        phase
    }

    fn start(
        &mut self,
        snapshot: &PageSnapshot,
        fingerprint: &str,
        now: Instant,
        sink: &mut dyn ViewSink,
    ) -> Phase {
        let started = (self.storage)()
            .context("Failed to open review storage")
            .and_then(|storage| Session::start(snapshot, storage, &self.config, self.mode, now, sink));
        match started {
            Ok(session) => {
                self.failed = None;
                self.session = Some(session);
                Phase::Started
            }
            Err(e) => {
                log::error!("Failed to initialize review page: {:#}", e);
                self.failed = Some(fingerprint.to_string());
                Phase::Failed
            }
        }
    }

    /// Timer work for the live session, if any
    pub fn tick(&mut self, now: Instant, sink: &mut dyn ViewSink) {
        if let Some(session) = self.session.as_mut() {
            session.tick(self.latest.as_ref(), now, sink);
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::view::{LineId, Target, ViewState};
    use crate::review::MemoryStorage;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn page(lines: &[&str]) -> PageSnapshot {
        let json = serde_json::json!({
            "document": "/team/repo/pull-requests/9/diff",
            "files": [{"filename": "src/lib.rs", "statusCode": "M", "anchor": "#chg-src/lib.rs"}],
            "sections": [{"path": "src/lib.rs", "changeKindLabel": "MODIFIED",
                          "anchor": "chg-src/lib.rs", "lines": lines}]
        });
        PageSnapshot::parse(&json.to_string()).unwrap()
    }

    fn loading() -> PageSnapshot {
        PageSnapshot::parse(r#"{"document": "/team/repo/pull-requests/9/diff"}"#).unwrap()
    }

    fn bootstrap(storage: &MemoryStorage) -> Bootstrap {
        let storage = storage.clone();
        Bootstrap::new(
            RtConfig::default(),
            ObserveMode::Active,
            Box::new(move || -> Result<Box<dyn Storage>> { Ok(Box::new(storage.clone())) }),
        )
    }

    #[test]
    fn waits_for_container_then_starts_once() {
        let mut boot = bootstrap(&MemoryStorage::new());
        let mut view = ViewState::default();
        let t0 = Instant::now();
        assert_eq!(boot.on_snapshot(Some(loading()), t0, &mut view), Phase::Waiting);
        assert_eq!(boot.on_snapshot(None, t0, &mut view), Phase::Waiting);
        assert!(!boot.is_initialized());

        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Started);
        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Updated(0));
        assert!(boot.is_initialized());
        assert_eq!(view.tree_rows.len(), 2);
    }

    #[test]
    fn same_page_mutation_rewrites_lines() {
        let mut boot = bootstrap(&MemoryStorage::new());
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&[" a"])), t0, &mut view);
        let phase = boot.on_snapshot(Some(page(&["-a"])), t0 + Duration::from_millis(50), &mut view);
        assert_eq!(phase, Phase::Updated(1));
        assert_eq!(
            view.html(&Target::Line(LineId::new("src/lib.rs", 0))),
            Some("&nbsp;a")
        );
    }

    #[test]
    fn container_loss_tears_down_and_rearms() {
        let mut boot = bootstrap(&MemoryStorage::new());
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&["+a"])), t0, &mut view);
        assert_eq!(boot.on_snapshot(Some(loading()), t0, &mut view), Phase::TornDown);
        assert!(boot.session().is_none());
        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Started);
    }

    #[test]
    fn different_page_rebuilds() {
        let mut boot = bootstrap(&MemoryStorage::new());
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&["+a"])), t0, &mut view);
        let other = PageSnapshot::parse(
            r#"{"document": "/team/repo/pull-requests/10/diff", "sections": [{"path": "x.rs"}]}"#,
        )
        .unwrap();
        assert_eq!(boot.on_snapshot(Some(other), t0, &mut view), Phase::Rebuilt);
        assert_eq!(boot.session().unwrap().changes()[0].path, "x.rs");
    }

    #[test]
    fn review_state_survives_reload() {
        let storage = MemoryStorage::new();
        let mut view = ViewState::default();
        let t0 = Instant::now();
        {
            let mut boot = bootstrap(&storage);
            boot.on_snapshot(Some(page(&["+a"])), t0, &mut view);
            boot.session_mut()
                .unwrap()
                .toggle_reviewed("src/lib.rs", true, false, &mut view);
        }
        let mut boot = bootstrap(&storage);
        let mut fresh = ViewState::default();
        boot.on_snapshot(Some(page(&["+a"])), t0, &mut fresh);
        assert!(boot.session().unwrap().review().is_reviewed("src/lib.rs"));
        assert!(fresh.is_checked(&Target::Checkbox("src/lib.rs".into())));
    }

    #[test]
    fn tick_sweeps_quiet_observers() {
        let mut boot = bootstrap(&MemoryStorage::new());
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&["+a", "-b"])), t0, &mut view);
        assert_eq!(boot.session().unwrap().live_observers(), 2);
        boot.tick(t0 + Duration::from_secs(15), &mut view);
        assert_eq!(boot.session().unwrap().live_observers(), 0);
    }

    #[test]
    fn polling_mode_picks_up_content_on_tick() {
        let mut boot = Bootstrap::new(
            RtConfig::default(),
            ObserveMode::Polling,
            Box::new(|| -> Result<Box<dyn Storage>> { Ok(Box::new(MemoryStorage::new())) }),
        );
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&[""])), t0, &mut view);
        assert_eq!(
            boot.on_snapshot(Some(page(&["+late"])), t0, &mut view),
            Phase::Updated(0)
        );
        boot.tick(t0 + Duration::from_millis(30), &mut view);
        assert_eq!(
            view.html(&Target::Line(LineId::new("src/lib.rs", 0))),
            Some("&nbsp;late")
        );
    }

    #[test]
    fn polling_mode_observes_appended_lines() {
        let mut boot = Bootstrap::new(
            RtConfig::default(),
            ObserveMode::Polling,
            Box::new(|| -> Result<Box<dyn Storage>> { Ok(Box::new(MemoryStorage::new())) }),
        );
        let mut view = ViewState::default();
        let t0 = Instant::now();
        boot.on_snapshot(Some(page(&[" ctx"])), t0, &mut view);
        let phase = boot.on_snapshot(Some(page(&[" ctx", "+late"])), t0, &mut view);
        assert_eq!(phase, Phase::Updated(1));
        let appended = Target::Line(LineId::new("src/lib.rs", 1));
        assert_eq!(view.html(&appended), Some("&nbsp;late"));
        assert_eq!(boot.session().unwrap().lines("src/lib.rs").len(), 2);

        // the new line is polled like the others
        let later = page(&[" ctx", "-changed"]);
        boot.on_snapshot(Some(later), t0 + Duration::from_millis(10), &mut view);
        boot.tick(t0 + Duration::from_millis(30), &mut view);
        assert_eq!(view.html(&appended), Some("&nbsp;changed"));
    }

    #[test]
    fn failed_start_is_not_retried_until_the_page_changes() {
        let attempts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&attempts);
        let mut boot = Bootstrap::new(
            RtConfig::default(),
            ObserveMode::Active,
            Box::new(move || -> Result<Box<dyn Storage>> {
                counter.set(counter.get() + 1);
                anyhow::bail!("storage directory is read-only")
            }),
        );
        let mut view = ViewState::default();
        let t0 = Instant::now();

        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Failed);
        assert!(!boot.is_initialized());
        assert_eq!(boot.on_snapshot(Some(page(&["+a", "-b"])), t0, &mut view), Phase::Waiting);
        assert_eq!(attempts.get(), 1);

        let other = PageSnapshot::parse(
            r#"{"document": "/team/repo/pull-requests/10/diff", "sections": [{"path": "x.rs"}]}"#,
        )
        .unwrap();
        assert_eq!(boot.on_snapshot(Some(other), t0, &mut view), Phase::Failed);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn failed_start_is_retried_after_the_container_returns() {
        let attempts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&attempts);
        let mut boot = Bootstrap::new(
            RtConfig::default(),
            ObserveMode::Active,
            Box::new(move || -> Result<Box<dyn Storage>> {
                counter.set(counter.get() + 1);
                if counter.get() == 1 {
                    anyhow::bail!("storage directory is read-only");
                }
                Ok(Box::new(MemoryStorage::new()))
            }),
        );
        let mut view = ViewState::default();
        let t0 = Instant::now();
        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Failed);
        assert_eq!(boot.on_snapshot(Some(loading()), t0, &mut view), Phase::Waiting);
        assert_eq!(boot.on_snapshot(Some(page(&["+a"])), t0, &mut view), Phase::Started);
        assert_eq!(attempts.get(), 2);
    }
}
