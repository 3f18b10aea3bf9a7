//! Per-line observation of host-driven content changes.
//!
//! The host may inject a line's raw markup some time after the line first
//! appears, and may replace it more than once. Each observed line re-applies
//! the normalizer on every change until it goes quiet, then the observer is
//! disposed. Observers are owned through [`ObservationHandle`]s so a session
//! teardown releases all of them.

use super::normalize::{normalize, DiffLineRecord};
use crate::app::view::LineId;
use crate::config::ObserveConfig;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// How content changes reach the observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveMode {
    /// The host signals each mutation
    Active,
    /// The host cannot signal; lines are re-read on a fixed interval
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveLimits {
    /// Active mode ends after this long without a mutation
    pub quiet_window: Duration,
    /// Polling mode ends this long after observation began
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&ObserveConfig> for ObserveLimits {
    fn from(config: &ObserveConfig) -> Self {
        Self {
            quiet_window: config.quiet_window(),
            poll_timeout: config.poll_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Default for ObserveLimits {
    fn default() -> Self {
        Self::from(&ObserveConfig::default())
    }
}

// ── Single line ──

#[derive(Debug)]
pub struct LineObserver {
    started: Instant,
    last_change: Instant,
    last_poll: Option<Instant>,
    /// Markup we last produced; seeing it again is not a change
    last_output: Option<String>,
}

impl LineObserver {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            last_change: now,
            last_poll: None,
            last_output: None,
        }
    }

    /// Feed the line's current markup. Returns the rewrite when the content
    /// differs from what was last written.
    pub fn on_content(&mut self, now: Instant, raw: &str) -> Option<DiffLineRecord> {
        if self.last_output.as_deref() == Some(raw) {
            return None;
        }
        self.last_change = now;
        let record = normalize(raw);
        self.last_output = Some(record.normalized_html.clone());
        Some(record)
    }

    pub fn is_expired(&self, now: Instant, mode: ObserveMode, limits: &ObserveLimits) -> bool {
        match mode {
            ObserveMode::Active => now.saturating_duration_since(self.last_change) >= limits.quiet_window,
            ObserveMode::Polling => now.saturating_duration_since(self.started) >= limits.poll_timeout,
        }
    }

    fn poll_due(&mut self, now: Instant, interval: Duration) -> bool {
        let due = match self.last_poll {
            Some(last) => now.saturating_duration_since(last) >= interval,
            None => true,
        };
        if due {
            self.last_poll = Some(now);
        }
        due
    }
}

// ── Registry ──

type Live = Rc<RefCell<HashMap<LineId, LineObserver>>>;

/// All live line observers of one session
#[derive(Debug)]
pub struct Observations {
    mode: ObserveMode,
    limits: ObserveLimits,
    live: Live,
}

/// Keeps one line under observation. Dropping (or cancelling) the handle
/// disposes the observer.
#[derive(Debug)]
pub struct ObservationHandle {
    id: LineId,
    live: Weak<RefCell<HashMap<LineId, LineObserver>>>,
}

impl ObservationHandle {
    /// Whether the observer is still running (not expired, not cancelled)
    pub fn is_active(&self) -> bool {
        self.live
            .upgrade()
            .map(|live| live.borrow().contains_key(&self.id))
            .unwrap_or(false)
    }

    pub fn cancel(self) {}
}

impl Drop for ObservationHandle {
    fn drop(&mut self) {
        if let Some(live) = self.live.upgrade() {
            live.borrow_mut().remove(&self.id);
        }
    }
}

impl Observations {
    pub fn new(mode: ObserveMode, limits: ObserveLimits) -> Self {
        Self {
            mode,
            limits,
            live: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Start observing a line. Re-observing a line restarts its clock.
    pub fn observe(&self, id: LineId, now: Instant) -> ObservationHandle {
        self.live.borrow_mut().insert(id.clone(), LineObserver::new(now));
        ObservationHandle {
            id,
            live: Rc::downgrade(&self.live),
        }
    }

    /// The host changed a line. `None` when the line is no longer observed or
    /// the content is what we already wrote.
    pub fn on_mutation(&self, id: &LineId, raw: &str, now: Instant) -> Option<DiffLineRecord> {
        let mut live = self.live.borrow_mut();
        let observer = live.get_mut(id)?;
        if observer.is_expired(now, self.mode, &self.limits) {
            return None;
        }
        observer.on_content(now, raw)
    }

    /// Lines whose poll interval has elapsed (polling mode only)
    pub fn due_polls(&self, now: Instant) -> Vec<LineId> {
        if self.mode != ObserveMode::Polling {
            return Vec::new();
        }
        let interval = self.limits.poll_interval;
        let mut live = self.live.borrow_mut();
        let mut due: Vec<LineId> = live
            .iter_mut()
            .filter(|(_, obs)| !obs.is_expired(now, ObserveMode::Polling, &self.limits))
            .filter_map(|(id, obs)| obs.poll_due(now, interval).then(|| id.clone()))
            .collect();
        due.sort();
        due
    }

    /// Dispose every expired observer. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut live = self.live.borrow_mut();
        let before = live.len();
        let (mode, limits) = (self.mode, self.limits);
        live.retain(|_, obs| !obs.is_expired(now, mode, &limits));
        let removed = before - live.len();
        if removed > 0 {
            log::debug!("Stopped observing {} quiet line(s)", removed);
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.live.borrow().len()
    }
}
