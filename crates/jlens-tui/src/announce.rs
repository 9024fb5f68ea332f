//! Debounced status announcer.
//!
//! Assistive-technology live regions only announce on change, so two rapid
//! updates with overlapping timing can silently swallow the first. The
//! announcer models the classic clear-then-set pattern as an explicit
//! cancellable scheduled task: announcing clears the visible text and
//! schedules the new one after a short delay, cancelling any still-pending
//! announcement first. Time is injected so the model is unit-testable.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending {
    text: String,
    due: Instant,
}

/// Owns the visible status text and at most one pending announcement.
#[derive(Debug)]
pub struct Announcer {
    delay: Duration,
    pending: Option<Pending>,
    current: Option<String>,
}

impl Announcer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            current: None,
        }
    }

    /// Schedules `text`, cancelling any pending announcement and clearing
    /// the currently visible one.
    pub fn announce(&mut self, text: impl Into<String>, now: Instant) {
        self.current = None;
        self.pending = Some(Pending {
            text: text.into(),
            due: now + self.delay,
        });
    }

    /// Fires a due announcement. Returns true when the visible text changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.due);
        if !due {
            return false;
        }
        if let Some(pending) = self.pending.take() {
            self.current = Some(pending.text);
        }
        true
    }

    /// The announcement currently visible, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// When the pending announcement is due, for event-loop timeouts.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }
}
