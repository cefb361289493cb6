//! Visibility-gated polling.
//!
//! The board refreshes on a fixed interval while visible and stops entirely
//! while hidden; becoming visible again makes a refresh due immediately.
//! This type owns no timer, it only decides when a poll is due; the caller
//! drives it with its own clock.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct PollGate {
    interval: Duration,
    visible: bool,
    next_due: Option<Instant>,
}

impl PollGate {
    /// Starts visible with a refresh due immediately.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            visible: true,
            next_due: Some(now),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Visibility change: hiding suspends polling, becoming visible makes a
    /// resync due right away.
    pub fn set_visible(&mut self, visible: bool, now: Instant) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.next_due = if visible { Some(now) } else { None };
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        matches!(self.next_due, Some(due) if now >= due)
    }

    /// Record a completed poll and schedule the next one.
    pub fn mark_polled(&mut self, now: Instant) {
        if self.visible {
            self.next_due = Some(now + self.interval);
        }
    }
}
