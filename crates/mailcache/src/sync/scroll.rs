//! Debounced infinite-scroll trigger
//!
//! Scroll events arrive in bursts; the trigger waits for a quiet period and
//! then reports whether the list is scrolled far enough to load more.

use std::time::{Duration, Instant};

/// Default quiet period after the last scroll event
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Default fraction of the scrollable height that triggers a load
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Geometry of the scrolled container at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top
    pub offset: f64,
    /// Visible height
    pub viewport: f64,
    /// Total content height
    pub content: f64,
}

impl ScrollPosition {
    pub fn new(offset: f64, viewport: f64, content: f64) -> Self {
        Self {
            offset,
            viewport,
            content,
        }
    }

    /// How far down the content the bottom of the viewport is (0.0..=1.0)
    pub fn ratio(&self) -> f64 {
        if self.content <= 0.0 {
            return 1.0;
        }
        ((self.offset + self.viewport) / self.content).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingScroll {
    at: Instant,
    position: ScrollPosition,
}

/// Turns raw scroll events into at most one load request per quiet period
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    debounce: Duration,
    threshold: f64,
    pending: Option<PendingScroll>,
}

impl ScrollTrigger {
    pub fn new(debounce: Duration, threshold: f64) -> Self {
        Self {
            debounce,
            threshold,
            pending: None,
        }
    }

    /// Record a scroll event; restarts the quiet period
    pub fn on_scroll(&mut self, position: ScrollPosition, now: Instant) {
        self.pending = Some(PendingScroll { at: now, position });
    }

    /// Check the pending event once the quiet period is over
    ///
    /// Returns true exactly once per settled scroll that is past the
    /// threshold while `can_load` holds.
    pub fn poll(&mut self, now: Instant, can_load: bool) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(pending.at) < self.debounce {
            return false;
        }

        self.pending = None;
        can_load && pending.position.ratio() >= self.threshold
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_THRESHOLD)
    }
}
