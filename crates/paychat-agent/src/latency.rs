//! Turn latency, for display only.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::conversation::Role;

#[derive(Default)]
struct State {
    started: Option<Instant>,
    last: Option<Duration>,
}

/// Wall-clock time from `send` to the first settled assistant record.
#[derive(Default)]
pub struct LatencyTracker {
    state: Mutex<State>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a turn. The previous measurement becomes unknown.
    pub fn begin(&self, at: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.started = Some(at);
        state.last = None;
    }

    /// Complete the measurement once the log is idle with an assistant
    /// record on top. Returns the duration when this call completed it.
    pub fn observe(&self, busy: bool, newest: Option<Role>, at: Instant) -> Option<Duration> {
        if busy || newest != Some(Role::Assistant) {
            return None;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let started = state.started.take()?;
        let elapsed = at.saturating_duration_since(started);
        state.last = Some(elapsed);
        Some(elapsed)
    }

    pub fn last(&self) -> Option<Duration> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).last
    }
}
