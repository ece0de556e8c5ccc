//! Cached tier and usage for the current identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use paychat_common::SessionId;
use tracing::{debug, warn};

use crate::identity::Identity;
use crate::protocol::{Limits, LimitsReport, Tier};
use crate::AgentTransport;

/// One full reading of the limits endpoint. Never merged with older readings.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitsSnapshot {
    pub session_id: SessionId,
    pub tier: Tier,
    pub limits: Limits,
    pub fetched_at: DateTime<Utc>,
    /// Set when the identity changed since this was fetched.
    pub stale: bool,
}

impl LimitsSnapshot {
    fn from_report(report: LimitsReport, session: &SessionId) -> Self {
        Self {
            session_id: report.session_id.unwrap_or_else(|| session.clone()),
            tier: report.tier,
            limits: report.limits,
            fetched_at: Utc::now(),
            stale: false,
        }
    }
}

#[derive(Default)]
struct State {
    snapshot: Option<LimitsSnapshot>,
    error: Option<String>,
    refreshes: u64,
}

/// Holds the latest limits snapshot and the non-fatal limits error.
///
/// Disabled until the owning session has an identity; refreshing before
/// that is a no-op.
#[derive(Default)]
pub struct LimitsMonitor {
    state: Mutex<State>,
    enabled: AtomicBool,
}

impl LimitsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Fetch limits for `session` and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept and the error recorded.
    /// Returns the new snapshot, or `None` if disabled or failed.
    pub async fn refresh(
        &self,
        transport: &dyn AgentTransport,
        session: &SessionId,
    ) -> Option<LimitsSnapshot> {
        if !self.is_enabled() {
            debug!("Limits refresh skipped before bootstrap");
            return None;
        }
        match transport.session_limits(session).await {
            Ok(report) => {
                let snapshot = LimitsSnapshot::from_report(report, session);
                let mut state = self.state();
                state.snapshot = Some(snapshot.clone());
                state.error = None;
                state.refreshes += 1;
                debug!(tier = %snapshot.tier, "Limits refreshed");
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Limits refresh failed, keeping previous snapshot");
                self.state().error = Some(e.to_string());
                None
            }
        }
    }

    /// Seed the snapshot from an upgrade grant. Marked stale until the next
    /// successful refresh.
    pub fn apply_identity(&self, identity: &Identity) {
        let mut state = self.state();
        let limits = match (&identity.limits, &state.snapshot) {
            (Some(limits), _) => limits.clone(),
            (None, Some(previous)) => previous.limits.clone(),
            (None, None) => Limits::default(),
        };
        state.snapshot = Some(LimitsSnapshot {
            session_id: identity.id.clone(),
            tier: identity.tier.clone(),
            limits,
            fetched_at: Utc::now(),
            stale: true,
        });
    }

    /// Mark the snapshot as belonging to a previous identity.
    pub fn invalidate(&self) {
        if let Some(snapshot) = self.state().snapshot.as_mut() {
            snapshot.stale = true;
        }
    }

    pub fn snapshot(&self) -> Option<LimitsSnapshot> {
        self.state().snapshot.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Number of successful refreshes.
    pub fn refresh_count(&self) -> u64 {
        self.state().refreshes
    }
}
