//! The session context object and its non-turn operations.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use paychat_common::{Event, EventBus};
use tracing::{debug, info, warn};

use crate::approval::ApprovalWorkflow;
use crate::conversation::{ConversationLog, Message};
use crate::identity::{Identity, IdentityStore, MemoryStore, SessionIdentity};
use crate::latency::LatencyTracker;
use crate::limits::{LimitsMonitor, LimitsSnapshot};
use crate::protocol::ApprovalRequest;
use crate::{AgentTransport, ClientError};

use super::types::{FlagGuard, RateLimitNotice, Surfaced};

/// One logical conversation with the agent backend.
///
/// Every operation takes `&self`; independent sessions are independent
/// values. At most one turn (`send`, `approve`, `deny`) runs at a time and
/// extra calls while one is in flight are ignored. Failures never escape an
/// operation: they land on the error, limits-error or upgrade-error fields.
pub struct ChatSession {
    pub(super) transport: Arc<dyn AgentTransport>,
    pub(super) identity: SessionIdentity,
    pub(super) log: ConversationLog,
    pub(super) approvals: ApprovalWorkflow,
    pub(super) limits: LimitsMonitor,
    pub(super) latency: LatencyTracker,
    pub(super) events: Arc<EventBus>,
    pub(super) error: Mutex<Option<Surfaced>>,
    pub(super) rate_limit: Mutex<Option<RateLimitNotice>>,
    upgrade_error: Mutex<Option<String>>,
    upgrading: AtomicBool,
}

pub struct ChatSessionBuilder {
    transport: Arc<dyn AgentTransport>,
    store: Option<Arc<dyn IdentityStore>>,
    local_fallback: bool,
    events: Option<Arc<EventBus>>,
}

impl ChatSessionBuilder {
    pub fn with_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = enabled;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> ChatSession {
        let events = self.events.unwrap_or_default();
        let store: Arc<dyn IdentityStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        ChatSession {
            transport: self.transport,
            identity: SessionIdentity::new(store)
                .with_local_fallback(self.local_fallback)
                .with_events(events.clone()),
            log: ConversationLog::new().with_events(events.clone()),
            approvals: ApprovalWorkflow::new(),
            limits: LimitsMonitor::new(),
            latency: LatencyTracker::new(),
            events,
            error: Mutex::new(None),
            rate_limit: Mutex::new(None),
            upgrade_error: Mutex::new(None),
            upgrading: AtomicBool::new(false),
        }
    }
}

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ChatSession {
    pub fn new(transport: Arc<dyn AgentTransport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn AgentTransport>) -> ChatSessionBuilder {
        ChatSessionBuilder {
            transport,
            store: None,
            local_fallback: true,
            events: None,
        }
    }

    // -- observable state --

    pub fn messages(&self) -> Vec<Message> {
        self.log.snapshot()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_busy(&self) -> bool {
        self.log.is_busy()
    }

    /// Human-readable error of the last turn, cleared when the next one starts.
    pub fn error(&self) -> Option<String> {
        lock(&self.error).as_ref().map(|s| s.message.clone())
    }

    /// Classified cause behind [`error`](Self::error).
    pub fn error_cause(&self) -> Option<ClientError> {
        lock(&self.error).as_ref().map(|s| s.cause.clone())
    }

    pub fn rate_limit(&self) -> Option<RateLimitNotice> {
        lock(&self.rate_limit).clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    pub fn pending_approval(&self) -> Option<ApprovalRequest> {
        self.approvals.live()
    }

    pub fn limits(&self) -> Option<LimitsSnapshot> {
        self.limits.snapshot()
    }

    pub fn limits_error(&self) -> Option<String> {
        self.limits.error()
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrading.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn upgrade_error(&self) -> Option<String> {
        lock(&self.upgrade_error).clone()
    }

    pub fn dismiss_upgrade_error(&self) {
        lock(&self.upgrade_error).take();
    }

    /// Duration of the last settled turn; `None` while one is running.
    pub fn last_latency(&self) -> Option<Duration> {
        self.latency.last()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub(super) fn surface(&self, message: impl Into<String>, cause: ClientError) {
        let message = message.into();
        self.events.publish(Event::ErrorRaised(message.clone()));
        *lock(&self.error) = Some(Surfaced { message, cause });
    }

    pub(super) fn clear_error(&self) {
        lock(&self.error).take();
    }

    // -- operations --

    /// Make sure an identity exists, then load limits for it.
    pub async fn bootstrap(&self) -> bool {
        match self.identity.ensure(self.transport.as_ref()).await {
            Ok(_) => {
                self.limits.enable();
                self.refresh_limits().await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Session bootstrap failed");
                self.surface("Failed to start session.", e);
                false
            }
        }
    }

    /// Refresh the limits snapshot for the current identity. A no-op before
    /// bootstrap. Failures go to the limits-error field only.
    pub async fn refresh_limits(&self) -> Option<LimitsSnapshot> {
        let session = self.identity.id()?;
        let snapshot = self
            .limits
            .refresh(self.transport.as_ref(), &session)
            .await?;
        self.events.publish(Event::LimitsRefreshed {
            tier: snapshot.tier.to_string(),
        });
        Some(snapshot)
    }

    /// Exchange an access key for a higher tier on the current identity.
    ///
    /// Returns `false` if rejected (see [`upgrade_error`](Self::upgrade_error))
    /// or if an upgrade is already running. Chat state is never touched.
    pub async fn upgrade(&self, access_key: &str) -> bool {
        let Some(flag) = FlagGuard::raise(&self.upgrading) else {
            debug!("Upgrade already in flight, ignoring");
            return false;
        };
        self.dismiss_upgrade_error();

        match self
            .identity
            .upgrade(self.transport.as_ref(), access_key.trim())
            .await
        {
            Ok(identity) => {
                self.limits.enable();
                self.limits.apply_identity(&identity);
                drop(flag);
                self.refresh_limits().await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Upgrade failed");
                *lock(&self.upgrade_error) = Some(e.to_string());
                false
            }
        }
    }

    /// Empty the transcript and drop any live approval. Refused while a
    /// turn is in flight.
    pub fn clear(&self) -> bool {
        let Some(_busy) = self.log.try_begin() else {
            return false;
        };
        self.log.clear();
        self.approvals.supersede();
        self.clear_error();
        lock(&self.rate_limit).take();
        info!("Conversation cleared");
        true
    }

    /// Passive backend status. Any failure reads as down.
    pub async fn health(&self) -> bool {
        match self.transport.health().await {
            Ok(status) => status.ok,
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }
}
