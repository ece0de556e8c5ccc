//! The single active identity and the operations that replace it.

use std::sync::{Arc, Mutex, MutexGuard};

use paychat_common::{Event, EventBus, SessionId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::IdentityStore;
use crate::protocol::{Limits, SessionGrant, Tier};
use crate::{AgentTransport, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityOrigin {
    /// Issued by `session.start`.
    Server,
    /// Generated here because the backend could not be reached.
    Local,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: SessionId,
    #[serde(default)]
    pub tier: Tier,
    pub origin: IdentityOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &"[REDACTED]")
            .field("tier", &self.tier)
            .field("origin", &self.origin)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Identity {
    pub fn from_grant(grant: SessionGrant) -> Self {
        Self {
            id: grant.session_id,
            tier: grant.tier,
            origin: IdentityOrigin::Server,
            limits: grant.limits,
        }
    }

    pub fn local() -> Self {
        Self {
            id: SessionId::generate(),
            tier: Tier::Anonymous,
            origin: IdentityOrigin::Local,
            limits: None,
        }
    }
}

/// Owns the one active identity of a chat session.
///
/// `ensure` is idempotent and serialized: concurrent callers share the
/// identity created by whichever got there first. `renew` and `upgrade`
/// replace it wholesale.
pub struct SessionIdentity {
    current: Mutex<Option<Identity>>,
    /// Held across the network call that creates or replaces the identity.
    gate: tokio::sync::Mutex<()>,
    store: Arc<dyn IdentityStore>,
    local_fallback: bool,
    events: Option<Arc<EventBus>>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            current: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
            store,
            local_fallback: true,
            events: None,
        }
    }

    /// Whether `ensure` may mint a local id when `session.start` is unreachable.
    pub fn with_local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = enabled;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<Identity>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Option<Identity> {
        self.slot().clone()
    }

    pub fn id(&self) -> Option<SessionId> {
        self.slot().as_ref().map(|i| i.id.clone())
    }

    pub fn tier(&self) -> Option<Tier> {
        self.slot().as_ref().map(|i| i.tier.clone())
    }

    /// Current identity, creating one if none exists yet.
    ///
    /// Order of preference: the in-memory identity, the persisted one, a
    /// server-issued one, and finally a locally generated one if the
    /// backend is unreachable and the fallback is enabled.
    pub async fn ensure(&self, transport: &dyn AgentTransport) -> Result<SessionId, ClientError> {
        if let Some(id) = self.id() {
            return Ok(id);
        }
        let _gate = self.gate.lock().await;
        if let Some(id) = self.id() {
            return Ok(id);
        }

        match self.store.load() {
            Ok(Some(stored)) => {
                info!(tier = %stored.tier, origin = ?stored.origin, "Restored session identity");
                return Ok(self.install(stored, false));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Stored identity unreadable, starting a new session"),
        }

        let identity = match transport.start_session().await {
            Ok(grant) => Identity::from_grant(grant),
            Err(e) if e.is_unreachable() && self.local_fallback => {
                warn!(error = %e, "Session endpoint unreachable, using a local identity");
                Identity::local()
            }
            Err(e) => return Err(e),
        };
        info!(tier = %identity.tier, origin = ?identity.origin, "Session identity created");
        Ok(self.install(identity, true))
    }

    /// Replace the identity with a fresh server-issued one. No local fallback.
    pub async fn renew(&self, transport: &dyn AgentTransport) -> Result<SessionId, ClientError> {
        let _gate = self.gate.lock().await;
        let grant = transport.start_session().await?;
        let identity = Identity::from_grant(grant);
        info!(tier = %identity.tier, "Session identity renewed");
        Ok(self.install(identity, true))
    }

    /// Exchange `access_key` for a higher tier on the current identity.
    ///
    /// The id is kept; tier and limits come from the grant. On failure the
    /// identity is left untouched. Fails without contacting the backend if
    /// the identity was renewed while waiting for the gate.
    pub async fn upgrade(
        &self,
        transport: &dyn AgentTransport,
        access_key: &str,
    ) -> Result<Identity, ClientError> {
        let session = self.ensure(transport).await?;
        let _gate = self.gate.lock().await;
        if self.id().as_ref() != Some(&session) {
            warn!("Session identity replaced before upgrade, not upgrading");
            return Err(ClientError::UpgradeRejected(
                "session was renewed, try the upgrade again".into(),
            ));
        }
        let grant = transport.upgrade_session(&session, access_key).await?;
        if grant.session_id != session {
            warn!("Upgrade grant names a different session, keeping the current id");
        }

        let mut upgraded = self.current().unwrap_or_else(|| Identity {
            id: session.clone(),
            tier: Tier::Anonymous,
            origin: IdentityOrigin::Server,
            limits: None,
        });
        upgraded.tier = grant.tier;
        upgraded.limits = grant.limits;
        info!(tier = %upgraded.tier, "Session tier upgraded");
        self.install(upgraded.clone(), true);
        Ok(upgraded)
    }

    /// Drop the identity here and in the store. The next `ensure` starts over.
    pub fn forget(&self) -> Result<(), ClientError> {
        self.slot().take();
        self.store.clear()
    }

    fn install(&self, identity: Identity, persist: bool) -> SessionId {
        if persist {
            if let Err(e) = self.store.save(&identity) {
                warn!(error = %e, "Failed to persist session identity");
            }
        }
        let id = identity.id.clone();
        let event = Event::IdentityChanged {
            session_id: id.to_string(),
            tier: identity.tier.to_string(),
        };
        *self.slot() = Some(identity);
        if let Some(events) = &self.events {
            events.publish(event);
        }
        id
    }
}
