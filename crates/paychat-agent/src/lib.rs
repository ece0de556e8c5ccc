//! Client-side session orchestration for the payments agent.
//!
//! Owns one logical conversation with the agent backend:
//! - Session identity bootstrap, renewal, and tier upgrade
//! - Request/response turns with a single renew-and-retry on auth expiry
//! - Human-in-the-loop tool approvals resumed from opaque backend state
//! - Usage-limit snapshots and per-turn latency
//!
//! Rendering is left to callers; they read the log, busy flag, and error
//! fields from [`ChatSession`] and invoke its operations.

pub mod approval;
pub mod conversation;
pub mod http;
pub mod identity;
pub mod latency;
pub mod limits;
pub mod protocol;
pub mod recovery;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
pub use paychat_common::SessionId;

pub use approval::ApprovalWorkflow;
pub use conversation::{ConversationLog, Message, Role, APOLOGY};
pub use http::{HttpConfig, HttpTransport};
pub use identity::{
    FileStore, Identity, IdentityOrigin, IdentityStore, MemoryStore, SessionIdentity,
};
pub use latency::LatencyTracker;
pub use limits::{LimitsMonitor, LimitsSnapshot};
pub use protocol::{
    ApprovalDecision, ApprovalRequest, ApprovalSubmission, AssistantMessage, ChatExtras,
    ChatRequest, HealthStatus, Limits, LimitsReport, Meter, ResumeState, SessionGrant, Tier,
    ToolCall, TraceStatus, TraceStep,
};
pub use recovery::run_with_recovery;
pub use session::{ChatSession, ChatSessionBuilder, RateLimitNotice, TurnOutcome};

/// The client half of the agent protocol.
///
/// `HttpTransport` is the production implementation; tests script their own.
/// Timeouts are the transport's business and surface as ordinary errors.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// `POST session.start`: mint a new server-side identity.
    async fn start_session(&self) -> Result<SessionGrant, ClientError>;

    /// `GET session.limits`: tier and usage for `session`.
    async fn session_limits(&self, session: &SessionId) -> Result<LimitsReport, ClientError>;

    /// `POST session.upgrade`: exchange an access key for a higher tier.
    async fn upgrade_session(
        &self,
        session: &SessionId,
        access_key: &str,
    ) -> Result<SessionGrant, ClientError>;

    /// `POST chat`: run one turn.
    async fn chat(
        &self,
        session: &SessionId,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ClientError>;

    /// `POST workflow.approval`: resume a suspended workflow with a decision.
    async fn submit_approval(
        &self,
        session: &SessionId,
        submission: &ApprovalSubmission,
    ) -> Result<AssistantMessage, ClientError>;

    /// `GET health`: passive liveness check.
    async fn health(&self) -> Result<HealthStatus, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The backend no longer recognises the session (401).
    #[error("session expired: {0}")]
    AuthExpired(String),
    /// Usage ceiling hit (429). Never retried automatically.
    #[error("{reason}")]
    RateLimited {
        reason: String,
        retry_after_secs: Option<u64>,
    },
    /// Access key invalid or not eligible.
    #[error("upgrade rejected: {0}")]
    UpgradeRejected(String),
    /// approve/deny without a live approval; never reaches the network.
    #[error("no pending approval")]
    NoPendingApproval,
    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// No response at all: connect failure or timeout.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// Any other transport failure, including undecodable bodies.
    #[error("transport error: {0}")]
    Transport(String),
    /// Local identity persistence failed.
    #[error("identity store error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired(_))
    }

    /// Network or server failure of any kind other than the classified ones.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Http { .. } | ClientError::Unreachable(_) | ClientError::Transport(_)
        )
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable(_))
    }

    /// Called once the single recovery has been spent: a second auth
    /// failure is reported as the plain HTTP failure it is.
    pub fn into_terminal(self) -> ClientError {
        match self {
            ClientError::AuthExpired(message) => ClientError::Http {
                status: 401,
                message,
            },
            other => other,
        }
    }
}
