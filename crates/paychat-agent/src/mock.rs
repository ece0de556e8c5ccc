//! Scripted transport for unit tests. Records every outbound call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use paychat_common::SessionId;
use tokio::sync::Notify;

use crate::protocol::{
    ApprovalRequest, ApprovalSubmission, AssistantMessage, ChatRequest, HealthStatus, Limits,
    LimitsReport, Meter, ResumeState, SessionGrant, Tier,
};
use crate::{AgentTransport, ClientError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    StartSession,
    Limits(SessionId),
    Upgrade(SessionId, String),
    Chat(SessionId, ChatRequest),
    Approval(SessionId, ApprovalSubmission),
    Health,
}

type Script<T> = Mutex<VecDeque<Result<T, ClientError>>>;

#[derive(Default)]
pub(crate) struct MockTransport {
    calls: Mutex<Vec<Call>>,
    starts: Script<SessionGrant>,
    limits: Script<LimitsReport>,
    chats: Script<AssistantMessage>,
    approvals: Script<AssistantMessage>,
    chat_fallback: Mutex<Option<Result<AssistantMessage, ClientError>>>,
    chat_gate: Mutex<Option<Arc<Notify>>>,
    start_gate: Mutex<Option<Arc<Notify>>>,
    server_tier: Mutex<Tier>,
    issued: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_start(&self, result: Result<SessionGrant, ClientError>) {
        self.starts.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_limits(&self, result: Result<LimitsReport, ClientError>) {
        self.limits.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_chat(&self, result: Result<AssistantMessage, ClientError>) {
        self.chats.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_approval(&self, result: Result<AssistantMessage, ClientError>) {
        self.approvals.lock().unwrap().push_back(result);
    }

    /// Answer every unscripted chat with `result`.
    pub(crate) fn chat_always(&self, result: Result<AssistantMessage, ClientError>) {
        *self.chat_fallback.lock().unwrap() = Some(result);
    }

    /// Park chat calls until the returned handle is notified.
    pub(crate) fn hold_chats(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.chat_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Park `session.start` calls until the returned handle is notified.
    pub(crate) fn hold_starts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.start_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn chat_calls(&self) -> Vec<(SessionId, ChatRequest)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Chat(session, request) => Some((session, request)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn approval_calls(&self) -> Vec<ApprovalSubmission> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Approval(_, submission) => Some(submission),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) fn tier_limits(tier: &Tier, used: u64) -> Limits {
    let max = match tier {
        Tier::Admin => None,
        Tier::Elevated => Some(60),
        _ => Some(12),
    };
    ["requests", "tools", "tokens"]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                Meter {
                    used,
                    max,
                    reset_in_sec: None,
                },
            )
        })
        .collect()
}

pub(crate) fn assistant(content: &str) -> AssistantMessage {
    AssistantMessage {
        id: Some(paychat_common::new_id()),
        content: content.to_string(),
        trace: Vec::new(),
        tool_calls: Vec::new(),
        pending_approval: None,
        ts: None,
        resume: Some(ResumeState::new(serde_json::json!({"status": "OK"}))),
    }
}

pub(crate) fn awaiting_approval(
    content: &str,
    approval_id: &str,
    resume: &str,
) -> AssistantMessage {
    AssistantMessage {
        pending_approval: Some(ApprovalRequest {
            approval_id: approval_id.to_string(),
            reason: "amount exceeds auto-approve threshold".into(),
            args: serde_json::json!({"amount": 900}),
        }),
        resume: Some(ResumeState::new(serde_json::json!({"token": resume}))),
        ..assistant(content)
    }
}

#[async_trait]
impl AgentTransport for MockTransport {
    async fn start_session(&self) -> Result<SessionGrant, ClientError> {
        self.record(Call::StartSession);
        let gate = self.start_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(scripted) = self.starts.lock().unwrap().pop_front() {
            return scripted;
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        *self.server_tier.lock().unwrap() = Tier::Anonymous;
        Ok(SessionGrant {
            session_id: SessionId::from(format!("s-{n}")),
            tier: Tier::Anonymous,
            limits: None,
        })
    }

    async fn session_limits(&self, session: &SessionId) -> Result<LimitsReport, ClientError> {
        self.record(Call::Limits(session.clone()));
        if let Some(scripted) = self.limits.lock().unwrap().pop_front() {
            return scripted;
        }
        let tier = self.server_tier.lock().unwrap().clone();
        let used = self.count(|c| matches!(c, Call::Chat(..))) as u64;
        Ok(LimitsReport {
            session_id: Some(session.clone()),
            limits: tier_limits(&tier, used),
            tier,
        })
    }

    async fn upgrade_session(
        &self,
        session: &SessionId,
        access_key: &str,
    ) -> Result<SessionGrant, ClientError> {
        self.record(Call::Upgrade(session.clone(), access_key.to_string()));
        let tier = match access_key {
            "VALID-KEY" => Tier::Elevated,
            "ADMIN-KEY" => Tier::Admin,
            _ => return Err(ClientError::UpgradeRejected("invalid access key".into())),
        };
        *self.server_tier.lock().unwrap() = tier.clone();
        Ok(SessionGrant {
            session_id: session.clone(),
            limits: Some(tier_limits(&tier, 0)),
            tier,
        })
    }

    async fn chat(
        &self,
        session: &SessionId,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ClientError> {
        self.record(Call::Chat(session.clone(), request.clone()));
        let gate = self.chat_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(scripted) = self.chats.lock().unwrap().pop_front() {
            return scripted;
        }
        self.chat_fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(assistant("ok")))
    }

    async fn submit_approval(
        &self,
        session: &SessionId,
        submission: &ApprovalSubmission,
    ) -> Result<AssistantMessage, ClientError> {
        self.record(Call::Approval(session.clone(), submission.clone()));
        self.approvals
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(assistant("Action handled.")))
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.record(Call::Health);
        Ok(HealthStatus { ok: true })
    }
}
