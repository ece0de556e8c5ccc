//! Chat and approval payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::timestamp::deserialize_timestamp;

/// Structured hints forwarded with a chat turn. The backend owns date
/// normalization and validation; nothing here is checked client-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExtras {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Anything else the caller wants to pass through verbatim.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl ChatExtras {
    pub fn with_customer_id(mut self, customer_id: u64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// One chat turn as submitted. The session id travels separately.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub extras: Option<ChatExtras>,
}

/// Status of a backend processing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TraceStatus {
    Start,
    Ok,
    PendingApproval,
    NeedsApproval,
    Skipped,
    Error,
    /// Anything the backend adds later, e.g. `denied`.
    Other(String),
}

impl From<String> for TraceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "start" => TraceStatus::Start,
            "ok" => TraceStatus::Ok,
            "pending_approval" => TraceStatus::PendingApproval,
            "needs_approval" => TraceStatus::NeedsApproval,
            "skipped" => TraceStatus::Skipped,
            "error" => TraceStatus::Error,
            _ => TraceStatus::Other(value),
        }
    }
}

impl TraceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TraceStatus::Start => "start",
            TraceStatus::Ok => "ok",
            TraceStatus::PendingApproval => "pending_approval",
            TraceStatus::NeedsApproval => "needs_approval",
            TraceStatus::Skipped => "skipped",
            TraceStatus::Error => "error",
            TraceStatus::Other(other) => other,
        }
    }
}

impl From<TraceStatus> for String {
    fn from(value: TraceStatus) -> Self {
        match value {
            TraceStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// One audit entry for a backend stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub node: String,
    pub status: TraceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A tool invocation the backend made or attempted. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// A tool run the backend suspended until a human decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub approval_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Opaque continuation returned by the backend. Stored and forwarded
/// verbatim, never inspected.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeState(serde_json::Value);

impl ResumeState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Debug for ResumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResumeState([REDACTED])")
    }
}

/// Response to `chat` and `workflow.approval`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trace: Vec<TraceStep>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub pending_approval: Option<ApprovalRequest>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resume: Option<ResumeState>,
}

impl AssistantMessage {
    /// The approval this message asks for, if it names one.
    pub fn approval(&self) -> Option<&ApprovalRequest> {
        self.pending_approval
            .as_ref()
            .filter(|approval| !approval.approval_id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalDecision {
    Approve,
    Deny,
}

/// Body of `workflow.approval`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSubmission {
    pub approval_id: String,
    pub decision: ApprovalDecision,
    #[serde(rename = "lastState")]
    pub resume_state: ResumeState,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_assistant_message() {
        let msg: AssistantMessage = serde_json::from_value(json!({
            "id": "m-1",
            "role": "assistant",
            "content": "Total spend was **$1,204.50**.",
            "trace": [
                {"node": "orchestrator", "status": "start"},
                {"node": "data_agent", "status": "ok", "details": {"ms": 41}},
                {"node": "approval", "status": "denied"}
            ],
            "tool_calls": [{"tool": "spend_summary", "args": {"customerId": 1}}],
            "pending_approval": null,
            "ts": "2023-09-30T12:00:00+00:00",
            "resume": {"status": "OK", "trace": []}
        }))
        .unwrap();

        assert_eq!(msg.id.as_deref(), Some("m-1"));
        assert_eq!(msg.trace.len(), 3);
        assert_eq!(msg.trace[0].status, TraceStatus::Start);
        assert_eq!(msg.trace[1].details, Some(json!({"ms": 41})));
        assert_eq!(msg.trace[2].status, TraceStatus::Other("denied".into()));
        assert_eq!(msg.tool_calls[0].tool, "spend_summary");
        assert!(msg.pending_approval.is_none());
        assert!(msg.ts.is_some());
        assert!(msg.resume.is_some());
    }

    #[test]
    fn tolerates_sparse_message() {
        let msg: AssistantMessage = serde_json::from_value(json!({
            "content": null,
            "trace": null,
            "ts": 1696075200000u64
        }))
        .unwrap();
        assert!(msg.id.is_none());
        assert_eq!(msg.content, "");
        assert!(msg.trace.is_empty());
        assert!(msg.tool_calls.is_empty());
        assert!(msg.ts.is_some());
        assert!(msg.resume.is_none());
    }

    #[test]
    fn odd_timestamp_kinds_do_not_reject_message() {
        for ts in [json!(true), json!({"at": 5}), json!([1, 2])] {
            let msg: AssistantMessage =
                serde_json::from_value(json!({ "content": "hi", "ts": ts })).unwrap();
            assert_eq!(msg.content, "hi");
            assert!(msg.ts.is_none());
        }
    }

    #[test]
    fn approval_without_id_is_ignored() {
        let msg: AssistantMessage = serde_json::from_value(json!({
            "content": "needs review",
            "pending_approval": {"reason": "large payment", "args": {}, "approval_id": null}
        }))
        .unwrap();
        assert!(msg.pending_approval.is_some());
        assert!(msg.approval().is_none());
    }

    #[test]
    fn approval_with_id_is_exposed() {
        let msg: AssistantMessage = serde_json::from_value(json!({
            "content": "needs review",
            "pending_approval": {
                "reason": "amount > 500",
                "args": {"amount": 900},
                "approval_id": "ap-1"
            }
        }))
        .unwrap();
        let approval = msg.approval().unwrap();
        assert_eq!(approval.approval_id, "ap-1");
        assert_eq!(approval.reason, "amount > 500");
        assert_eq!(approval.args, json!({"amount": 900}));
    }

    #[test]
    fn extras_serialize_camel_case_and_skip_missing() {
        let extras = ChatExtras::default()
            .with_customer_id(1)
            .with_range("2023-09-01", "2023-09-30")
            .with_currency("USD");
        let value = serde_json::to_value(&extras).unwrap();
        assert_eq!(
            value,
            json!({"customerId": 1, "from": "2023-09-01", "to": "2023-09-30", "currency": "USD"})
        );

        let value = serde_json::to_value(ChatExtras::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn extras_pass_unknown_keys_through() {
        let mut extras = ChatExtras::default();
        extras.other.insert("channel".into(), json!("web"));
        let value = serde_json::to_value(&extras).unwrap();
        assert_eq!(value, json!({"channel": "web"}));
    }

    #[test]
    fn submission_wire_shape() {
        let submission = ApprovalSubmission {
            approval_id: "ap-1".into(),
            decision: ApprovalDecision::Deny,
            resume_state: ResumeState::new(json!({"step": 3})),
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            value,
            json!({"approvalId": "ap-1", "decision": "DENY", "lastState": {"step": 3}})
        );
    }

    #[test]
    fn resume_state_debug_is_redacted() {
        let state = ResumeState::new(json!({"card": "4111"}));
        assert_eq!(format!("{state:?}"), "ResumeState([REDACTED])");
    }
}
