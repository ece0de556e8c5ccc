//! Append-only conversation log and the shared busy flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use paychat_common::{Event, EventBus};
use serde::{Deserialize, Serialize};

use crate::protocol::{ApprovalRequest, AssistantMessage, ResumeState, ToolCall, TraceStep};

/// Text of the synthetic assistant record appended when a turn fails.
pub const APOLOGY: &str =
    "Sorry, I hit an error while processing that. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One record of the transcript. Immutable once appended.
///
/// Resume state never lives here; it is split off by [`Message::from_reply`]
/// and held by the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub ts: DateTime<Utc>,
    pub trace: Vec<TraceStep>,
    pub tool_calls: Vec<ToolCall>,
    pub pending_approval: Option<ApprovalRequest>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: paychat_common::new_id(),
            role,
            content: content.into(),
            ts: Utc::now(),
            trace: Vec::new(),
            tool_calls: Vec::new(),
            pending_approval: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn apology() -> Self {
        Self::new(Role::Assistant, APOLOGY)
    }

    /// Split a backend reply into its transcript record and its resume state.
    /// Missing ids and timestamps are filled in locally.
    pub fn from_reply(reply: AssistantMessage) -> (Self, Option<ResumeState>) {
        let pending_approval = reply.approval().cloned();
        let message = Self {
            id: reply
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(paychat_common::new_id),
            role: Role::Assistant,
            content: reply.content,
            ts: reply.ts.unwrap_or_else(Utc::now),
            trace: reply.trace,
            tool_calls: reply.tool_calls,
            pending_approval,
        };
        (message, reply.resume)
    }
}

/// Clears the busy flag on drop, so it is released on every exit path of a
/// turn, including an early return.
pub(crate) struct BusyGuard<'a> {
    log: &'a ConversationLog,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.log.busy.store(false, Ordering::Release);
        self.log.publish(Event::BusyChanged(false));
    }
}

/// Ordered transcript of one conversation plus the single-turn busy flag.
///
/// Records are only ever appended; the one removal is a full [`clear`](Self::clear).
#[derive(Default)]
pub struct ConversationLog {
    records: Mutex<Vec<Message>>,
    busy: AtomicBool,
    events: Option<Arc<EventBus>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn records(&self) -> MutexGuard<'_, Vec<Message>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: Event) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    /// Check-then-set the busy flag. `None` means a turn is already in flight.
    pub(crate) fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        self.publish(Event::BusyChanged(true));
        Some(BusyGuard { log: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn append(&self, message: Message) {
        let event = Event::RecordAppended {
            id: message.id.clone(),
            role: message.role.as_str().to_string(),
        };
        self.records().push(message);
        self.publish(event);
    }

    /// Copy of the transcript in insertion order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.records().clone()
    }

    /// Records appended after the first `from`.
    pub fn since(&self, from: usize) -> Vec<Message> {
        self.records().iter().skip(from).cloned().collect()
    }

    pub fn last(&self) -> Option<Message> {
        self.records().last().cloned()
    }

    pub fn last_role(&self) -> Option<Role> {
        self.records().last().map(|m| m.role)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn clear(&self) {
        self.records().clear();
        self.publish(Event::LogCleared);
    }
}
