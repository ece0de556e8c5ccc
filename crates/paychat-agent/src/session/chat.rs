//! Turns: `send`, `approve` and `deny`.

use std::future::Future;
use std::time::Instant;

use paychat_common::{new_correlation_id, SessionId};
use tracing::{debug, warn};

use crate::conversation::{BusyGuard, Message};
use crate::protocol::{ApprovalDecision, AssistantMessage, ChatExtras, ChatRequest};
use crate::recovery::run_with_recovery;
use crate::ClientError;

use super::manager::{lock, ChatSession};
use super::types::{RateLimitNotice, TurnOutcome};

impl ChatSession {
    /// Send one user message.
    ///
    /// Appends the user record at once and exactly one assistant record when
    /// the turn settles: the reply, or an apology on failure. Ignored if the
    /// trimmed text is empty or another turn is in flight.
    pub async fn send(&self, text: &str, extras: Option<ChatExtras>) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }
        let Some(busy) = self.log.try_begin() else {
            debug!("Turn in flight, ignoring send");
            return TurnOutcome::Ignored;
        };

        let turn = new_correlation_id();
        debug!(%turn, chars = text.len(), "Sending message");
        self.clear_error();
        lock(&self.rate_limit).take();
        self.latency.begin(Instant::now());
        self.approvals.supersede();
        self.log.append(Message::user(text));

        let request = ChatRequest {
            message: text.to_string(),
            extras,
        };
        let transport = self.transport.as_ref();
        let request = &request;
        let result = self
            .with_session(move |session| async move { transport.chat(&session, request).await })
            .await;

        let outcome = match result {
            Ok(reply) => {
                let (message, resume) = Message::from_reply(reply);
                self.approvals
                    .on_reply(message.pending_approval.clone(), resume);
                self.log.append(message);
                TurnOutcome::Completed
            }
            Err(e) => self.fail_turn(&turn, e),
        };
        self.settle(busy).await;
        outcome
    }

    /// Approve the live approval `approval_id`.
    pub async fn approve(&self, approval_id: &str) -> TurnOutcome {
        self.decide(approval_id, ApprovalDecision::Approve).await
    }

    /// Reject the live approval `approval_id`.
    pub async fn deny(&self, approval_id: &str) -> TurnOutcome {
        self.decide(approval_id, ApprovalDecision::Deny).await
    }

    async fn decide(&self, approval_id: &str, decision: ApprovalDecision) -> TurnOutcome {
        let Some(busy) = self.log.try_begin() else {
            debug!("Turn in flight, ignoring decision");
            return TurnOutcome::Ignored;
        };
        self.clear_error();

        let submission = match self.approvals.submission(approval_id, decision) {
            Ok(submission) => submission,
            Err(e) => {
                let message = match decision {
                    ApprovalDecision::Approve => "Nothing to approve.",
                    ApprovalDecision::Deny => "Nothing to reject.",
                };
                self.surface(message, e);
                return TurnOutcome::Refused;
            }
        };
        let turn = new_correlation_id();
        debug!(%turn, approval_id, ?decision, "Submitting approval decision");

        let transport = self.transport.as_ref();
        let submission = &submission;
        let result = self
            .with_session(move |session| async move {
                transport.submit_approval(&session, submission).await
            })
            .await;

        let outcome = match result {
            Ok(reply) => self.complete_decision(reply),
            Err(e) => self.fail_turn(&turn, e),
        };
        self.settle(busy).await;
        outcome
    }

    fn complete_decision(&self, reply: AssistantMessage) -> TurnOutcome {
        let (message, resume) = Message::from_reply(reply);
        self.approvals
            .on_decision(message.pending_approval.clone(), resume);
        self.log.append(message);
        TurnOutcome::Completed
    }

    /// Run `op` against the current identity, renewing it and retrying once
    /// if the backend reports it expired.
    async fn with_session<T, Op, Fut>(&self, op: Op) -> Result<T, ClientError>
    where
        Op: FnMut(SessionId) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let transport = self.transport.as_ref();
        let session = self.identity.ensure(transport).await?;
        self.limits.enable();

        run_with_recovery(session, op, ClientError::is_auth_expired, move || async move {
            warn!("Session rejected by backend, renewing and retrying once");
            let renewed = self.identity.renew(transport).await?;
            self.limits.invalidate();
            Ok::<_, ClientError>(renewed)
        })
        .await
        .map_err(ClientError::into_terminal)
    }

    /// Surface `err` and append the apology record.
    fn fail_turn(&self, turn: &str, err: ClientError) -> TurnOutcome {
        warn!(turn, error = %err, "Turn failed");
        if let ClientError::RateLimited {
            reason,
            retry_after_secs,
        } = &err
        {
            *lock(&self.rate_limit) = Some(
                RateLimitNotice::new(reason.clone(), *retry_after_secs, Instant::now()),
            );
        }
        self.surface(err.to_string(), err);
        self.log.append(Message::apology());
        TurnOutcome::Failed
    }

    /// Release the busy flag, stop the latency clock and refresh limits.
    async fn settle(&self, busy: BusyGuard<'_>) {
        drop(busy);
        self.latency
            .observe(self.log.is_busy(), self.log.last_role(), Instant::now());
        self.refresh_limits().await;
    }
}
