//! The live tool approval and the resume state that continues it.

use std::sync::{Mutex, MutexGuard};

use crate::protocol::{ApprovalDecision, ApprovalRequest, ApprovalSubmission, ResumeState};
use crate::ClientError;

#[derive(Default)]
struct State {
    live: Option<ApprovalRequest>,
    resume: Option<ResumeState>,
}

/// Tracks at most one approval awaiting a decision, paired with the opaque
/// resume state the backend needs to continue the suspended workflow.
///
/// The resume state is forwarded verbatim and never inspected.
#[derive(Default)]
pub struct ApprovalWorkflow {
    state: Mutex<State>,
}

impl ApprovalWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The approval currently awaiting a decision.
    pub fn live(&self) -> Option<ApprovalRequest> {
        self.state().live.clone()
    }

    pub fn has_resume_state(&self) -> bool {
        self.state().resume.is_some()
    }

    /// Build the submission for a decision on `approval_id`.
    ///
    /// Requires a held resume state and `approval_id` naming the live
    /// approval; anything else is `NoPendingApproval`.
    pub fn submission(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
    ) -> Result<ApprovalSubmission, ClientError> {
        let state = self.state();
        let (Some(live), Some(resume)) = (&state.live, &state.resume) else {
            return Err(ClientError::NoPendingApproval);
        };
        if live.approval_id != approval_id {
            return Err(ClientError::NoPendingApproval);
        }
        Ok(ApprovalSubmission {
            approval_id: approval_id.to_string(),
            decision,
            resume_state: resume.clone(),
        })
    }

    /// A new turn was issued: whatever was live is gone.
    pub fn supersede(&self) {
        let mut state = self.state();
        state.live = None;
        state.resume = None;
    }

    /// Record the outcome of a completed chat turn. The resume state is
    /// overwritten, or cleared if the reply carried none.
    pub fn on_reply(&self, live: Option<ApprovalRequest>, resume: Option<ResumeState>) {
        let mut state = self.state();
        state.live = live;
        state.resume = resume;
    }

    /// Record the outcome of a resolved decision. A reply without resume
    /// state keeps the previous one.
    pub fn on_decision(&self, live: Option<ApprovalRequest>, resume: Option<ResumeState>) {
        let mut state = self.state();
        state.live = live;
        if resume.is_some() {
            state.resume = resume;
        }
    }
}
