//! AgentTransport trait implementation for HttpTransport.

use async_trait::async_trait;
use paychat_common::SessionId;
use serde::Serialize;
use tracing::debug;

use crate::protocol::{
    ApprovalSubmission, AssistantMessage, ChatExtras, ChatRequest, HealthStatus, LimitsReport,
    SessionGrant,
};
use crate::{AgentTransport, ClientError};

use super::client::{classify_upgrade_failure, request_error, HttpTransport};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    session_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    extras: Option<&'a ChatExtras>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpgradeBody<'a> {
    session_id: &'a str,
    access_key: &'a str,
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn start_session(&self) -> Result<SessionGrant, ClientError> {
        debug!("POST session/start");
        let response = self
            .http
            .post(self.url("/session/start"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(request_error)?;
        self.decode(response).await
    }

    async fn session_limits(&self, session: &SessionId) -> Result<LimitsReport, ClientError> {
        debug!("GET session/limits");
        let response = self
            .http
            .get(self.url("/session/limits"))
            .header(self.config.session_header.as_str(), session.as_str())
            .query(&[("sessionId", session.as_str())])
            .send()
            .await
            .map_err(request_error)?;
        self.decode(response).await
    }

    async fn upgrade_session(
        &self,
        session: &SessionId,
        access_key: &str,
    ) -> Result<SessionGrant, ClientError> {
        debug!("POST session/upgrade");
        let response = self
            .http
            .post(self.url("/session/upgrade"))
            .header(self.config.session_header.as_str(), session.as_str())
            .json(&UpgradeBody {
                session_id: session.as_str(),
                access_key,
            })
            .send()
            .await
            .map_err(request_error)?;

        self.decode_with(response, classify_upgrade_failure).await
    }

    async fn chat(
        &self,
        session: &SessionId,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ClientError> {
        debug!(chars = request.message.len(), "POST chat");
        let response = self
            .http
            .post(self.url("/chat"))
            .header(self.config.session_header.as_str(), session.as_str())
            .json(&ChatBody {
                session_id: session.as_str(),
                message: &request.message,
                extras: request.extras.as_ref(),
            })
            .send()
            .await
            .map_err(request_error)?;
        self.decode(response).await
    }

    async fn submit_approval(
        &self,
        session: &SessionId,
        submission: &ApprovalSubmission,
    ) -> Result<AssistantMessage, ClientError> {
        debug!(
            approval_id = %submission.approval_id,
            decision = ?submission.decision,
            "POST workflow/approval"
        );
        let response = self
            .http
            .post(self.url("/workflow/approval"))
            .header(self.config.session_header.as_str(), session.as_str())
            .json(submission)
            .send()
            .await
            .map_err(request_error)?;
        self.decode(response).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(request_error)?;
        self.decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_body_shape() {
        let extras = ChatExtras::default().with_customer_id(1).with_currency("USD");
        let body = ChatBody {
            session_id: "s-1",
            message: "Show spend for customer 1",
            extras: Some(&extras),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "sessionId": "s-1",
                "message": "Show spend for customer 1",
                "extras": {"customerId": 1, "currency": "USD"}
            })
        );
    }

    #[test]
    fn chat_body_omits_missing_extras() {
        let body = ChatBody {
            session_id: "s-1",
            message: "hi",
            extras: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"sessionId": "s-1", "message": "hi"})
        );
    }

    #[test]
    fn upgrade_body_shape() {
        let body = UpgradeBody {
            session_id: "s-1",
            access_key: "ACCESS-1234",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"sessionId": "s-1", "accessKey": "ACCESS-1234"})
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_classified() {
        // Port 9 (discard) on loopback is closed on any sane test host.
        let transport = HttpTransport::new(
            crate::HttpConfig::new("http://127.0.0.1:9")
                .with_connect_timeout(std::time::Duration::from_secs(2)),
        )
        .unwrap();
        let err = transport.health().await.unwrap_err();
        assert!(err.is_unreachable(), "unexpected error: {err:?}");
    }
}
