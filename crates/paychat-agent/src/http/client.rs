//! HTTP transport struct, URL building, and status classification.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::ClientError;

use super::config::HttpConfig;

const DEFAULT_RATE_LIMIT_REASON: &str = "Rate limit reached. Please wait before trying again.";

/// Agent backend client over HTTP/JSON.
pub struct HttpTransport {
    pub(crate) config: HttpConfig,
    pub(crate) http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Join `path` onto the base URL without doubling or dropping slashes.
    pub(crate) fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Decode a success body or classify the failure.
    pub(crate) async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        self.decode_with(response, classify_failure).await
    }

    pub(crate) async fn decode_with<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        classify: fn(u16, Option<u64>, &str) -> ClientError,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")));
        }

        let retry_after = retry_after_header(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(classify(status.as_u16(), retry_after, &body))
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a request that never produced a response.
pub(crate) fn request_error(error: reqwest::Error) -> ClientError {
    if error.is_connect() || error.is_timeout() {
        ClientError::Unreachable(error.to_string())
    } else {
        ClientError::Transport(error.to_string())
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub(crate) fn classify_failure(status: u16, retry_after: Option<u64>, body: &str) -> ClientError {
    match status {
        401 => {
            ClientError::AuthExpired(error_detail(body).unwrap_or_else(|| "unauthorized".into()))
        }
        429 => rate_limited(body, retry_after),
        _ => ClientError::Http {
            status,
            message: error_detail(body).unwrap_or_default(),
        },
    }
}

/// An invalid access key comes back as 400, 401 or 403 depending on the backend.
pub(crate) fn classify_upgrade_failure(
    status: u16,
    retry_after: Option<u64>,
    body: &str,
) -> ClientError {
    match status {
        400 | 401 | 403 => ClientError::UpgradeRejected(
            error_detail(body).unwrap_or_else(|| "invalid access key".into()),
        ),
        _ => classify_failure(status, retry_after, body),
    }
}

/// Human-readable part of an error body: `detail`/`message`/`reason` when
/// it is JSON, the trimmed text otherwise.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return Some(body.to_string());
    };
    ["detail", "message", "reason", "error"]
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_str()))
        .map(String::from)
        .or_else(|| Some(body.to_string()))
}

/// 429 bodies come flat (`{"reason", "retryAfterSec"}`) or wrapped in a
/// framework `detail` object (`{"detail": {"code", "metric", "retryAfterSec"}}`).
fn rate_limited(body: &str, retry_after_header: Option<u64>) -> ClientError {
    let json = serde_json::from_str::<serde_json::Value>(body.trim()).unwrap_or_default();
    let payload = match json.get("detail") {
        Some(detail) if detail.is_object() => detail,
        _ => &json,
    };

    let reason = ["reason", "message"]
        .iter()
        .find_map(|key| payload.get(key).and_then(|v| v.as_str()))
        .map(String::from)
        .or_else(|| {
            payload
                .get("metric")
                .and_then(|v| v.as_str())
                .map(|metric| format!("Rate limit reached for {metric}."))
        })
        .or_else(|| json.get("detail").and_then(|v| v.as_str()).map(String::from))
        .unwrap_or_else(|| DEFAULT_RATE_LIMIT_REASON.to_string());

    let retry_after_secs = ["retryAfterSec", "retry_after"]
        .iter()
        .find_map(|key| payload.get(key).and_then(|v| v.as_u64()))
        .or(retry_after_header);

    ClientError::RateLimited {
        reason,
        retry_after_secs,
    }
}
