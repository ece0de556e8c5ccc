//! Backend connection settings.

use serde::{Deserialize, Serialize};

/// Where the agent backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL that endpoint paths are joined onto.
    pub base_url: String,
    /// Connect timeout in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// Whole-request timeout in seconds (valid range: 1-600).
    pub request_timeout_secs: u32,
    /// Header that carries the session token on `session/limits`.
    pub session_header: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8010".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            session_header: "X-Session-Id".into(),
        }
    }
}
