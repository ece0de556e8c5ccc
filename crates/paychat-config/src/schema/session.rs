//! Session identity persistence settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the session identity is kept between turns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum SessionStoreKind {
    /// Lives as long as the process.
    #[default]
    Memory,
    /// JSON file, survives restarts.
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub store: SessionStoreKind,
    /// Override for the file store location.
    pub store_path: Option<PathBuf>,
    /// Allow a locally generated identity when `session/start` is unreachable.
    pub local_fallback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: SessionStoreKind::Memory,
            store_path: None,
            local_fallback: true,
        }
    }
}
