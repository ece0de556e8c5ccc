//! paychat configuration system.
//!
//! TOML-based configuration with serde defaults, environment overrides,
//! and validation. Partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use paychat_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.backend.base_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{PaychatConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use paychat_common::ConfigError;

/// Environment variable that replaces `backend.base_url`.
pub const API_URL_ENV: &str = "PAYCHAT_API_URL";

/// Load config from the platform default path, apply environment
/// overrides, and validate the result.
pub fn load_config() -> Result<PaychatConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but reads an explicit file instead of the default.
pub fn load_config_from(path: &Path) -> Result<PaychatConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut PaychatConfig) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

fn apply_overrides_with(config: &mut PaychatConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::info!("backend.base_url overridden by {API_URL_ENV}");
        config.backend.base_url = url.trim().to_string();
    }
}
