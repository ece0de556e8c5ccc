//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod backend;
mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::{PaychatConfig, SessionStoreKind};
use paychat_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PaychatConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    backend::validate_backend(&mut errors, config);

    if config.session.store == SessionStoreKind::Memory && config.session.store_path.is_some() {
        errors.push("session.store_path is only used with store = \"file\"".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
