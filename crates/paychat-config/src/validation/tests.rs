//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = PaychatConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn accepts_https_url_with_path() {
    let mut config = PaychatConfig::default();
    config.backend.base_url = "https://agent.example.com/api/".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_non_http_base_url() {
    let mut config = PaychatConfig::default();
    config.backend.base_url = "ftp://agent.example.com".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.base_url"));
}

#[test]
fn catches_empty_base_url() {
    let mut config = PaychatConfig::default();
    config.backend.base_url = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.base_url"));
}

#[test]
fn catches_zero_connect_timeout() {
    let mut config = PaychatConfig::default();
    config.backend.connect_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.connect_timeout_secs"));
}

#[test]
fn catches_request_timeout_too_large() {
    let mut config = PaychatConfig::default();
    config.backend.request_timeout_secs = 3600;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.request_timeout_secs"));
}

#[test]
fn catches_blank_session_header() {
    let mut config = PaychatConfig::default();
    config.backend.session_header = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.session_header"));
}

#[test]
fn store_path_without_file_store_is_rejected() {
    let mut config = PaychatConfig::default();
    config.session.store_path = Some("/tmp/session.json".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.store_path"));

    config.session.store = SessionStoreKind::File;
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = PaychatConfig::default();
    config.backend.base_url = "nope".into();
    config.backend.connect_timeout_secs = 0;
    config.backend.request_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.base_url"));
    assert!(err.contains("backend.connect_timeout_secs"));
    assert!(err.contains("backend.request_timeout_secs"));
}
