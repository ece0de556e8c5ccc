//! Backend section validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::PaychatConfig;

use super::helpers::{validate_non_empty, validate_range};

static BASE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/]+(/\S*)?$").unwrap());

pub(crate) fn validate_backend(errors: &mut Vec<String>, config: &PaychatConfig) {
    let backend = &config.backend;

    if !BASE_URL_RE.is_match(&backend.base_url) {
        errors.push(format!(
            "backend.base_url = {:?} is not an http(s) URL",
            backend.base_url
        ));
    }
    validate_range(
        errors,
        "backend.connect_timeout_secs",
        backend.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "backend.request_timeout_secs",
        backend.request_timeout_secs,
        1,
        600,
    );
    validate_non_empty(errors, "backend.session_header", &backend.session_header);
}
