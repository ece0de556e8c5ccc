//! reqwest-backed implementation of [`crate::AgentTransport`].
//!
//! Maps HTTP statuses onto [`crate::ClientError`]: 401 is auth expiry
//! (a rejected key on upgrade), 429 is a rate limit with reason and
//! retry-after, connect failures and timeouts are "unreachable", and
//! everything else is a plain HTTP failure.

mod api;
mod client;
mod config;

pub use client::HttpTransport;
pub use config::HttpConfig;
