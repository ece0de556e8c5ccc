//! The chat session context.
//!
//! A `ChatSession` ties one identity, one transcript, one live approval and
//! one limits snapshot to a transport. Turns go through a shared busy flag
//! and a single renew-and-retry on auth expiry.

mod chat;
mod manager;
mod types;

pub use manager::{ChatSession, ChatSessionBuilder};
pub use types::{RateLimitNotice, TurnOutcome};
