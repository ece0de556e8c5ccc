//! Wire types for the agent backend.
//!
//! Decoding is lenient where the backend is loose (timestamps, missing
//! arrays, unknown statuses and tiers); encoding matches what the backend
//! expects byte-for-byte on field names.

mod message;
mod session;
mod timestamp;

pub use message::*;
pub use session::*;
