//! Session identity: creation, renewal, tier upgrade and persistence.

mod manager;
mod store;

pub use manager::{Identity, IdentityOrigin, SessionIdentity};
pub use store::{FileStore, IdentityStore, MemoryStore};
