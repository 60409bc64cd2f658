//! In-memory registries backing the OAuth flow.
//!
//! Each store is a cheap `Clone` handle over an `Arc<RwLock<HashMap<..>>>`, so the
//! server, the handlers and the reaper can share one instance without globals.
//! Every store can be preloaded from, and exported to, a flat JSON snapshot.

pub mod clients;
pub mod codes;
pub mod snapshot;
pub mod tokens;

pub use clients::{Client, ClientRegistry};
pub use codes::CodeStore;
pub use tokens::{SweepPolicy, TokenStore};

/// Generate a new time-ordered random identifier (UUIDv7, 32 lowercase hex chars).
pub(crate) fn new_identifier() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
