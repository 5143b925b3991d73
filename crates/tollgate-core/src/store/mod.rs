// Persistence layer: keyed record storage with upsert-on-conflict
// semantics, conditional payment transitions, and expiry range scans.
// Pure data access -- no policy lives here.

mod grant_store;
mod scan;

pub use grant_store::{GrantStore, StoreStats};
