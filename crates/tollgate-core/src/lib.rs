// tollgate-core: decision logic for timed group access -- the payment
// workflow, grant storage, tenancy enforcement, and the reconciliation
// loop. All messaging goes through the `Transport` trait from
// tollgate-transport; this crate never touches HTTP or disk itself.

pub mod config;
pub mod ephemeral;
pub mod error;
pub mod escalation;
pub mod gatekeeper;
pub mod issuer;
pub mod model;
mod reconcile;
pub mod session;
pub mod store;
pub mod tenancy;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ServiceConfig;
pub use error::CoreError;
pub use escalation::EscalationOutcome;
pub use gatekeeper::Gatekeeper;
pub use issuer::AccessIssuer;
pub use session::{SessionState, SessionStore};
pub use store::{GrantStore, StoreStats};
pub use tenancy::{AdminExtension, TenancyGuard};
pub use workflow::{GrantResult, IssueOutcome};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Ids
    AdminId, DestinationId, PaymentId, SubscriberId,
    // Records
    AdminGrant, AdminScope, Destination, DestinationKind, GroupGrant, Payment, PaymentStatus,
    Subscriber,
    // Scan types
    ExpiryReason, GrantHit, GrantTier,
};
