// Domain model: typed ids and the five record kinds of the grant store.

mod admin;
mod destination;
mod grant;
mod ids;
mod payment;
mod subscriber;

pub use admin::{AdminGrant, AdminScope};
pub use destination::{Destination, DestinationKind};
pub use grant::{ExpiryReason, GrantHit, GrantTier, GroupGrant};
pub use ids::{AdminId, DestinationId, PaymentId, SubscriberId};
pub use payment::{Payment, PaymentStatus};
pub use subscriber::Subscriber;
