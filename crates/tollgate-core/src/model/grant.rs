use serde::{Deserialize, Serialize};
use strum::Display;

use super::ids::{DestinationId, SubscriberId};

/// A time-bounded access permission for one subscriber to one destination.
///
/// Expiry is a Unix timestamp; a past value means the grant is expired
/// but still on record. Grants are deleted only by explicit revocation
/// or superseded by a new approval -- never garbage-collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupGrant {
    pub subscriber: SubscriberId,
    pub destination: DestinationId,
    pub expires_at: i64,
}

/// Whether a grant is the subscriber's denormalized main grant or one of
/// the keyed secondary rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantTier {
    Primary,
    Secondary,
}

/// Why the reconciliation loop flagged a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExpiryReason {
    /// Expiry falls within the reminder window.
    Soon,
    /// Expiry has passed.
    Expired,
}

/// One grant flagged by an expiry scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantHit {
    pub subscriber: SubscriberId,
    pub destination: DestinationId,
    pub expires_at: i64,
    pub tier: GrantTier,
}
