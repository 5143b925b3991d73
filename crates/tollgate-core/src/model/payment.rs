use serde::{Deserialize, Serialize};
use strum::Display;

use super::ids::{AdminId, PaymentId, SubscriberId};

/// Lifecycle of a submitted receipt. Terminal once non-pending: a
/// decided payment is never re-decided, only superseded by a new
/// submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

/// A user-submitted payment receipt awaiting (or past) manual review.
///
/// The receipt handle is an opaque reference into the transport's file
/// storage -- it is never inspected or verified programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subscriber: SubscriberId,
    pub receipt: String,
    pub status: PaymentStatus,
    pub created_at: i64,
    /// Admin who approved or rejected; unset while pending.
    pub decided_by: Option<AdminId>,
}

impl Payment {
    pub fn is_decided(&self) -> bool {
        self.status != PaymentStatus::Pending
    }
}
