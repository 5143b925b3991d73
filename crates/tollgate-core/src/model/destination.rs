use serde::{Deserialize, Serialize};

use super::ids::DestinationId;

/// Kind of communication surface a destination is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Group,
    Channel,
}

/// A managed group or channel the system controls access to.
///
/// Registered by an operator; removed automatically when the transport
/// reports the chat no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub title: String,
    pub kind: DestinationKind,
    pub registered_at: i64,
}

impl Destination {
    pub fn new(
        id: DestinationId,
        title: impl Into<String>,
        kind: DestinationKind,
        registered_at: i64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            kind,
            registered_at,
        }
    }
}
