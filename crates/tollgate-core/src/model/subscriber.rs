use serde::{Deserialize, Serialize};

use super::ids::{DestinationId, SubscriberId};

/// A person who pays for access to one or more destinations.
///
/// Created on first contact and never hard-deleted -- expired and removed
/// subscribers stay on record for audit. The subscriber's main
/// destination is denormalized here as the "primary" grant
/// (`primary_destination` + `expires_at`); grants to further destinations
/// live in the store's secondary grant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub username: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    /// Free-form course label chosen during registration.
    pub course: Option<String>,
    /// Unix timestamp of first contact.
    pub registered_at: i64,
    /// Unix timestamp of contract acceptance, if given.
    pub agreed_at: Option<i64>,
    /// Main destination of the primary grant.
    pub primary_destination: Option<DestinationId>,
    /// Primary grant expiry. 0 = no access issued yet; a past value means
    /// expired but not revoked.
    pub expires_at: i64,
}

impl Subscriber {
    pub fn new(id: SubscriberId, full_name: impl Into<String>, registered_at: i64) -> Self {
        Self {
            id,
            username: None,
            full_name: full_name.into(),
            phone: None,
            course: None,
            registered_at,
            agreed_at: None,
            primary_destination: None,
            expires_at: 0,
        }
    }

    /// Whether a primary grant has ever been issued.
    pub fn has_primary_grant(&self) -> bool {
        self.expires_at > 0
    }

    /// `@username` when known, otherwise the full name.
    pub fn display_tag(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => self.full_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_subscriber_has_no_grant() {
        let sub = Subscriber::new(SubscriberId::new(1), "Ada", 1_700_000_000);
        assert!(!sub.has_primary_grant());
        assert_eq!(sub.display_tag(), "Ada");
    }

    #[test]
    fn display_tag_prefers_username() {
        let mut sub = Subscriber::new(SubscriberId::new(1), "Ada", 0);
        sub.username = Some("ada".into());
        assert_eq!(sub.display_tag(), "@ada");
    }
}
