use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{AdminId, DestinationId};

/// Breadth of an admin's authority.
///
/// Super-admins come from the static allow-list in configuration and are
/// implicitly active and unrestricted; the store only ever holds records
/// for scoped admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminScope {
    Super,
    Scoped,
}

/// A scoped admin's standing: which destinations they may operate on,
/// how many they may be assigned, and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminGrant {
    pub admin: AdminId,
    pub scope: AdminScope,
    pub active: bool,
    /// Unix expiry; `None` = unlimited.
    pub expires_at: Option<i64>,
    /// Destinations this admin is assigned to. A `BTreeSet` keeps the
    /// set deterministically ordered by destination id.
    pub destinations: BTreeSet<DestinationId>,
    /// Max assignable destinations. Zero or negative = unlimited.
    pub quota: i32,
    pub plan: String,
    /// When the expiry-warning for this grant last fired.
    pub last_warned_at: Option<i64>,
}

impl AdminGrant {
    pub fn new(admin: AdminId, expires_at: Option<i64>, quota: i32, plan: impl Into<String>) -> Self {
        Self {
            admin,
            scope: AdminScope::Scoped,
            active: true,
            expires_at,
            destinations: BTreeSet::new(),
            quota,
            plan: plan.into(),
            last_warned_at: None,
        }
    }

    /// Whether this grant is usable at `now`.
    ///
    /// Checked live by every operation -- a grant whose expiry has passed
    /// is inactive even before the background sweep deactivates it.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.active && self.expires_at.is_none_or(|e| e > now)
    }

    /// Whether the quota permits holding `count` destinations.
    pub fn quota_allows(&self, count: usize) -> bool {
        self.quota <= 0 || count <= usize::try_from(self.quota).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn past_expiry_is_inactive_before_any_sweep() {
        let grant = AdminGrant::new(AdminId::new(9), Some(1_000), 0, "basic");
        assert!(grant.is_active_at(999));
        assert!(!grant.is_active_at(1_000));
        assert!(!grant.is_active_at(2_000));
    }

    #[test]
    fn paused_grant_is_inactive_regardless_of_expiry() {
        let mut grant = AdminGrant::new(AdminId::new(9), None, 0, "basic");
        grant.active = false;
        assert!(!grant.is_active_at(0));
    }

    #[test]
    fn zero_or_negative_quota_is_unlimited() {
        let grant = AdminGrant::new(AdminId::new(9), None, 0, "basic");
        assert!(grant.quota_allows(1_000));
        let grant = AdminGrant::new(AdminId::new(9), None, -1, "basic");
        assert!(grant.quota_allows(1_000));
        let grant = AdminGrant::new(AdminId::new(9), None, 2, "basic");
        assert!(grant.quota_allows(2));
        assert!(!grant.quota_allows(3));
    }
}
