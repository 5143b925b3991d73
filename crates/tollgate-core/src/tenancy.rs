// ── Tenancy guard ──
//
// The single authority on which destinations an acting admin may touch.
// Every operation that names a destination routes through `authorize`;
// nothing else in the codebase re-implements the allow-list check.
//
// Super-admins come from the static config allow-list and are always
// unrestricted. Scoped admins are store records with an assigned
// destination set, a quota, and a liveness window that is checked live:
// a grant whose expiry has passed is inert to every operation here even
// before the reconciliation loop deactivates it.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{AdminGrant, AdminId, DestinationId};
use crate::store::GrantStore;

/// How to extend a scoped admin's term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminExtension {
    Days(i64),
    Unlimited,
}

/// Resolves and enforces admin authority over destinations.
#[derive(Clone)]
pub struct TenancyGuard {
    store: Arc<GrantStore>,
    super_admins: Arc<[AdminId]>,
}

impl TenancyGuard {
    pub fn new(store: Arc<GrantStore>, super_admins: &[AdminId]) -> Self {
        Self {
            store,
            super_admins: super_admins.into(),
        }
    }

    pub fn is_super(&self, admin: AdminId) -> bool {
        self.super_admins.contains(&admin)
    }

    /// The destinations `admin` may operate on at `now`.
    ///
    /// Super-admin: every registered destination. Scoped admin: their
    /// assigned set intersected with currently-registered destinations --
    /// assignments pointing at since-removed destinations are silently
    /// dropped, never surfaced as errors.
    pub fn allowed_destinations(&self, admin: AdminId, now: i64) -> BTreeSet<DestinationId> {
        if self.is_super(admin) {
            return self.store.destination_ids();
        }
        match self.store.admin_grant(admin) {
            Some(grant) if grant.is_active_at(now) => {
                let registered = self.store.destination_ids();
                grant
                    .destinations
                    .iter()
                    .copied()
                    .filter(|d| registered.contains(d))
                    .collect()
            }
            _ => BTreeSet::new(),
        }
    }

    /// Membership test over [`allowed_destinations`](Self::allowed_destinations).
    pub fn authorize(&self, admin: AdminId, destination: DestinationId, now: i64) -> bool {
        if self.is_super(admin) {
            return self.store.destination_exists(destination);
        }
        self.allowed_destinations(admin, now).contains(&destination)
    }

    /// Every admin whose scope covers `destination` at `now` --
    /// super-admins plus live scoped admins assigned to it.
    pub fn admins_for(&self, destination: DestinationId, now: i64) -> Vec<AdminId> {
        let mut admins: Vec<AdminId> = self.super_admins.to_vec();
        for grant in self.store.admin_grants_snapshot() {
            if grant.is_active_at(now) && grant.destinations.contains(&destination) {
                admins.push(grant.admin);
            }
        }
        admins.sort_unstable();
        admins.dedup();
        admins
    }

    // ── Scoped-admin lifecycle (super-admin only) ────────────────────

    /// Create a scoped admin grant.
    pub fn create_admin(
        &self,
        acting: AdminId,
        admin: AdminId,
        expires_at: Option<i64>,
        quota: i32,
        plan: &str,
    ) -> Result<AdminGrant, CoreError> {
        self.require_super(acting)?;
        let grant = AdminGrant::new(admin, expires_at, quota, plan);
        self.store.insert_admin_grant(grant.clone());
        Ok(grant)
    }

    /// Replace an admin's assigned destination set, enforcing the quota.
    ///
    /// Quota is checked here, at assignment time only -- it is not
    /// re-validated by the reconciliation loop.
    pub fn assign(
        &self,
        acting: AdminId,
        admin: AdminId,
        destinations: BTreeSet<DestinationId>,
    ) -> Result<(), CoreError> {
        self.require_super(acting)?;
        self.store.with_admin_grant(admin, |grant| {
            if !grant.quota_allows(destinations.len()) {
                return Err(CoreError::QuotaExceeded {
                    admin,
                    quota: grant.quota,
                    requested: destinations.len(),
                });
            }
            grant.destinations = destinations;
            Ok(())
        })?
    }

    pub fn pause(&self, acting: AdminId, admin: AdminId) -> Result<(), CoreError> {
        self.require_super(acting)?;
        self.store.with_admin_grant(admin, |grant| {
            grant.active = false;
        })
    }

    pub fn resume(&self, acting: AdminId, admin: AdminId) -> Result<(), CoreError> {
        self.require_super(acting)?;
        self.store.with_admin_grant(admin, |grant| {
            grant.active = true;
        })
    }

    /// Extend an admin's term. Days extend from the current expiry if it
    /// is still ahead, otherwise from `now`; either form reactivates a
    /// grant that lapsed by expiry.
    pub fn extend(
        &self,
        acting: AdminId,
        admin: AdminId,
        extension: AdminExtension,
        now: i64,
    ) -> Result<(), CoreError> {
        self.require_super(acting)?;
        self.store.with_admin_grant(admin, |grant| {
            match extension {
                AdminExtension::Days(days) => {
                    let base = grant.expires_at.map_or(now, |e| e.max(now));
                    grant.expires_at = Some(base + days * 86_400);
                }
                AdminExtension::Unlimited => grant.expires_at = None,
            }
            grant.active = true;
            grant.last_warned_at = None;
        })
    }

    pub fn remove(&self, acting: AdminId, admin: AdminId) -> Result<(), CoreError> {
        self.require_super(acting)?;
        self.store
            .remove_admin_grant(admin)
            .map(|_| ())
            .ok_or(CoreError::AdminNotFound { admin })
    }

    fn require_super(&self, acting: AdminId) -> Result<(), CoreError> {
        if self.is_super(acting) {
            Ok(())
        } else {
            Err(CoreError::SuperAdminRequired { admin: acting })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Destination, DestinationKind};

    const NOW: i64 = 1_000_000;

    fn guard_with_destinations(dests: &[i64]) -> (TenancyGuard, Arc<GrantStore>) {
        let store = Arc::new(GrantStore::new());
        for &d in dests {
            store.add_destination(Destination::new(
                DestinationId::new(d),
                format!("dest {d}"),
                DestinationKind::Group,
                0,
            ));
        }
        let guard = TenancyGuard::new(Arc::clone(&store), &[AdminId::new(1)]);
        (guard, store)
    }

    #[test]
    fn super_admin_sees_all_registered_destinations() {
        let (guard, _store) = guard_with_destinations(&[-1, -2, -3]);
        let allowed = guard.allowed_destinations(AdminId::new(1), NOW);
        assert_eq!(allowed.len(), 3);
        assert!(guard.authorize(AdminId::new(1), DestinationId::new(-2), NOW));
    }

    #[test]
    fn super_admin_cannot_touch_unregistered_destination() {
        let (guard, _store) = guard_with_destinations(&[-1]);
        assert!(!guard.authorize(AdminId::new(1), DestinationId::new(-99), NOW));
    }

    #[test]
    fn scoped_admin_sees_assigned_intersect_registered() {
        let (guard, _store) = guard_with_destinations(&[-1, -2]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);

        guard.create_admin(acting, scoped, None, 0, "basic").unwrap();
        // -7 was removed at some point; the stale assignment is dropped
        // silently.
        guard
            .assign(
                acting,
                scoped,
                [DestinationId::new(-1), DestinationId::new(-7)]
                    .into_iter()
                    .collect(),
            )
            .unwrap();

        let allowed = guard.allowed_destinations(scoped, NOW);
        assert_eq!(
            allowed,
            [DestinationId::new(-1)].into_iter().collect::<BTreeSet<_>>()
        );
        assert!(!guard.authorize(scoped, DestinationId::new(-7), NOW));
    }

    #[test]
    fn expired_grant_is_inert_before_any_sweep() {
        let (guard, _store) = guard_with_destinations(&[-1]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);

        guard
            .create_admin(acting, scoped, Some(NOW - 1), 0, "basic")
            .unwrap();
        guard
            .assign(acting, scoped, [DestinationId::new(-1)].into_iter().collect())
            .unwrap();

        assert!(guard.allowed_destinations(scoped, NOW).is_empty());
        assert!(!guard.authorize(scoped, DestinationId::new(-1), NOW));
    }

    #[test]
    fn quota_is_enforced_at_assignment() {
        let (guard, _store) = guard_with_destinations(&[-1, -2, -3]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);

        guard.create_admin(acting, scoped, None, 2, "basic").unwrap();
        let too_many: BTreeSet<_> = [-1, -2, -3]
            .into_iter()
            .map(DestinationId::new)
            .collect();

        let res = guard.assign(acting, scoped, too_many);
        assert!(matches!(res, Err(CoreError::QuotaExceeded { quota: 2, .. })));

        let two: BTreeSet<_> = [-1, -2].into_iter().map(DestinationId::new).collect();
        guard.assign(acting, scoped, two).unwrap();
    }

    #[test]
    fn lifecycle_ops_require_super() {
        let (guard, _store) = guard_with_destinations(&[-1]);
        let outsider = AdminId::new(5);

        let res = guard.create_admin(outsider, AdminId::new(6), None, 0, "basic");
        assert!(matches!(res, Err(CoreError::SuperAdminRequired { .. })));
        let res = guard.pause(outsider, AdminId::new(6));
        assert!(matches!(res, Err(CoreError::SuperAdminRequired { .. })));
    }

    #[test]
    fn pause_and_resume_flip_liveness() {
        let (guard, _store) = guard_with_destinations(&[-1]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);

        guard.create_admin(acting, scoped, None, 0, "basic").unwrap();
        guard
            .assign(acting, scoped, [DestinationId::new(-1)].into_iter().collect())
            .unwrap();

        guard.pause(acting, scoped).unwrap();
        assert!(!guard.authorize(scoped, DestinationId::new(-1), NOW));
        guard.resume(acting, scoped).unwrap();
        assert!(guard.authorize(scoped, DestinationId::new(-1), NOW));
    }

    #[test]
    fn extend_reactivates_a_lapsed_grant() {
        let (guard, store) = guard_with_destinations(&[-1]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);

        guard
            .create_admin(acting, scoped, Some(NOW - 10), 0, "basic")
            .unwrap();
        guard
            .extend(acting, scoped, AdminExtension::Days(5), NOW)
            .unwrap();

        let grant = store.admin_grant(scoped).unwrap();
        assert_eq!(grant.expires_at, Some(NOW + 5 * 86_400));
        assert!(grant.is_active_at(NOW));

        guard
            .extend(acting, scoped, AdminExtension::Unlimited, NOW)
            .unwrap();
        assert_eq!(store.admin_grant(scoped).unwrap().expires_at, None);
    }

    #[test]
    fn admins_for_includes_supers_and_assigned_scoped() {
        let (guard, _store) = guard_with_destinations(&[-1, -2]);
        let acting = AdminId::new(1);
        let scoped = AdminId::new(2);
        let other = AdminId::new(3);

        guard.create_admin(acting, scoped, None, 0, "basic").unwrap();
        guard
            .assign(acting, scoped, [DestinationId::new(-1)].into_iter().collect())
            .unwrap();
        guard.create_admin(acting, other, None, 0, "basic").unwrap();
        guard
            .assign(acting, other, [DestinationId::new(-2)].into_iter().collect())
            .unwrap();

        let admins = guard.admins_for(DestinationId::new(-1), NOW);
        assert_eq!(admins, vec![AdminId::new(1), AdminId::new(2)]);
    }
}
