// ── Expiry range scans ──
//
// Read-only scans the reconciliation loop runs every cycle. "Soon
// expiring" and "expired" are disjoint by construction: soon is
// (now, now + window], expired is (0, now]. A zero expiry means no
// access was ever issued and is never a hit.

use super::GrantStore;
use crate::model::{DestinationId, GrantHit, GrantTier, SubscriberId};

impl GrantStore {
    /// Primary and secondary grants with expiry in `(now, now + window]`.
    pub fn grants_expiring_within(&self, now: i64, window: i64) -> Vec<GrantHit> {
        self.scan_grants(|expires_at| expires_at > now && expires_at <= now + window)
    }

    /// Primary and secondary grants with expiry in `(0, now]`.
    pub fn grants_expired(&self, now: i64) -> Vec<GrantHit> {
        self.scan_grants(|expires_at| expires_at > 0 && expires_at <= now)
    }

    fn scan_grants(&self, hit: impl Fn(i64) -> bool) -> Vec<GrantHit> {
        let mut hits: Vec<GrantHit> = Vec::new();

        for sub in self.subscribers.iter() {
            if let Some(destination) = sub.primary_destination {
                if hit(sub.expires_at) {
                    hits.push(GrantHit {
                        subscriber: sub.id,
                        destination,
                        expires_at: sub.expires_at,
                        tier: GrantTier::Primary,
                    });
                }
            }
        }

        for grant in self.secondary_grants.iter() {
            if hit(grant.expires_at) {
                hits.push(GrantHit {
                    subscriber: grant.subscriber,
                    destination: grant.destination,
                    expires_at: grant.expires_at,
                    tier: GrantTier::Secondary,
                });
            }
        }

        hits.sort_by_key(|h| (h.subscriber, h.destination));
        hits
    }

    /// Everyone holding a grant (primary or secondary) to `destination`,
    /// with the latest expiry winning when a subscriber holds both.
    pub fn members_of(&self, destination: DestinationId) -> Vec<(SubscriberId, i64)> {
        let mut merged: std::collections::BTreeMap<SubscriberId, i64> =
            std::collections::BTreeMap::new();

        for sub in self.subscribers.iter() {
            if sub.primary_destination == Some(destination) {
                merged
                    .entry(sub.id)
                    .and_modify(|e| *e = (*e).max(sub.expires_at))
                    .or_insert(sub.expires_at);
            }
        }
        for grant in self.secondary_grants.iter() {
            if grant.destination == destination {
                merged
                    .entry(grant.subscriber)
                    .and_modify(|e| *e = (*e).max(grant.expires_at))
                    .or_insert(grant.expires_at);
            }
        }

        merged.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::model::{DestinationId, GrantTier, SubscriberId};
    use crate::store::GrantStore;

    const DAY: i64 = 86_400;

    fn seeded_store(now: i64) -> GrantStore {
        let store = GrantStore::new();
        let d1 = DestinationId::new(-1);

        // Expired primary.
        let a = SubscriberId::new(1);
        store.ensure_subscriber(a, None, "a", 0);
        store.set_primary_grant(a, d1, now - 1).unwrap();

        // Soon-expiring primary (2 days out).
        let b = SubscriberId::new(2);
        store.ensure_subscriber(b, None, "b", 0);
        store.set_primary_grant(b, d1, now + 2 * DAY).unwrap();

        // Healthy primary (10 days out).
        let c = SubscriberId::new(3);
        store.ensure_subscriber(c, None, "c", 0);
        store.set_primary_grant(c, d1, now + 10 * DAY).unwrap();

        // Never-issued grant: no hit in either scan.
        let d = SubscriberId::new(4);
        store.ensure_subscriber(d, None, "d", 0);

        // Expired secondary.
        store.upsert_secondary_grant(b, DestinationId::new(-2), now - 50);

        store
    }

    #[test]
    fn soon_and_expired_sets_are_disjoint() {
        let now = 1_000_000;
        let store = seeded_store(now);

        let soon = store.grants_expiring_within(now, 3 * DAY);
        let expired = store.grants_expired(now);

        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].subscriber, SubscriberId::new(2));
        assert_eq!(soon[0].tier, GrantTier::Primary);

        assert_eq!(expired.len(), 2);
        assert!(
            expired
                .iter()
                .all(|h| soon.iter().all(|s| (s.subscriber, s.destination)
                    != (h.subscriber, h.destination)))
        );
    }

    #[test]
    fn boundary_exactly_now_is_expired_not_soon() {
        let now = 1_000_000;
        let store = GrantStore::new();
        let sub = SubscriberId::new(1);
        store.ensure_subscriber(sub, None, "a", 0);
        store
            .set_primary_grant(sub, DestinationId::new(-1), now)
            .unwrap();

        assert_eq!(store.grants_expired(now).len(), 1);
        assert!(store.grants_expiring_within(now, DAY).is_empty());
    }

    #[test]
    fn members_merge_takes_max_expiry() {
        let now = 1_000_000;
        let store = GrantStore::new();
        let sub = SubscriberId::new(1);
        let dest = DestinationId::new(-1);
        store.ensure_subscriber(sub, None, "a", 0);
        store.set_primary_grant(sub, dest, now + DAY).unwrap();
        store.upsert_secondary_grant(sub, dest, now + 5 * DAY);

        let members = store.members_of(dest);
        assert_eq!(members, vec![(sub, now + 5 * DAY)]);
    }
}
