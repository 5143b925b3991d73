// ── Central grant store ──
//
// Thread-safe storage for every record kind: subscribers (with the
// denormalized primary grant), destinations, payments, scoped admin
// grants, and the keyed secondary-grant table. All compound mutations
// go through `DashMap` entries, so each is atomic per key without any
// lock held across an await.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::CoreError;
use crate::model::{
    AdminGrant, AdminId, Destination, DestinationId, GroupGrant, Payment, PaymentId,
    PaymentStatus, Subscriber, SubscriberId,
};

/// Aggregate counts for the admin stats surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total_subscribers: usize,
    pub active_subscribers: usize,
    pub expired_subscribers: usize,
    pub pending_payments: usize,
    pub approved_payments: usize,
}

/// Keyed record storage for the whole service.
pub struct GrantStore {
    pub(crate) subscribers: DashMap<SubscriberId, Subscriber>,
    pub(crate) destinations: DashMap<DestinationId, Destination>,
    pub(crate) payments: DashMap<PaymentId, Payment>,
    pub(crate) admin_grants: DashMap<AdminId, AdminGrant>,
    pub(crate) secondary_grants: DashMap<(SubscriberId, DestinationId), GroupGrant>,
    next_payment_id: AtomicU64,
}

impl GrantStore {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            destinations: DashMap::new(),
            payments: DashMap::new(),
            admin_grants: DashMap::new(),
            secondary_grants: DashMap::new(),
            next_payment_id: AtomicU64::new(1),
        }
    }

    // ── Subscribers ──────────────────────────────────────────────────

    /// Create the subscriber record on first contact, or refresh the
    /// display name on a repeat visit. Never deletes anything.
    pub fn ensure_subscriber(
        &self,
        id: SubscriberId,
        username: Option<&str>,
        full_name: &str,
        now: i64,
    ) -> Subscriber {
        let mut entry = self
            .subscribers
            .entry(id)
            .or_insert_with(|| Subscriber::new(id, full_name, now));
        if !full_name.is_empty() {
            entry.full_name = full_name.to_owned();
        }
        if let Some(name) = username {
            entry.username = Some(name.to_owned());
        }
        entry.clone()
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<Subscriber> {
        self.subscribers.get(&id).map(|r| r.value().clone())
    }

    pub fn subscribers_snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.iter().map(|r| r.value().clone()).collect()
    }

    pub fn update_phone(&self, id: SubscriberId, phone: &str) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| sub.phone = Some(phone.to_owned()))
    }

    pub fn update_full_name(&self, id: SubscriberId, full_name: &str) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| sub.full_name = full_name.to_owned())
    }

    pub fn update_course(&self, id: SubscriberId, course: &str) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| sub.course = Some(course.to_owned()))
    }

    pub fn set_agreed(&self, id: SubscriberId, at: i64) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| sub.agreed_at = Some(at))
    }

    fn with_subscriber(
        &self,
        id: SubscriberId,
        f: impl FnOnce(&mut Subscriber),
    ) -> Result<(), CoreError> {
        match self.subscribers.get_mut(&id) {
            Some(mut sub) => {
                f(&mut sub);
                Ok(())
            }
            None => Err(CoreError::SubscriberNotFound { subscriber: id }),
        }
    }

    // ── Primary grants (denormalized on the subscriber) ──────────────

    /// Point the subscriber's primary grant at `destination` with the
    /// given expiry. Upsert semantics: a prior primary grant is
    /// superseded, whatever destination it pointed at.
    pub fn set_primary_grant(
        &self,
        id: SubscriberId,
        destination: DestinationId,
        expires_at: i64,
    ) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| {
            sub.primary_destination = Some(destination);
            sub.expires_at = expires_at;
        })
    }

    /// Move the primary expiry without touching the destination pointer.
    pub fn extend_primary(&self, id: SubscriberId, expires_at: i64) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| sub.expires_at = expires_at)
    }

    /// Revoke the primary grant, but only if it points at `destination`.
    pub fn clear_primary_grant(
        &self,
        id: SubscriberId,
        destination: DestinationId,
    ) -> Result<(), CoreError> {
        self.with_subscriber(id, |sub| {
            if sub.primary_destination == Some(destination) {
                sub.primary_destination = None;
                sub.expires_at = 0;
            }
        })
    }

    // ── Secondary grants ─────────────────────────────────────────────

    pub fn upsert_secondary_grant(
        &self,
        subscriber: SubscriberId,
        destination: DestinationId,
        expires_at: i64,
    ) {
        self.secondary_grants.insert(
            (subscriber, destination),
            GroupGrant {
                subscriber,
                destination,
                expires_at,
            },
        );
    }

    pub fn remove_secondary_grant(
        &self,
        subscriber: SubscriberId,
        destination: DestinationId,
    ) -> Option<GroupGrant> {
        self.secondary_grants
            .remove(&(subscriber, destination))
            .map(|(_, grant)| grant)
    }

    pub fn secondary_grants_of(&self, subscriber: SubscriberId) -> Vec<GroupGrant> {
        self.secondary_grants
            .iter()
            .filter(|r| r.subscriber == subscriber)
            .map(|r| *r)
            .collect()
    }

    // ── Destinations ─────────────────────────────────────────────────

    pub fn add_destination(&self, destination: Destination) {
        self.destinations.insert(destination.id, destination);
    }

    pub fn destination(&self, id: DestinationId) -> Option<Destination> {
        self.destinations.get(&id).map(|r| r.value().clone())
    }

    pub fn destinations_snapshot(&self) -> Vec<Destination> {
        self.destinations.iter().map(|r| r.value().clone()).collect()
    }

    /// Currently-registered destination ids, ordered.
    pub fn destination_ids(&self) -> BTreeSet<DestinationId> {
        self.destinations.iter().map(|r| r.id).collect()
    }

    pub fn destination_exists(&self, id: DestinationId) -> bool {
        self.destinations.contains_key(&id)
    }

    /// Remove a destination and every grant that depends on it.
    ///
    /// Primary grants pointing at it are revoked; secondary rows are
    /// deleted. Admin assignments are left in place -- the tenancy guard
    /// drops assignments to unregistered destinations on read.
    pub fn remove_destination(&self, id: DestinationId) -> Option<Destination> {
        let removed = self.destinations.remove(&id).map(|(_, d)| d);
        if removed.is_some() {
            for mut sub in self.subscribers.iter_mut() {
                if sub.primary_destination == Some(id) {
                    sub.primary_destination = None;
                    sub.expires_at = 0;
                }
            }
            self.secondary_grants.retain(|(_, dest), _| *dest != id);
        }
        removed
    }

    // ── Payments ─────────────────────────────────────────────────────

    /// Record a freshly submitted receipt as a pending payment.
    pub fn insert_payment(&self, subscriber: SubscriberId, receipt: &str, now: i64) -> Payment {
        let id = PaymentId::new(self.next_payment_id.fetch_add(1, Ordering::Relaxed));
        let payment = Payment {
            id,
            subscriber,
            receipt: receipt.to_owned(),
            status: PaymentStatus::Pending,
            created_at: now,
            decided_by: None,
        };
        self.payments.insert(id, payment.clone());
        payment
    }

    pub fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.payments.get(&id).map(|r| r.value().clone())
    }

    pub fn pending_payments(&self) -> Vec<Payment> {
        let mut pending: Vec<Payment> = self
            .payments
            .iter()
            .filter(|r| r.status == PaymentStatus::Pending)
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by_key(|p| p.id);
        pending
    }

    /// Transition a payment out of `Pending`, exactly once.
    ///
    /// The check and the write happen under one map entry, so two racing
    /// decisions cannot both succeed: the loser sees `AlreadyDecided`.
    pub fn decide_payment(
        &self,
        id: PaymentId,
        decision: PaymentStatus,
        admin: AdminId,
    ) -> Result<Payment, CoreError> {
        debug_assert!(decision != PaymentStatus::Pending);
        match self.payments.get_mut(&id) {
            Some(mut payment) => {
                if payment.is_decided() {
                    return Err(CoreError::AlreadyDecided { payment: id });
                }
                payment.status = decision;
                payment.decided_by = Some(admin);
                Ok(payment.clone())
            }
            None => Err(CoreError::PaymentNotFound { payment: id }),
        }
    }

    // ── Admin grants ─────────────────────────────────────────────────

    pub fn insert_admin_grant(&self, grant: AdminGrant) {
        self.admin_grants.insert(grant.admin, grant);
    }

    pub fn admin_grant(&self, id: AdminId) -> Option<AdminGrant> {
        self.admin_grants.get(&id).map(|r| r.value().clone())
    }

    pub fn admin_grants_snapshot(&self) -> Vec<AdminGrant> {
        self.admin_grants.iter().map(|r| r.value().clone()).collect()
    }

    pub fn remove_admin_grant(&self, id: AdminId) -> Option<AdminGrant> {
        self.admin_grants.remove(&id).map(|(_, g)| g)
    }

    /// Mutate an admin grant in place, atomically per key. The closure's
    /// return value is passed through.
    pub fn with_admin_grant<T>(
        &self,
        id: AdminId,
        f: impl FnOnce(&mut AdminGrant) -> T,
    ) -> Result<T, CoreError> {
        match self.admin_grants.get_mut(&id) {
            Some(mut grant) => Ok(f(&mut grant)),
            None => Err(CoreError::AdminNotFound { admin: id }),
        }
    }

    // ── Stats ────────────────────────────────────────────────────────

    /// Aggregate counts. A subscriber is "active" while any of their
    /// grants (primary or secondary) is still live.
    pub fn stats(&self, now: i64) -> StoreStats {
        let total_subscribers = self.subscribers.len();
        let active_subscribers = self
            .subscribers
            .iter()
            .filter(|sub| {
                sub.expires_at > now
                    || self
                        .secondary_grants
                        .iter()
                        .any(|g| g.subscriber == sub.id && g.expires_at > now)
            })
            .count();
        let pending_payments = self
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
            .count();
        let approved_payments = self
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Approved)
            .count();

        StoreStats {
            total_subscribers,
            active_subscribers,
            expired_subscribers: total_subscribers - active_subscribers,
            pending_payments,
            approved_payments,
        }
    }
}

impl Default for GrantStore {
    fn default() -> Self {
        Self::new()
    }
}
