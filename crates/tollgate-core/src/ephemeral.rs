// ── Ephemeral reconciliation state ──
//
// Warning rate-limits, not-paid strike counters, and the
// missing-destination report guard. None of this survives a restart;
// the worst case after a crash is one early repeat warning, which the
// cooldown absorbs on the next cycle.
//
// Every compound read-modify-write goes through a `DashMap` entry, so
// each key's sequence is serialized without holding anything across an
// await.

use dashmap::{DashMap, DashSet};

use crate::model::{DestinationId, ExpiryReason, SubscriberId};

// ── Warning records ─────────────────────────────────────────────────

/// Rate-limit key: one warning stream per (subscriber, destination, reason).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarningKey {
    pub subscriber: SubscriberId,
    pub destination: DestinationId,
    pub reason: ExpiryReason,
}

/// Last-sent timestamps for expiry warnings.
#[derive(Debug, Default)]
pub struct WarningRecords {
    last_sent: DashMap<WarningKey, i64>,
}

impl WarningRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check the cooldown and claim the send slot.
    ///
    /// Returns `true` exactly once per cooldown window per key: the
    /// caller that gets `true` must send the warning. Check and
    /// timestamp update happen under one entry, so interleaved cycles
    /// cannot double-send.
    pub fn try_claim(&self, key: WarningKey, now: i64, cooldown_secs: i64) -> bool {
        let mut claimed = false;
        self.last_sent
            .entry(key)
            .and_modify(|last| {
                if now - *last >= cooldown_secs {
                    *last = now;
                    claimed = true;
                }
            })
            .or_insert_with(|| {
                claimed = true;
                now
            });
        claimed
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}

// ── Not-paid counters ───────────────────────────────────────────────

/// Strike counters driving the escalation-to-removal state machine.
#[derive(Debug, Default)]
pub struct NotPaidCounters {
    counts: DashMap<(SubscriberId, DestinationId), u32>,
}

impl NotPaidCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a strike and return the new count. Atomic per key: two
    /// interleaved calls yield two distinct counts.
    pub fn increment(&self, subscriber: SubscriberId, destination: DestinationId) -> u32 {
        let mut entry = self.counts.entry((subscriber, destination)).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Reset on payment or on executed removal.
    pub fn reset(&self, subscriber: SubscriberId, destination: DestinationId) {
        self.counts.remove(&(subscriber, destination));
    }

    pub fn get(&self, subscriber: SubscriberId, destination: DestinationId) -> u32 {
        self.counts
            .get(&(subscriber, destination))
            .map_or(0, |c| *c)
    }
}

// ── Missing-destination report guard ────────────────────────────────

/// Dedup guard so one vanished destination is reported to admins once,
/// not on every cycle that trips over it.
#[derive(Debug, Default)]
pub struct MissingDestinations {
    reported: DashSet<DestinationId>,
}

impl MissingDestinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` only for the first report of this destination.
    pub fn first_report(&self, destination: DestinationId) -> bool {
        self.reported.insert(destination)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(reason: ExpiryReason) -> WarningKey {
        WarningKey {
            subscriber: SubscriberId::new(1),
            destination: DestinationId::new(-1),
            reason,
        }
    }

    #[test]
    fn warning_claim_respects_cooldown() {
        let records = WarningRecords::new();
        let k = key(ExpiryReason::Expired);

        assert!(records.try_claim(k, 1_000, 3_600));
        assert!(!records.try_claim(k, 1_001, 3_600));
        assert!(!records.try_claim(k, 4_599, 3_600));
        assert!(records.try_claim(k, 4_600, 3_600));
    }

    #[test]
    fn warning_streams_are_keyed_by_reason() {
        let records = WarningRecords::new();
        assert!(records.try_claim(key(ExpiryReason::Soon), 1_000, 3_600));
        // Same subscriber/destination, different reason: separate stream.
        assert!(records.try_claim(key(ExpiryReason::Expired), 1_000, 3_600));
    }

    #[test]
    fn counter_increments_and_resets() {
        let counters = NotPaidCounters::new();
        let sub = SubscriberId::new(1);
        let dest = DestinationId::new(-1);

        assert_eq!(counters.increment(sub, dest), 1);
        assert_eq!(counters.increment(sub, dest), 2);
        assert_eq!(counters.increment(sub, dest), 3);
        counters.reset(sub, dest);
        assert_eq!(counters.get(sub, dest), 0);
        assert_eq!(counters.increment(sub, dest), 1);
    }

    #[test]
    fn concurrent_increments_lose_nothing() {
        use std::sync::Arc;

        let counters = Arc::new(NotPaidCounters::new());
        let sub = SubscriberId::new(1);
        let dest = DestinationId::new(-1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        counters.increment(sub, dest);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counters.get(sub, dest), 800);
    }

    #[test]
    fn missing_destination_reported_once() {
        let missing = MissingDestinations::new();
        let dest = DestinationId::new(-1);
        assert!(missing.first_report(dest));
        assert!(!missing.first_report(dest));
        assert!(missing.first_report(DestinationId::new(-2)));
    }
}
