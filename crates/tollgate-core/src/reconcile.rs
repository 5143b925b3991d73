// ── Reconciliation loop ──
//
// Runs on a fixed interval after a short startup delay. Each cycle:
// lapse expired admin grants, warn admins nearing expiry, then scan
// subscriber grants for the soon-expiring and expired sets and drive
// the warning/escalation machinery for every hit. Every category is
// fenced on its own: a failure is logged and the cycle moves on, so one
// bad scan never starves the rest or kills the loop.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tollgate_transport::AdminPrompt;

use crate::ephemeral::WarningKey;
use crate::gatekeeper::Gatekeeper;
use crate::model::{DestinationId, ExpiryReason, GrantHit};
use crate::workflow::format_date;

/// Periodic reconciliation driver.
pub(crate) async fn reconcile_task(gatekeeper: Gatekeeper, cancel: CancellationToken) {
    let initial_delay = gatekeeper.config().reconcile_initial_delay;
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = tokio::time::sleep(initial_delay) => {}
    }

    let mut interval = tokio::time::interval(gatekeeper.config().reconcile_interval);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                gatekeeper.run_reconcile_cycle().await;
            }
        }
    }
    debug!("reconcile task stopped");
}

impl Gatekeeper {
    /// One full reconciliation pass. Public so tests can drive cycles
    /// without timers.
    pub async fn run_reconcile_cycle(&self) {
        let now = self.now();

        self.deactivate_lapsed_admins(now).await;
        self.warn_expiring_admins(now).await;

        let soon = self
            .inner
            .store
            .grants_expiring_within(now, self.inner.config.remind_window());
        self.process_grant_hits(soon, ExpiryReason::Soon, now).await;

        let expired = self.inner.store.grants_expired(now);
        self.process_grant_hits(expired, ExpiryReason::Expired, now)
            .await;
    }

    // ── Admin grant sweep ────────────────────────────────────────────

    /// Flip lapsed admin grants to inactive; the flip itself is the
    /// once-per-deactivation guard for the notification.
    async fn deactivate_lapsed_admins(&self, now: i64) {
        for grant in self.inner.store.admin_grants_snapshot() {
            if !grant.active || grant.is_active_at(now) {
                continue;
            }

            // Re-check and flip under the entry so two overlapping cycles
            // cannot both claim the deactivation.
            let flipped = self.inner.store.with_admin_grant(grant.admin, |g| {
                if g.active && !g.is_active_at(now) {
                    g.active = false;
                    true
                } else {
                    false
                }
            });
            match flipped {
                Ok(true) => {
                    info!(admin = %grant.admin, "admin grant lapsed");
                    let text = format!(
                        "Admin grant for {} (plan {}) has expired and was deactivated.",
                        grant.admin, grant.plan
                    );
                    self.notify_admin_logged(grant.admin.get(), &text).await;
                    for super_admin in &self.inner.config.super_admins {
                        self.notify_admin_logged(super_admin.get(), &text).await;
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(admin = %grant.admin, error = %e, "deactivation failed"),
            }
        }
    }

    /// Warn admins whose grant expires within the horizon, at most once
    /// per warn interval (tracked on the grant itself).
    async fn warn_expiring_admins(&self, now: i64) {
        let horizon = self.inner.config.admin_warn_horizon();
        let min_gap = i64::try_from(self.inner.config.admin_warn_interval.as_secs())
            .unwrap_or(i64::MAX);

        for grant in self.inner.store.admin_grants_snapshot() {
            let Some(expires_at) = grant.expires_at else {
                continue;
            };
            if !grant.is_active_at(now) || expires_at > now + horizon {
                continue;
            }

            let claimed = self.inner.store.with_admin_grant(grant.admin, |g| {
                let due = g.last_warned_at.is_none_or(|last| now - last >= min_gap);
                if due {
                    g.last_warned_at = Some(now);
                }
                due
            });
            if let Ok(true) = claimed {
                let text = format!(
                    "Your admin grant (plan {}) expires on {}. Renew to keep your destinations.",
                    grant.plan,
                    format_date(expires_at)
                );
                self.notify_admin_logged(grant.admin.get(), &text).await;
            }
        }
    }

    // ── Subscriber grant sweep ───────────────────────────────────────

    /// Fan the hits out with bounded concurrency; each hit is verified,
    /// rate-limited, and reported independently.
    async fn process_grant_hits(&self, hits: Vec<GrantHit>, reason: ExpiryReason, now: i64) {
        let limit = self.inner.config.max_outbound_in_flight;
        futures_util::stream::iter(hits)
            .for_each_concurrent(limit, |hit| async move {
                self.process_hit(hit, reason, now).await;
            })
            .await;
    }

    async fn process_hit(&self, hit: GrantHit, reason: ExpiryReason, now: i64) {
        // Confirm the subscriber is still a live, ordinary member before
        // bothering anyone.
        let membership = match self
            .inner
            .transport
            .membership(hit.destination.get(), hit.subscriber.get())
            .await
        {
            Ok(m) => m,
            Err(e) if e.is_destination_missing() => {
                self.handle_destination_missing(hit.destination).await;
                return;
            }
            Err(e) => {
                warn!(
                    subscriber = %hit.subscriber,
                    destination = %hit.destination,
                    error = %e,
                    "membership check failed"
                );
                return;
            }
        };
        if !membership.is_member || membership.role.is_privileged() {
            return;
        }

        let key = WarningKey {
            subscriber: hit.subscriber,
            destination: hit.destination,
            reason,
        };
        let cooldown = i64::try_from(self.inner.config.warning_cooldown.as_secs())
            .unwrap_or(i64::MAX);
        if !self.inner.warnings.try_claim(key, now, cooldown) {
            return;
        }

        let label = self.destination_label(hit.destination);
        let subscriber_text = match reason {
            ExpiryReason::Soon => format!(
                "Your access to {} expires on {}. Renew and send your receipt here.",
                label,
                format_date(hit.expires_at)
            ),
            ExpiryReason::Expired => format!(
                "Your access to {} expired on {}. Renew and send your receipt here.",
                label,
                format_date(hit.expires_at)
            ),
        };
        if let Err(e) = self
            .inner
            .transport
            .send_direct(hit.subscriber.get(), &subscriber_text)
            .await
        {
            warn!(subscriber = %hit.subscriber, error = %e, "subscriber warning failed");
        }

        let phrase = match reason {
            ExpiryReason::Soon => "expires soon",
            ExpiryReason::Expired => "has expired",
        };
        let admin_text = format!(
            "Subscription {phrase}: subscriber {} in {} ({}), expiry {}.",
            hit.subscriber,
            label,
            hit.destination,
            format_date(hit.expires_at)
        );
        let prompt = AdminPrompt::warning(hit.subscriber.get(), hit.destination.get());
        for admin in self.inner.tenancy.admins_for(hit.destination, now) {
            if let Err(e) = self
                .inner
                .transport
                .notify_admin(admin.get(), &admin_text, Some(prompt.clone()))
                .await
            {
                warn!(%admin, error = %e, "admin warning failed");
            }
        }
    }

    // ── Missing destinations ─────────────────────────────────────────

    /// The transport says this destination is gone: drop the record and
    /// every dependent grant, and tell the super-admins once.
    pub(crate) async fn handle_destination_missing(&self, destination: DestinationId) {
        let removed = self.inner.store.remove_destination(destination);
        if removed.is_some() {
            info!(%destination, "destination vanished; records cleaned up");
        }

        if self.inner.missing.first_report(destination) {
            let text = format!(
                "Destination {destination} no longer exists. Its records and dependent grants were removed."
            );
            for super_admin in &self.inner.config.super_admins {
                self.notify_admin_logged(super_admin.get(), &text).await;
            }
        }
    }

    async fn notify_admin_logged(&self, admin: i64, text: &str) {
        if let Err(e) = self.inner.transport.notify_admin(admin, text, None).await {
            warn!(admin, error = %e, "admin notification failed");
        }
    }
}
