// ── Escalation responses ──
//
// The three follow-up actions an admin can take on a warning:
// mark-paid extends the grant by one full period and clears the strike
// counter; mark-not-paid adds a strike and triggers removal at the
// threshold; force-kick removes immediately. Removal is always blocked
// for owners/administrators of the destination, and that block is
// reported -- never silently swallowed, even on an explicit force-kick.

use tracing::{info, warn};

use crate::error::CoreError;
use crate::gatekeeper::Gatekeeper;
use crate::model::{AdminId, DestinationId, SubscriberId};
use crate::workflow::format_date;

/// What a mark-not-paid response led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Strike recorded; threshold not yet reached.
    Recorded { strikes: u32 },
    /// Threshold reached and the subscriber was removed.
    Removed,
}

impl Gatekeeper {
    /// Admin confirms the subscriber paid: extend by one full period
    /// from now and clear the strikes.
    pub async fn mark_paid(
        &self,
        acting: AdminId,
        subscriber: SubscriberId,
        destination: DestinationId,
    ) -> Result<i64, CoreError> {
        let now = self.now();
        self.authorize(acting, destination, now)?;

        let expires_at = now + self.inner.config.subscription_period();
        self.inner.store.extend_primary(subscriber, expires_at)?;
        self.inner
            .store
            .upsert_secondary_grant(subscriber, destination, expires_at);
        self.inner.counters.reset(subscriber, destination);

        let text = format!(
            "Payment confirmed. Your access runs until {}.",
            format_date(expires_at)
        );
        if let Err(e) = self.inner.transport.send_direct(subscriber.get(), &text).await {
            warn!(%subscriber, error = %e, "renewal confirmation failed");
        }

        Ok(expires_at)
    }

    /// Admin reports no payment: add a strike. At the configured
    /// threshold the subscriber is removed and the counter resets.
    pub async fn mark_not_paid(
        &self,
        acting: AdminId,
        subscriber: SubscriberId,
        destination: DestinationId,
    ) -> Result<EscalationOutcome, CoreError> {
        let now = self.now();
        self.authorize(acting, destination, now)?;

        let strikes = self.inner.counters.increment(subscriber, destination);
        if strikes < self.inner.config.not_paid_threshold {
            return Ok(EscalationOutcome::Recorded { strikes });
        }

        // Threshold hit: attempt removal, then reset the counter no
        // matter how the attempt went -- the strike cycle starts over.
        let removal = self.remove_subscriber(subscriber, destination).await;
        self.inner.counters.reset(subscriber, destination);
        removal.map(|()| EscalationOutcome::Removed)
    }

    /// Admin removes the subscriber immediately, bypassing the counter.
    /// A privileged target still blocks removal, and the error says so.
    pub async fn force_kick(
        &self,
        acting: AdminId,
        subscriber: SubscriberId,
        destination: DestinationId,
    ) -> Result<(), CoreError> {
        let now = self.now();
        self.authorize(acting, destination, now)?;

        self.remove_subscriber(subscriber, destination).await?;
        self.inner.counters.reset(subscriber, destination);
        Ok(())
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Revoke the grant records for (subscriber, destination), then have
    /// the transport remove the member while leaving rejoining possible.
    ///
    /// Owners and administrators of the destination are never removed.
    pub(crate) async fn remove_subscriber(
        &self,
        subscriber: SubscriberId,
        destination: DestinationId,
    ) -> Result<(), CoreError> {
        let membership = match self
            .inner
            .transport
            .membership(destination.get(), subscriber.get())
            .await
        {
            Ok(m) => m,
            Err(e) if e.is_destination_missing() => {
                self.handle_destination_missing(destination).await;
                return Err(CoreError::DestinationMissing { destination });
            }
            Err(e) => return Err(e.into()),
        };

        if membership.role.is_privileged() {
            return Err(CoreError::PrivilegedMember {
                subscriber,
                destination,
            });
        }

        // Revoke records first so a transport hiccup cannot leave a
        // kicked member still holding a live grant.
        self.inner.store.clear_primary_grant(subscriber, destination)?;
        self.inner
            .store
            .remove_secondary_grant(subscriber, destination);

        if membership.is_member {
            self.inner
                .transport
                .remove_and_allow_rejoin(destination.get(), subscriber.get())
                .await
                .map_err(|e| CoreError::from_transport_for(destination, e))?;
        }

        info!(%subscriber, %destination, "subscriber removed");

        let text = format!(
            "Your access to {} was removed because the subscription was not renewed.",
            self.destination_label(destination)
        );
        if let Err(e) = self.inner.transport.send_direct(subscriber.get(), &text).await {
            warn!(%subscriber, error = %e, "removal notice failed");
        }

        Ok(())
    }

    fn authorize(
        &self,
        acting: AdminId,
        destination: DestinationId,
        now: i64,
    ) -> Result<(), CoreError> {
        if self.inner.tenancy.authorize(acting, destination, now) {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized {
                admin: acting,
                destination,
            })
        }
    }
}
