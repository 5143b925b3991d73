// ── Payment workflow ──
//
// submit -> pending receipt; approve -> grants + credentials; reject.
// Preconditions (payment pending, selection non-empty, every destination
// authorized) abort before any write. The pending->decided transition is
// a conditional store update, so racing decisions resolve to exactly one
// winner; the loser sees `AlreadyDecided` and produces no grants.
//
// Credential issuance runs after the grants are committed: a failure for
// one destination never rolls back the others or the approval itself.
// Each failure is reported to the acting admin per destination.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::warn;

use tollgate_transport::Credential;

use crate::error::CoreError;
use crate::gatekeeper::Gatekeeper;
use crate::model::{AdminId, DestinationId, Payment, PaymentId, PaymentStatus, SubscriberId};
use crate::session::SessionState;

/// Per-destination result of an approval.
#[derive(Debug)]
pub struct IssueOutcome {
    pub destination: DestinationId,
    pub credential: Result<Credential, CoreError>,
}

/// What an approval produced: the shared expiry plus one outcome per
/// selected destination.
#[derive(Debug)]
pub struct GrantResult {
    pub payment: PaymentId,
    pub subscriber: SubscriberId,
    pub expires_at: i64,
    pub outcomes: Vec<IssueOutcome>,
}

impl GrantResult {
    pub fn issued_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.credential.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.issued_count()
    }
}

impl Gatekeeper {
    // ── Submit ───────────────────────────────────────────────────────

    /// Record a submitted receipt as a pending payment and notify the
    /// admins. No side effects beyond persistence and the notification.
    pub async fn submit(
        &self,
        subscriber: SubscriberId,
        receipt: &str,
    ) -> Result<PaymentId, CoreError> {
        let record = self
            .inner
            .store
            .subscriber(subscriber)
            .ok_or(CoreError::SubscriberNotFound { subscriber })?;

        let payment = self.inner.store.insert_payment(subscriber, receipt, self.now());

        let text = format!(
            "New payment receipt #{} from {} (id {}), file {}",
            payment.id,
            record.display_tag(),
            subscriber,
            receipt
        );
        for admin in self.notifiable_admins() {
            if let Err(e) = self.inner.transport.notify_admin(admin.get(), &text, None).await {
                warn!(%admin, payment = %payment.id, error = %e, "payment notification failed");
            }
        }

        Ok(payment.id)
    }

    // ── Approve ──────────────────────────────────────────────────────

    /// Approve a pending payment into grants for every selected
    /// destination, then mint one credential per destination.
    ///
    /// The primary grant goes to the lowest destination id of the
    /// selection; the rest become secondary grants with the same expiry.
    /// `start` defaults to now; expiry is `start + subscription period`.
    pub async fn approve(
        &self,
        payment: PaymentId,
        acting: AdminId,
        destinations: &BTreeSet<DestinationId>,
        start: Option<DateTime<Utc>>,
    ) -> Result<GrantResult, CoreError> {
        let now = self.now();

        // Preconditions -- all checked before any write.
        let record = self
            .inner
            .store
            .payment(payment)
            .ok_or(CoreError::PaymentNotFound { payment })?;
        if record.is_decided() {
            return Err(CoreError::AlreadyDecided { payment });
        }
        if destinations.is_empty() {
            return Err(CoreError::EmptySelection { payment });
        }
        for &destination in destinations {
            if !self.inner.tenancy.authorize(acting, destination, now) {
                return Err(CoreError::NotAuthorized {
                    admin: acting,
                    destination,
                });
            }
        }

        // Claim the decision. A racing approve/reject loses here, before
        // any grant is written.
        let decided = self
            .inner
            .store
            .decide_payment(payment, PaymentStatus::Approved, acting)?;
        let subscriber = decided.subscriber;

        let start_ts = start.map_or(now, |dt| dt.timestamp());
        let expires_at = start_ts + self.inner.config.subscription_period();

        // First of the ordered set is the primary destination.
        let mut iter = destinations.iter().copied();
        let Some(primary) = iter.next() else {
            return Err(CoreError::EmptySelection { payment });
        };
        self.inner
            .store
            .set_primary_grant(subscriber, primary, expires_at)?;
        for destination in iter {
            self.inner
                .store
                .upsert_secondary_grant(subscriber, destination, expires_at);
        }
        // A fresh payment wipes any accumulated strikes.
        for &destination in destinations {
            self.inner.counters.reset(subscriber, destination);
        }

        // Mint credentials. Failures are isolated per destination.
        let mut outcomes = Vec::with_capacity(destinations.len());
        for &destination in destinations {
            let credential = self.inner.issuer.issue(destination, subscriber).await;
            if let Err(CoreError::DestinationMissing { .. }) = credential {
                self.handle_destination_missing(destination).await;
            }
            outcomes.push(IssueOutcome {
                destination,
                credential,
            });
        }

        self.report_approval(&decided, acting, expires_at, &outcomes).await;

        Ok(GrantResult {
            payment,
            subscriber,
            expires_at,
            outcomes,
        })
    }

    /// Tell the subscriber about their new credentials and the acting
    /// admin about every per-destination failure.
    async fn report_approval(
        &self,
        payment: &Payment,
        acting: AdminId,
        expires_at: i64,
        outcomes: &[IssueOutcome],
    ) {
        let links: Vec<String> = outcomes
            .iter()
            .filter_map(|o| {
                o.credential.as_ref().ok().map(|c| {
                    format!("- {}: {}", self.destination_label(o.destination), c.url)
                })
            })
            .collect();

        if !links.is_empty() {
            let text = format!(
                "Payment approved. Your invite links (each single-use):\n{}\nAccess until {}",
                links.join("\n"),
                format_date(expires_at)
            );
            if let Err(e) = self
                .inner
                .transport
                .send_direct(payment.subscriber.get(), &text)
                .await
            {
                warn!(subscriber = %payment.subscriber, error = %e, "approval message failed");
            }
        }

        for outcome in outcomes {
            if let Err(issue_err) = &outcome.credential {
                let text = format!(
                    "Payment #{}: credential for {} failed: {issue_err}",
                    payment.id,
                    self.destination_label(outcome.destination)
                );
                if let Err(e) = self.inner.transport.notify_admin(acting.get(), &text, None).await
                {
                    warn!(admin = %acting, error = %e, "issuance failure report failed");
                }
            }
        }
    }

    // ── Reject ───────────────────────────────────────────────────────

    /// Reject a pending payment. No grant side effects.
    pub async fn reject(&self, payment: PaymentId, acting: AdminId) -> Result<Payment, CoreError> {
        self.inner
            .store
            .payment(payment)
            .ok_or(CoreError::PaymentNotFound { payment })?;
        self.inner
            .store
            .decide_payment(payment, PaymentStatus::Rejected, acting)
    }

    // ── Session-driven approval steps ────────────────────────────────

    /// Admin chose "approve with a start date": park the payment and
    /// wait for the date.
    pub fn begin_date_selection(
        &self,
        acting: AdminId,
        payment: PaymentId,
    ) -> Result<(), CoreError> {
        self.check_pending(payment)?;
        self.inner
            .sessions
            .begin(acting.get(), SessionState::AwaitingStartDate { payment });
        Ok(())
    }

    /// The parked date arrived; move on to destination selection.
    pub fn provide_start_date(
        &self,
        acting: AdminId,
        start: DateTime<Utc>,
    ) -> Result<PaymentId, CoreError> {
        match self.inner.sessions.get(acting.get()) {
            Some(SessionState::AwaitingStartDate { payment }) => {
                self.inner.sessions.begin(
                    acting.get(),
                    SessionState::SelectingDestinations {
                        payment,
                        selected: BTreeSet::new(),
                        start: Some(start),
                    },
                );
                Ok(payment)
            }
            _ => Err(CoreError::SessionNotFound {
                subject: acting.get(),
            }),
        }
    }

    /// Open a destination multi-select for a pending payment.
    pub fn begin_destination_selection(
        &self,
        acting: AdminId,
        payment: PaymentId,
    ) -> Result<(), CoreError> {
        self.check_pending(payment)?;
        self.inner.sessions.begin(
            acting.get(),
            SessionState::SelectingDestinations {
                payment,
                selected: BTreeSet::new(),
                start: None,
            },
        );
        Ok(())
    }

    /// Tick or untick one destination in the open selection.
    pub fn toggle_destination(
        &self,
        acting: AdminId,
        payment: PaymentId,
        destination: DestinationId,
    ) -> Result<BTreeSet<DestinationId>, CoreError> {
        self.inner
            .sessions
            .toggle_destination(acting.get(), payment, destination)
    }

    /// Confirm the selection and run the approval.
    ///
    /// An empty selection is refused and the session stays open so the
    /// admin can keep ticking.
    pub async fn confirm_selection(&self, acting: AdminId) -> Result<GrantResult, CoreError> {
        let (payment, selected, start) = match self.inner.sessions.get(acting.get()) {
            Some(SessionState::SelectingDestinations {
                payment,
                selected,
                start,
            }) => (payment, selected, start),
            _ => {
                return Err(CoreError::SessionNotFound {
                    subject: acting.get(),
                });
            }
        };
        if selected.is_empty() {
            return Err(CoreError::EmptySelection { payment });
        }
        self.inner.sessions.take(acting.get());
        self.approve(payment, acting, &selected, start).await
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn check_pending(&self, payment: PaymentId) -> Result<(), CoreError> {
        let record = self
            .inner
            .store
            .payment(payment)
            .ok_or(CoreError::PaymentNotFound { payment })?;
        if record.is_decided() {
            return Err(CoreError::AlreadyDecided { payment });
        }
        Ok(())
    }

    /// Admins who should hear about new submissions: the super allow-list
    /// plus every currently-live scoped admin.
    fn notifiable_admins(&self) -> Vec<AdminId> {
        let now = self.now();
        let mut admins: Vec<AdminId> = self.inner.config.super_admins.clone();
        for grant in self.inner.store.admin_grants_snapshot() {
            if grant.is_active_at(now) {
                admins.push(grant.admin);
            }
        }
        admins.sort_unstable();
        admins.dedup();
        admins
    }
}

/// Render a Unix timestamp as a calendar date for user-facing text.
pub(crate) fn format_date(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}
