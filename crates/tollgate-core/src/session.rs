// ── Wizard session state ──
//
// One tagged state record per subject (subscriber or admin), held in a
// single owning store. Handlers never share ambient dictionaries: every
// step reads, matches, and replaces the record through per-key entry
// operations, so interleaved updates for one subject serialize.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::CoreError;
use crate::model::{DestinationId, PaymentId};

/// Where a subject currently is in a multi-step flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Registration: waiting for a phone number.
    AwaitingPhone,
    /// Registration: waiting for the subscriber's full name.
    AwaitingFullName,
    /// Approval: admin chose "approve with a start date" and owes us
    /// the date.
    AwaitingStartDate { payment: PaymentId },
    /// Approval: admin is ticking destinations for this payment.
    SelectingDestinations {
        payment: PaymentId,
        selected: BTreeSet<DestinationId>,
        start: Option<DateTime<Utc>>,
    },
}

/// The single owning store for all wizard sessions, keyed by the
/// subject's raw platform id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<i64, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a flow for a subject, replacing any session
    /// already in progress.
    pub fn begin(&self, subject: i64, state: SessionState) {
        self.sessions.insert(subject, state);
    }

    /// Current state, if any.
    pub fn get(&self, subject: i64) -> Option<SessionState> {
        self.sessions.get(&subject).map(|r| r.value().clone())
    }

    /// Remove and return the subject's session.
    pub fn take(&self, subject: i64) -> Option<SessionState> {
        self.sessions.remove(&subject).map(|(_, s)| s)
    }

    /// Toggle one destination in an in-progress selection.
    ///
    /// Fails if the subject has no selection session for this payment --
    /// stale buttons from an earlier flow must not mutate a newer one.
    pub fn toggle_destination(
        &self,
        subject: i64,
        payment: PaymentId,
        destination: DestinationId,
    ) -> Result<BTreeSet<DestinationId>, CoreError> {
        match self.sessions.get_mut(&subject) {
            Some(mut entry) => match entry.value_mut() {
                SessionState::SelectingDestinations {
                    payment: active,
                    selected,
                    ..
                } if *active == payment => {
                    if !selected.remove(&destination) {
                        selected.insert(destination);
                    }
                    Ok(selected.clone())
                }
                _ => Err(CoreError::SessionNotFound { subject }),
            },
            None => Err(CoreError::SessionNotFound { subject }),
        }
    }
}
