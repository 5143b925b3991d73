// ── Core error types ──
//
// User-facing errors from tollgate-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<tollgate_transport::Error>` impl translates transport-layer
// errors into domain-appropriate variants. Every variant carries the
// identifiers an admin needs for manual follow-up.

use thiserror::Error;

use crate::model::{AdminId, DestinationId, PaymentId, SubscriberId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Payment workflow ─────────────────────────────────────────────
    #[error("Payment {payment} is already decided")]
    AlreadyDecided { payment: PaymentId },

    #[error("Payment not found: {payment}")]
    PaymentNotFound { payment: PaymentId },

    #[error("Payment {payment} approved with an empty destination selection")]
    EmptySelection { payment: PaymentId },

    // ── Authorization ────────────────────────────────────────────────
    #[error("Admin {admin} is not authorized for destination {destination}")]
    NotAuthorized {
        admin: AdminId,
        destination: DestinationId,
    },

    #[error("Admin {admin} quota of {quota} exceeded (requested {requested})")]
    QuotaExceeded {
        admin: AdminId,
        quota: i32,
        requested: usize,
    },

    #[error("Operation requires a super-admin, but {admin} is not one")]
    SuperAdminRequired { admin: AdminId },

    // ── Destinations & membership ────────────────────────────────────
    #[error("Destination {destination} no longer exists")]
    DestinationMissing { destination: DestinationId },

    #[error("Subscriber {subscriber} holds a privileged role in {destination} and cannot be removed")]
    PrivilegedMember {
        subscriber: SubscriberId,
        destination: DestinationId,
    },

    #[error("Credential issuance failed for destination {destination}: {reason}")]
    IssuanceFailed {
        destination: DestinationId,
        reason: String,
    },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("Subscriber not found: {subscriber}")]
    SubscriberNotFound { subscriber: SubscriberId },

    #[error("Admin grant not found: {admin}")]
    AdminNotFound { admin: AdminId },

    #[error("No active session for subject {subject}")]
    SessionNotFound { subject: i64 },

    // ── Wrapped transport errors ─────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<tollgate_transport::Error> for CoreError {
    fn from(err: tollgate_transport::Error) -> Self {
        CoreError::Transport {
            message: err.to_string(),
        }
    }
}

impl CoreError {
    /// Classify a transport failure against a specific destination:
    /// "the chat is gone" becomes [`DestinationMissing`](Self::DestinationMissing),
    /// anything else is a wrapped transport error.
    pub fn from_transport_for(
        destination: DestinationId,
        err: tollgate_transport::Error,
    ) -> Self {
        if err.is_destination_missing() {
            CoreError::DestinationMissing { destination }
        } else {
            err.into()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_chat_maps_to_destination_missing() {
        let err = tollgate_transport::Error::Api {
            code: 400,
            description: "Bad Request: chat not found".into(),
        };
        let core = CoreError::from_transport_for(DestinationId::new(-1001), err);
        assert!(matches!(
            core,
            CoreError::DestinationMissing { destination } if destination == DestinationId::new(-1001)
        ));
    }

    #[test]
    fn other_api_errors_stay_transport() {
        let err = tollgate_transport::Error::Api {
            code: 400,
            description: "Bad Request: not enough rights".into(),
        };
        let core = CoreError::from_transport_for(DestinationId::new(-1001), err);
        assert!(matches!(core, CoreError::Transport { .. }));
    }
}
