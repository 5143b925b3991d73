// ── Access issuer ──
//
// Mints single-use, time-limited entry credentials through the
// transport. The only state it needs is the configured validity window;
// addressing comes from the caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use tollgate_transport::{Credential, Transport};

use crate::error::CoreError;
use crate::model::{DestinationId, SubscriberId};

/// Mints entry credentials for approved subscribers.
#[derive(Clone)]
pub struct AccessIssuer {
    transport: Arc<dyn Transport>,
    ttl: Duration,
}

impl AccessIssuer {
    pub fn new(transport: Arc<dyn Transport>, ttl: Duration) -> Self {
        Self { transport, ttl }
    }

    /// Mint a credential admitting `subscriber` into `destination` once.
    ///
    /// The credential is labelled with the subscriber id so the
    /// platform's invite audit trail stays attributable. A missing
    /// destination is distinguished from every other failure; the rest
    /// surface as [`IssuanceFailed`](CoreError::IssuanceFailed) carrying
    /// the destination id for the approving admin.
    pub async fn issue(
        &self,
        destination: DestinationId,
        subscriber: SubscriberId,
    ) -> Result<Credential, CoreError> {
        let label = format!("sub-{subscriber}");
        match self
            .transport
            .create_single_use_invite(destination.get(), &label, self.ttl)
            .await
        {
            Ok(credential) => {
                debug!(%destination, %subscriber, "minted entry credential");
                Ok(credential)
            }
            Err(err) if err.is_destination_missing() => {
                Err(CoreError::DestinationMissing { destination })
            }
            Err(err) => Err(CoreError::IssuanceFailed {
                destination,
                reason: err.to_string(),
            }),
        }
    }
}
