// ── Gatekeeper service ──
//
// The main entry point for consumers. Owns the store, the transport
// handle, the tenancy guard, and all ephemeral state; exposes the
// payment workflow, escalation responses, and admin lifecycle; runs the
// reconciliation loop as a background task.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tollgate_transport::{ChatKind, Transport};

use crate::config::ServiceConfig;
use crate::ephemeral::{MissingDestinations, NotPaidCounters, WarningRecords};
use crate::error::CoreError;
use crate::issuer::AccessIssuer;
use crate::model::{Destination, DestinationId, DestinationKind, Subscriber, SubscriberId};
use crate::reconcile;
use crate::session::{SessionState, SessionStore};
use crate::store::GrantStore;
use crate::tenancy::TenancyGuard;

/// The service façade.
///
/// Cheaply cloneable via `Arc`; the reconciliation task runs on a clone.
#[derive(Clone)]
pub struct Gatekeeper {
    pub(crate) inner: Arc<GatekeeperInner>,
}

pub(crate) struct GatekeeperInner {
    pub(crate) config: ServiceConfig,
    pub(crate) store: Arc<GrantStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) tenancy: TenancyGuard,
    pub(crate) issuer: AccessIssuer,
    pub(crate) warnings: WarningRecords,
    pub(crate) counters: NotPaidCounters,
    pub(crate) missing: MissingDestinations,
    pub(crate) sessions: SessionStore,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Gatekeeper {
    /// Build a service around a transport. Does NOT start the
    /// reconciliation loop -- call [`start()`](Self::start).
    pub fn new(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        let store = Arc::new(GrantStore::new());
        let tenancy = TenancyGuard::new(Arc::clone(&store), &config.super_admins);
        let issuer = AccessIssuer::new(Arc::clone(&transport), config.invite_ttl);

        Self {
            inner: Arc::new(GatekeeperInner {
                config,
                store,
                transport,
                tenancy,
                issuer,
                warnings: WarningRecords::new(),
                counters: NotPaidCounters::new(),
                missing: MissingDestinations::new(),
                sessions: SessionStore::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<GrantStore> {
        &self.inner.store
    }

    pub fn tenancy(&self) -> &TenancyGuard {
        &self.inner.tenancy
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub(crate) fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the reconciliation loop.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        let gatekeeper = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(reconcile::reconcile_task(gatekeeper, cancel)));
        info!("gatekeeper started");
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("gatekeeper shut down");
    }

    // ── Destinations ─────────────────────────────────────────────────

    /// Register a destination, resolving its title through the transport
    /// with a graceful fallback to the raw id.
    pub async fn register_destination(&self, id: DestinationId) -> Destination {
        let (title, kind) = match self.inner.transport.chat_info(id.get()).await {
            Ok(info) => {
                let kind = match info.kind {
                    ChatKind::Channel => DestinationKind::Channel,
                    _ => DestinationKind::Group,
                };
                (info.title.unwrap_or_else(|| id.to_string()), kind)
            }
            Err(e) => {
                warn!(destination = %id, error = %e, "could not resolve destination title");
                (id.to_string(), DestinationKind::Group)
            }
        };
        let destination = Destination::new(id, title, kind, self.now());
        self.inner.store.add_destination(destination.clone());
        destination
    }

    /// Admin-facing label for a destination: its title, or the raw id if
    /// the record is gone.
    pub(crate) fn destination_label(&self, id: DestinationId) -> String {
        self.inner
            .store
            .destination(id)
            .map_or_else(|| id.to_string(), |d| d.title)
    }

    // ── Registration wizard ──────────────────────────────────────────

    /// Record first contact. Safe to call on every inbound interaction.
    pub fn first_contact(
        &self,
        id: SubscriberId,
        username: Option<&str>,
        full_name: &str,
    ) -> Subscriber {
        self.inner
            .store
            .ensure_subscriber(id, username, full_name, self.now())
    }

    /// Subscriber accepted the terms: stamp the record and ask for a
    /// phone number next.
    pub fn accept_terms(&self, id: SubscriberId) -> Result<(), CoreError> {
        self.inner.store.set_agreed(id, self.now())?;
        self.inner
            .sessions
            .begin(id.get(), SessionState::AwaitingPhone);
        Ok(())
    }

    /// Phone step of the wizard.
    pub fn provide_phone(&self, id: SubscriberId, phone: &str) -> Result<(), CoreError> {
        match self.inner.sessions.get(id.get()) {
            Some(SessionState::AwaitingPhone) => {
                self.inner.store.update_phone(id, phone)?;
                self.inner
                    .sessions
                    .begin(id.get(), SessionState::AwaitingFullName);
                Ok(())
            }
            _ => Err(CoreError::SessionNotFound { subject: id.get() }),
        }
    }

    /// Full-name step of the wizard; completes registration.
    pub fn provide_full_name(&self, id: SubscriberId, full_name: &str) -> Result<(), CoreError> {
        match self.inner.sessions.get(id.get()) {
            Some(SessionState::AwaitingFullName) => {
                self.inner.store.update_full_name(id, full_name)?;
                self.inner.sessions.take(id.get());
                Ok(())
            }
            _ => Err(CoreError::SessionNotFound { subject: id.get() }),
        }
    }

    /// Record the course label a subscriber picked.
    pub fn choose_course(&self, id: SubscriberId, course: &str) -> Result<(), CoreError> {
        self.inner.store.update_course(id, course)
    }
}
