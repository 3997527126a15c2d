use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use shared::domain::{Identity, WeekId};
use tokio::sync::broadcast;
use tracing::{error, info};

pub mod controller;
pub mod gateway;
pub mod reconcile;
pub mod session;
pub mod status;
pub mod store;
pub mod view;
pub mod week_id;

pub use controller::{ActionOutcome, InteractionController};
pub use gateway::{GatewayError, GatewayOptions, HttpGateway, RemoteGateway, RemotePayload};
pub use reconcile::{ReconcileHandle, ReconcileLoop, DEFAULT_POLL_INTERVAL};
pub use session::SessionCache;
pub use status::{MessageKind, StatusMessage};
pub use store::{SharedStore, WeekStore};
pub use view::PageView;

pub const APP_LOAD_FAILED_MESSAGE: &str = "App failed to load. Check console/logs.";

#[derive(Debug, Clone)]
pub enum ClientEvent {
    IdentityLoaded(Identity),
    /// Weeks or selection changed; re-render.
    StoreChanged,
    Message(StatusMessage),
    MessageCleared,
}

/// Owns the store, identity cache and message region, and wires them to
/// the controller and the reconciliation loop.
pub struct VotingClient {
    gateway: Arc<dyn RemoteGateway>,
    store: SharedStore,
    session: Arc<SessionCache>,
    messages: Arc<status::MessageSurface>,
    controller: InteractionController,
    events: broadcast::Sender<ClientEvent>,
    poll_interval: Duration,
}

impl VotingClient {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Arc<Self> {
        Self::new_with_poll_interval(gateway, DEFAULT_POLL_INTERVAL)
    }

    pub fn new_with_poll_interval(
        gateway: Arc<dyn RemoteGateway>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let store = WeekStore::shared();
        let messages = Arc::new(status::MessageSurface::new(events.clone()));
        let controller = InteractionController::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&messages),
            events.clone(),
        );
        Arc::new(Self {
            gateway,
            store,
            session: SessionCache::new(),
            messages,
            controller,
            events,
            poll_interval,
        })
    }

    /// Identity, then weeks, then a default selection: `preferred` if given,
    /// otherwise the first week the server listed.
    ///
    /// Any failure here is fatal for the session and is shown as the generic
    /// load-failure message.
    pub async fn initial_load(&self, preferred: Option<WeekId>) -> Result<()> {
        match self.load(preferred).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("initial load failed: {err:#}");
                self.messages
                    .show(MessageKind::Error, APP_LOAD_FAILED_MESSAGE)
                    .await;
                Err(err)
            }
        }
    }

    async fn load(&self, preferred: Option<WeekId>) -> Result<()> {
        let identity = self
            .session
            .load(self.gateway.as_ref())
            .await
            .context("failed to load identity")?;
        info!(user = ?identity.display_label(), "identity loaded");
        let _ = self.events.send(ClientEvent::IdentityLoaded(identity));

        self.controller
            .refresh()
            .await
            .context("failed to load weeks")?;

        let default = {
            let guard = self.store.read().await;
            preferred.or_else(|| guard.weeks().first().map(|week| week.week_id.clone()))
        };
        if let Some(week_id) = default {
            self.store.write().await.select(week_id);
            let _ = self.events.send(ClientEvent::StoreChanged);
        }
        Ok(())
    }

    /// Initial load, then the reconciliation loop. The loop never starts if
    /// the load fails.
    pub async fn start(&self, preferred: Option<WeekId>) -> Result<ReconcileHandle> {
        self.initial_load(preferred).await?;
        info!(interval = ?self.poll_interval, "starting reconcile loop");
        Ok(self.reconcile_loop().spawn())
    }

    pub fn reconcile_loop(&self) -> ReconcileLoop {
        ReconcileLoop::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.store),
            Arc::clone(&self.messages),
            self.events.clone(),
            self.poll_interval,
        )
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn session(&self) -> Arc<SessionCache> {
        Arc::clone(&self.session)
    }

    pub async fn current_message(&self) -> Option<StatusMessage> {
        self.messages.current().await
    }

    pub async fn page(&self, date_input: &str) -> PageView {
        let identity = self.session.display_label().await;
        let message = self.messages.current().await;
        let store = self.store.read().await;
        PageView::build(&store, identity, message, date_input)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
