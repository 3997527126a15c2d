//! Periodic refresh of the store from the server.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    gateway::{GatewayError, RemoteGateway, VotingApi},
    status::{MessageKind, MessageSurface},
    store::SharedStore,
    ClientEvent,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Fetches every week and swaps it into the store, then re-selects whatever
/// is selected at swap time so the presentation list matches fresh data.
///
/// No store lock is held while the request is in flight.
pub async fn refresh_store(
    gateway: &dyn RemoteGateway,
    store: &SharedStore,
    events: &broadcast::Sender<ClientEvent>,
) -> Result<(), GatewayError> {
    let weeks = gateway.list_weeks().await?.data;
    let count = weeks.len();
    {
        let mut guard = store.write().await;
        guard.replace_all(weeks);
        guard.reselect();
    }
    debug!(weeks = count, "store refreshed");
    let _ = events.send(ClientEvent::StoreChanged);
    Ok(())
}

pub struct ReconcileLoop {
    gateway: Arc<dyn RemoteGateway>,
    store: SharedStore,
    messages: Arc<MessageSurface>,
    events: broadcast::Sender<ClientEvent>,
    period: Duration,
}

impl ReconcileLoop {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        store: SharedStore,
        messages: Arc<MessageSurface>,
        events: broadcast::Sender<ClientEvent>,
        period: Duration,
    ) -> Self {
        Self {
            gateway,
            store,
            messages,
            events,
            period,
        }
    }

    /// One reconciliation tick. Failures go to the message region and are
    /// also returned.
    pub async fn tick(&self) -> Result<(), GatewayError> {
        let result = refresh_store(self.gateway.as_ref(), &self.store, &self.events).await;
        if let Err(err) = &result {
            warn!("reconcile tick failed: {err}");
            self.messages
                .show(MessageKind::Error, err.user_message())
                .await;
        }
        result
    }

    /// Runs ticks forever, one `period` apart, first one a full period from
    /// now. A tick that outlasts the period delays the next one.
    pub fn spawn(self) -> ReconcileHandle {
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let _ = self.tick().await;
            }
        });
        ReconcileHandle { task }
    }
}

#[derive(Debug)]
pub struct ReconcileHandle {
    task: JoinHandle<()>,
}

impl ReconcileHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
