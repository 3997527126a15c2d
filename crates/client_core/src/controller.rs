//! User actions: select a week, create-or-open a week, vote.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    domain::{PresentationId, WeekId},
    error::WEEK_EXISTS,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    gateway::{GatewayError, RemoteGateway, VotingApi},
    reconcile::refresh_store,
    status::{MessageKind, MessageSurface},
    store::SharedStore,
    week_id::{iso_week_id, parse_date_input, DateInputError},
    ClientEvent,
};

pub const WEEK_EXISTS_MESSAGE: &str = "Week already exists — opening it.";
const WEEK_CREATED_MESSAGE: &str = "Week created";
const CREATE_FAILED_MESSAGE: &str = "Failed to create week";
const VOTE_RECORDED_MESSAGE: &str = "Vote recorded";
const VOTE_FAILED_MESSAGE: &str = "Vote failed";
const REFRESH_FAILED_MESSAGE: &str = "Refresh failed";

/// Which path an action took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Selected(WeekId),
    /// Week was already in the store; nothing was sent.
    OpenedExisting(WeekId),
    Created(WeekId),
    /// Server said another client created the week first.
    JoinedExisting(WeekId),
    Voted(PresentationId),
    Refreshed,
    /// No date chosen.
    Skipped,
    Failed(String),
}

pub struct InteractionController {
    gateway: Arc<dyn RemoteGateway>,
    store: SharedStore,
    messages: Arc<MessageSurface>,
    events: broadcast::Sender<ClientEvent>,
}

impl InteractionController {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        store: SharedStore,
        messages: Arc<MessageSurface>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            gateway,
            store,
            messages,
            events,
        }
    }

    pub async fn select_week(&self, week_id: WeekId) -> ActionOutcome {
        self.messages.clear().await;
        self.select(week_id.clone()).await;
        ActionOutcome::Selected(week_id)
    }

    /// Date picker entry point: empty input does nothing, bad input is
    /// reported, anything else goes to [`Self::create_week`].
    pub async fn create_week_from_input(&self, raw: &str) -> ActionOutcome {
        match parse_date_input(raw) {
            Ok(date) => self.create_week(date).await,
            Err(DateInputError::Empty) => {
                self.messages.clear().await;
                ActionOutcome::Skipped
            }
            Err(err) => {
                self.messages.clear().await;
                let text = err.to_string();
                self.messages.show(MessageKind::Error, text.clone()).await;
                ActionOutcome::Failed(text)
            }
        }
    }

    pub async fn create_week(&self, date: NaiveDate) -> ActionOutcome {
        self.messages.clear().await;
        let week_id = iso_week_id(date);

        let exists = self.store.read().await.contains(&week_id);
        if exists {
            info!(week = %week_id, "week already cached, opening");
            self.select(week_id.clone()).await;
            self.messages
                .show(MessageKind::Info, WEEK_EXISTS_MESSAGE)
                .await;
            return ActionOutcome::OpenedExisting(week_id);
        }

        match self.gateway.create_week(&week_id).await {
            Ok(created) => {
                let target = created.data.week_id.unwrap_or(week_id);
                info!(week = %target, "week created");
                self.messages
                    .show(
                        MessageKind::Success,
                        created
                            .message
                            .unwrap_or_else(|| WEEK_CREATED_MESSAGE.to_string()),
                    )
                    .await;
                if let Err(err) = self.refresh().await {
                    return self.fail(&err, CREATE_FAILED_MESSAGE).await;
                }
                self.select(target.clone()).await;
                ActionOutcome::Created(target)
            }
            Err(err) => match existing_week_from_conflict(&err) {
                Some(existing) => {
                    info!(week = %existing, "week created concurrently elsewhere, opening");
                    self.messages
                        .show(MessageKind::Info, WEEK_EXISTS_MESSAGE)
                        .await;
                    let refreshed = self.refresh().await;
                    self.select(existing.clone()).await;
                    if let Err(err) = refreshed {
                        return self.fail(&err, CREATE_FAILED_MESSAGE).await;
                    }
                    ActionOutcome::JoinedExisting(existing)
                }
                None => self.fail(&err, CREATE_FAILED_MESSAGE).await,
            },
        }
    }

    pub async fn vote(&self, presentation_id: PresentationId) -> ActionOutcome {
        self.messages.clear().await;
        match self.gateway.vote(presentation_id).await {
            Ok(ack) => {
                info!(presentation = %presentation_id, "vote recorded");
                self.messages
                    .show(
                        MessageKind::Success,
                        ack.message
                            .unwrap_or_else(|| VOTE_RECORDED_MESSAGE.to_string()),
                    )
                    .await;
                if let Err(err) = self.refresh().await {
                    return self.fail(&err, VOTE_FAILED_MESSAGE).await;
                }
                ActionOutcome::Voted(presentation_id)
            }
            Err(err) => self.fail(&err, VOTE_FAILED_MESSAGE).await,
        }
    }

    /// Full refresh keeping the current selection.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        refresh_store(self.gateway.as_ref(), &self.store, &self.events).await
    }

    /// User-requested refresh; failures land in the message region.
    pub async fn reload(&self) -> ActionOutcome {
        match self.refresh().await {
            Ok(()) => ActionOutcome::Refreshed,
            Err(err) => self.fail(&err, REFRESH_FAILED_MESSAGE).await,
        }
    }

    pub async fn dismiss_message(&self) {
        self.messages.clear().await;
    }

    async fn select(&self, week_id: WeekId) {
        self.store.write().await.select(week_id);
        let _ = self.events.send(ClientEvent::StoreChanged);
    }

    async fn fail(&self, err: &GatewayError, fallback: &str) -> ActionOutcome {
        let mut text = err.user_message();
        if text.trim().is_empty() {
            text = fallback.to_string();
        }
        warn!("action failed: {err}");
        self.messages.show(MessageKind::Error, text.clone()).await;
        ActionOutcome::Failed(text)
    }
}

fn existing_week_from_conflict(err: &GatewayError) -> Option<WeekId> {
    let failure = err.as_failure()?;
    if !failure.is_code(WEEK_EXISTS) {
        return None;
    }
    failure.existing_week().cloned()
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
