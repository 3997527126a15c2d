//! The dismissible status message region.

use std::fmt;

use tokio::sync::{broadcast, Mutex};

use crate::ClientEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl StatusMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub struct MessageSurface {
    current: Mutex<Option<StatusMessage>>,
    events: broadcast::Sender<ClientEvent>,
}

impl MessageSurface {
    pub fn new(events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            current: Mutex::new(None),
            events,
        }
    }

    pub async fn show(&self, kind: MessageKind, text: impl Into<String>) {
        let message = StatusMessage::new(kind, text);
        *self.current.lock().await = Some(message.clone());
        let _ = self.events.send(ClientEvent::Message(message));
    }

    pub async fn clear(&self) {
        let previous = self.current.lock().await.take();
        if previous.is_some() {
            let _ = self.events.send(ClientEvent::MessageCleared);
        }
    }

    pub async fn current(&self) -> Option<StatusMessage> {
        self.current.lock().await.clone()
    }
}
