use std::sync::Arc;

use shared::domain::Identity;
use tokio::sync::RwLock;

use crate::gateway::{GatewayError, RemoteGateway, VotingApi};

/// Holds the identity reported by `/me`. Only [`SessionCache::load`] writes it.
#[derive(Default)]
pub struct SessionCache {
    identity: RwLock<Option<Identity>>,
}

impl SessionCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn load(&self, gateway: &dyn RemoteGateway) -> Result<Identity, GatewayError> {
        let identity = gateway.me().await?;
        *self.identity.write().await = Some(identity.clone());
        Ok(identity)
    }

    pub async fn display_label(&self) -> Option<String> {
        self.identity
            .read()
            .await
            .as_ref()
            .and_then(Identity::display_label)
    }
}
