use crate::domain::token::OAuthToken;
use crate::error::Result;
use crate::storage::TokenStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory token store for tests and embedding apps without Postgres.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<Uuid, OAuthToken>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<OAuthToken>> {
        Ok(self.tokens.read().await.get(&user_id).cloned())
    }

    async fn save(&self, user_id: Uuid, token: &OAuthToken) -> Result<()> {
        self.tokens.write().await.insert(user_id, token.clone());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        self.tokens.write().await.remove(&user_id);
        Ok(())
    }
}
