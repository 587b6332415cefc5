use std::collections::HashMap;

use tokio::sync::RwLock;

use budtender_core::catalog::CatalogStore;
use budtender_core::domain::catalog::CatalogItem;
use budtender_core::domain::conversation::{Conversation, ConversationId};
use budtender_core::domain::profile::{UserId, UserProfile};
use budtender_core::errors::UpstreamError;
use budtender_core::session::{ConversationStore, ProfileStore};

#[derive(Default)]
pub struct InMemoryCatalogStore {
    items: RwLock<Vec<CatalogItem>>,
}

impl InMemoryCatalogStore {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items: RwLock::new(items) }
    }

    pub async fn replace(&self, items: Vec<CatalogItem>) {
        *self.items.write().await = items;
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn fetch_all(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        Ok(self.items.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, user_id: &UserId) -> Result<Option<UserProfile>, UpstreamError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&user_id.0).cloned())
    }

    async fn save(&self, profile: &UserProfile) -> Result<bool, UpstreamError> {
        let mut profiles = self.profiles.write().await;
        if profiles.get(&profile.user_id.0).is_some_and(|stored| stored.updated_at > profile.updated_at)
        {
            return Ok(false);
        }
        profiles.insert(profile.user_id.0.clone(), profile.clone());
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<(String, String), Conversation>>,
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(
        &self,
        user_id: &UserId,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, UpstreamError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&(user_id.0.clone(), id.0.clone())).cloned())
    }

    async fn save(&self, user_id: &UserId, conversation: &Conversation) -> Result<(), UpstreamError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert((user_id.0.clone(), conversation.id.0.clone()), conversation.clone());
        Ok(())
    }
}
