use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Conversation, ConversationId};

pub const RECENT_CONVERSATIONS_CAP: usize = 10;
pub const EFFECTS_CAP: usize = 5;
pub const FAVORITE_PRODUCTS_CAP: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Experienced,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub favorite_products: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Most-recently-touched-first list of conversations with a fixed capacity.
///
/// Touching a conversation that is already present replaces it and moves it
/// to the front; the oldest entry at the back is evicted beyond capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Conversation>", into = "Vec<Conversation>")]
pub struct RecentConversations {
    entries: VecDeque<Conversation>,
    capacity: usize,
}

impl Default for RecentConversations {
    fn default() -> Self {
        Self::with_capacity(RECENT_CONVERSATIONS_CAP)
    }
}

impl From<Vec<Conversation>> for RecentConversations {
    fn from(conversations: Vec<Conversation>) -> Self {
        let mut entries = VecDeque::from(conversations);
        entries.truncate(RECENT_CONVERSATIONS_CAP);
        Self { entries, capacity: RECENT_CONVERSATIONS_CAP }
    }
}

impl From<RecentConversations> for Vec<Conversation> {
    fn from(recent: RecentConversations) -> Self {
        recent.entries.into()
    }
}

impl RecentConversations {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    /// Returns the replaced entry when the conversation was already present.
    pub fn touch(&mut self, conversation: Conversation) -> Option<Conversation> {
        let previous = self
            .entries
            .iter()
            .position(|existing| existing.id == conversation.id)
            .and_then(|index| self.entries.remove(index));

        self.entries.push_front(conversation);
        self.entries.truncate(self.capacity);
        previous
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.entries.iter().find(|conversation| &conversation.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.entries.iter()
    }

    pub fn front(&self) -> Option<&Conversation> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub conversation_count: u64,
    pub message_count: u64,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub recent_conversations: RecentConversations,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            first_seen: now,
            last_seen: now,
            conversation_count: 0,
            message_count: 0,
            preferences: Preferences::default(),
            recent_conversations: RecentConversations::default(),
            updated_at: now,
        }
    }

    /// The only path that clears derived preferences.
    pub fn reset_preferences(&mut self, now: DateTime<Utc>) {
        self.preferences = Preferences::default();
        self.updated_at = now;
    }
}
