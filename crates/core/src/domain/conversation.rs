use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of trailing turns any decision computation looks at.
pub const DECISION_WINDOW: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { role, content: content.into(), timestamp, products: Vec::new() }
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, content, timestamp)
    }

    pub fn with_products(mut self, products: Vec<String>) -> Self {
        self.products = products;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub channel: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, started_at: DateTime<Utc>) -> Self {
        Self { id, channel: None, turns: Vec::new(), started_at, updated_at: started_at }
    }

    pub fn message_count(&self) -> u64 {
        self.turns.iter().filter(|turn| turn.role != Role::System).count() as u64
    }
}

/// The trailing `count` turns, or all of them when fewer exist.
pub fn tail(turns: &[ConversationTurn], count: usize) -> &[ConversationTurn] {
    &turns[turns.len().saturating_sub(count)..]
}

/// The trailing `count` user turns, oldest first.
pub fn user_tail(turns: &[ConversationTurn], count: usize) -> Vec<&ConversationTurn> {
    let mut selected =
        turns.iter().rev().filter(|turn| turn.is_user()).take(count).collect::<Vec<_>>();
    selected.reverse();
    selected
}
