use async_trait::async_trait;
use sqlx::Row;

use budtender_core::domain::conversation::{Conversation, ConversationId, ConversationTurn};
use budtender_core::domain::profile::UserId;
use budtender_core::errors::UpstreamError;
use budtender_core::session::ConversationStore;

use super::{decode, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const SERVICE: &str = "conversation_store";

pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        user_id: &UserId,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, channel, turns_json, started_at, updated_at
             FROM conversation WHERE user_id = ? AND id = ?",
        )
        .bind(&user_id.0)
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    pub async fn upsert(
        &self,
        user_id: &UserId,
        conversation: &Conversation,
    ) -> Result<(), RepositoryError> {
        let turns = serde_json::to_string(&conversation.turns).map_err(decode)?;

        sqlx::query(
            "INSERT INTO conversation (user_id, id, channel, turns_json, started_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, id) DO UPDATE SET
                 channel = excluded.channel,
                 turns_json = excluded.turns_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&user_id.0)
        .bind(&conversation.id.0)
        .bind(&conversation.channel)
        .bind(turns)
        .bind(timestamp(&conversation.started_at))
        .bind(timestamp(&conversation.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqlConversationStore {
    async fn load(
        &self,
        user_id: &UserId,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, UpstreamError> {
        self.find(user_id, id).await.map_err(|error| error.into_upstream(SERVICE))
    }

    async fn save(&self, user_id: &UserId, conversation: &Conversation) -> Result<(), UpstreamError> {
        self.upsert(user_id, conversation).await.map_err(|error| error.into_upstream(SERVICE))
    }
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let channel: Option<String> = row.try_get("channel").map_err(decode)?;
    let turns_json: String = row.try_get("turns_json").map_err(decode)?;
    let started_at: String = row.try_get("started_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    let turns: Vec<ConversationTurn> = serde_json::from_str(&turns_json).map_err(decode)?;

    Ok(Conversation {
        id: ConversationId(id),
        channel,
        turns,
        started_at: parse_timestamp("started_at", &started_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use budtender_core::domain::conversation::{Conversation, ConversationId, ConversationTurn};
    use budtender_core::domain::profile::UserId;
    use budtender_core::session::ConversationStore;

    use super::SqlConversationStore;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn conversation_round_trips_and_upserts() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let store = SqlConversationStore::new(pool);
        let owner = UserId("u-1".to_string());

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid date");
        let mut conversation = Conversation::new(ConversationId("c-1".to_string()), start);
        conversation.turns.push(ConversationTurn::user("I want Gelato", start));
        store.save(&owner, &conversation).await.expect("save");

        conversation.channel = Some("telegram".to_string());
        conversation.turns.push(
            ConversationTurn::assistant("Sure, **Gelato**", start + Duration::seconds(2))
                .with_products(vec!["Gelato".to_string()]),
        );
        conversation.updated_at = start + Duration::seconds(2);
        store.save(&owner, &conversation).await.expect("update");

        let loaded = store.load(&owner, &conversation.id).await.expect("load").expect("present");
        assert_eq!(loaded, conversation);
    }

    #[tokio::test]
    async fn same_conversation_id_under_another_user_is_separate() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let store = SqlConversationStore::new(pool);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid date");
        let id = ConversationId("shared".to_string());

        let mut first = Conversation::new(id.clone(), start);
        first.turns.push(ConversationTurn::user("I want Gelato", start));
        store.save(&UserId("u-1".to_string()), &first).await.expect("save first");
        let second = Conversation::new(id.clone(), start);
        store.save(&UserId("u-2".to_string()), &second).await.expect("save second");

        let loaded = store.load(&UserId("u-1".to_string()), &id).await.expect("load").expect("present");
        assert_eq!(loaded, first);
        assert!(store.load(&UserId("u-3".to_string()), &id).await.expect("load").is_none());
    }
}
