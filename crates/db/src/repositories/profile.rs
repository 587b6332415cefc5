use async_trait::async_trait;
use sqlx::Row;

use budtender_core::domain::profile::{Preferences, RecentConversations, UserId, UserProfile};
use budtender_core::errors::UpstreamError;
use budtender_core::session::ProfileStore;

use super::{decode, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const SERVICE: &str = "profile_store";

pub struct SqlProfileStore {
    pool: DbPool,
}

impl SqlProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, first_seen, last_seen, conversation_count, message_count,
                    preferences_json, recent_conversations_json, updated_at
             FROM user_profile WHERE user_id = ?",
        )
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    /// Conditional upsert; a stored row with a later `updated_at` wins.
    pub async fn upsert(&self, profile: &UserProfile) -> Result<bool, RepositoryError> {
        let preferences = serde_json::to_string(&profile.preferences).map_err(decode)?;
        let recent = serde_json::to_string(&profile.recent_conversations).map_err(decode)?;

        let result = sqlx::query(
            "INSERT INTO user_profile (user_id, first_seen, last_seen, conversation_count,
                                       message_count, preferences_json,
                                       recent_conversations_json, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 first_seen = excluded.first_seen,
                 last_seen = excluded.last_seen,
                 conversation_count = excluded.conversation_count,
                 message_count = excluded.message_count,
                 preferences_json = excluded.preferences_json,
                 recent_conversations_json = excluded.recent_conversations_json,
                 updated_at = excluded.updated_at
             WHERE excluded.updated_at >= user_profile.updated_at",
        )
        .bind(&profile.user_id.0)
        .bind(timestamp(&profile.first_seen))
        .bind(timestamp(&profile.last_seen))
        .bind(profile.conversation_count as i64)
        .bind(profile.message_count as i64)
        .bind(preferences)
        .bind(recent)
        .bind(timestamp(&profile.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileStore for SqlProfileStore {
    async fn load(&self, user_id: &UserId) -> Result<Option<UserProfile>, UpstreamError> {
        self.find(user_id).await.map_err(|error| error.into_upstream(SERVICE))
    }

    async fn save(&self, profile: &UserProfile) -> Result<bool, UpstreamError> {
        self.upsert(profile).await.map_err(|error| error.into_upstream(SERVICE))
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let first_seen: String = row.try_get("first_seen").map_err(decode)?;
    let last_seen: String = row.try_get("last_seen").map_err(decode)?;
    let conversation_count: i64 = row.try_get("conversation_count").map_err(decode)?;
    let message_count: i64 = row.try_get("message_count").map_err(decode)?;
    let preferences_json: String = row.try_get("preferences_json").map_err(decode)?;
    let recent_json: String = row.try_get("recent_conversations_json").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    let preferences: Preferences = serde_json::from_str(&preferences_json).map_err(decode)?;
    let recent_conversations: RecentConversations =
        serde_json::from_str(&recent_json).map_err(decode)?;

    Ok(UserProfile {
        user_id: UserId(user_id),
        first_seen: parse_timestamp("first_seen", &first_seen)?,
        last_seen: parse_timestamp("last_seen", &last_seen)?,
        conversation_count: conversation_count.max(0) as u64,
        message_count: message_count.max(0) as u64,
        preferences,
        recent_conversations,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}
