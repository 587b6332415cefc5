use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use budtender_core::cache::vector::rank_entries;
use budtender_core::cache::{CacheEntry, SimilarityMatch, VectorIndex};
use budtender_core::errors::UpstreamError;

use super::{decode, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const SERVICE: &str = "vector_index";

/// Semantic-tier entries in SQLite. Embeddings are stored as JSON arrays and
/// ranked in process, which is adequate for a single shop's cache size.
pub struct SqlVectorIndex {
    pool: DbPool,
}

impl SqlVectorIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<CacheEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, query, embedding_json, response, category, language, hit_count, active,
                    created_at
             FROM semantic_cache_entry WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn active_entries(&self) -> Result<Vec<CacheEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, query, embedding_json, response, category, language, hit_count, active,
                    created_at
             FROM semantic_cache_entry WHERE active = 1",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn insert_entry(&self, entry: &CacheEntry) -> Result<(), RepositoryError> {
        let embedding = serde_json::to_string(&entry.embedding).map_err(decode)?;

        sqlx::query(
            "INSERT INTO semantic_cache_entry (id, query, embedding_json, response, category,
                                               language, hit_count, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(&entry.query)
        .bind(embedding)
        .bind(&entry.response)
        .bind(&entry.category)
        .bind(&entry.language)
        .bind(entry.hit_count as i64)
        .bind(entry.active)
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn execute_update(&self, sql: &str, id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query(sql).bind(id.to_string()).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl VectorIndex for SqlVectorIndex {
    async fn nearest(
        &self,
        vector: &[f32],
        similarity_floor: f32,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, UpstreamError> {
        let entries = self.active_entries().await.map_err(|error| error.into_upstream(SERVICE))?;
        Ok(rank_entries(entries.iter(), vector, similarity_floor, limit))
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), UpstreamError> {
        self.insert_entry(&entry).await.map_err(|error| error.into_upstream(SERVICE))
    }

    async fn entry(&self, id: Uuid) -> Result<Option<CacheEntry>, UpstreamError> {
        self.find(id).await.map_err(|error| error.into_upstream(SERVICE))
    }

    async fn increment_hits(&self, id: Uuid) -> Result<(), UpstreamError> {
        self.execute_update(
            "UPDATE semantic_cache_entry SET hit_count = hit_count + 1 WHERE id = ?",
            id,
        )
        .await
        .map(|_| ())
        .map_err(|error| error.into_upstream(SERVICE))
    }

    async fn update_response(&self, id: Uuid, response: &str) -> Result<bool, UpstreamError> {
        sqlx::query("UPDATE semantic_cache_entry SET response = ? WHERE id = ?")
            .bind(response)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected() > 0)
            .map_err(|error| RepositoryError::from(error).into_upstream(SERVICE))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, UpstreamError> {
        let sql = if active {
            "UPDATE semantic_cache_entry SET active = 1 WHERE id = ?"
        } else {
            "UPDATE semantic_cache_entry SET active = 0 WHERE id = ?"
        };
        self.execute_update(sql, id)
            .await
            .map(|affected| affected > 0)
            .map_err(|error| error.into_upstream(SERVICE))
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let embedding_json: String = row.try_get("embedding_json").map_err(decode)?;
    let hit_count: i64 = row.try_get("hit_count").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(CacheEntry {
        id: Uuid::parse_str(&id).map_err(decode)?,
        query: row.try_get("query").map_err(decode)?,
        embedding: serde_json::from_str(&embedding_json).map_err(decode)?,
        response: row.try_get("response").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
        language: row.try_get("language").map_err(decode)?,
        hit_count: hit_count.max(0) as u64,
        active: row.try_get("active").map_err(decode)?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}
