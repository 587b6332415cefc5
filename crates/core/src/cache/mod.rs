//! Two-tier response cache: an exact tier keyed by a normalized query hash
//! and a semantic tier backed by an embedding service and a vector index.

pub mod exact;
pub mod guard;
pub mod semantic;
pub mod vector;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::UpstreamError;

pub use exact::{query_key, InMemoryExactCache};
pub use guard::{PiiGuard, PiiViolation};
pub use semantic::{SemanticCache, SemanticCacheSettings};
pub use vector::{cosine_similarity, InMemoryVectorIndex};

/// Value held by the exact tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub response: String,
    pub category: String,
    pub language: String,
    #[serde(default)]
    pub entry_id: Option<Uuid>,
}

/// Semantic-tier record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: Uuid,
    pub query: String,
    pub embedding: Vec<f32>,
    pub response: String,
    pub category: String,
    pub language: String,
    pub hit_count: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatch {
    pub entry: CacheEntry,
    pub similarity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Exact,
    Semantic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheHit {
    pub response: String,
    pub similarity: f32,
    pub tier: CacheTier,
    pub entry_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored { entry_id: Uuid },
    Rejected(PiiViolation),
    /// Upstream failure; the exact tier may still have been written.
    Failed,
}

#[async_trait]
pub trait ExactCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, UpstreamError>;
    async fn put(&self, key: &str, value: CachedResponse) -> Result<(), UpstreamError>;

    /// Rewrites every key carrying `entry_id`; returns how many changed.
    async fn update_entry(&self, entry_id: Uuid, response: &str) -> Result<usize, UpstreamError>;

    /// Drops every key carrying `entry_id`; returns how many were removed.
    async fn remove_entry(&self, entry_id: Uuid) -> Result<usize, UpstreamError>;
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError>;
}

/// Wired when no embedding backend is configured; the cache then runs
/// exact-only and never calls it.
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingService for DisabledEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
        Err(UpstreamError::unavailable("embedding", "embedding service disabled"))
    }
}

/// Nearest-neighbour store for semantic-tier entries. Inactive entries are
/// never returned by [`VectorIndex::nearest`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn nearest(
        &self,
        vector: &[f32],
        similarity_floor: f32,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, UpstreamError>;

    async fn insert(&self, entry: CacheEntry) -> Result<(), UpstreamError>;

    /// Looks an entry up by id, active or not.
    async fn entry(&self, id: Uuid) -> Result<Option<CacheEntry>, UpstreamError>;

    async fn increment_hits(&self, id: Uuid) -> Result<(), UpstreamError>;

    /// Returns `false` when no entry has this id.
    async fn update_response(&self, id: Uuid, response: &str) -> Result<bool, UpstreamError>;

    /// Returns `false` when no entry has this id.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, UpstreamError>;
}
