use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::exact::query_key;
use super::guard::PiiGuard;
use super::{
    CacheEntry, CacheHit, CacheTier, CachedResponse, EmbeddingService, ExactCache, StoreOutcome,
    VectorIndex,
};
use crate::clock::Clock;
use crate::errors::{with_timeout, UpstreamError};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;
pub const DEFAULT_PROMOTION_THRESHOLD: f32 = 0.95;

#[derive(Clone, Debug)]
pub struct SemanticCacheSettings {
    pub similarity_threshold: f32,
    /// Semantic hits at or above this similarity are copied into the exact
    /// tier under the incoming query's key.
    pub promotion_threshold: f32,
    pub upstream_timeout: Duration,
}

impl Default for SemanticCacheSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            upstream_timeout: Duration::from_secs(3),
        }
    }
}

pub struct SemanticCache {
    exact: Arc<dyn ExactCache>,
    embeddings: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    clock: Arc<dyn Clock>,
    guard: PiiGuard,
    settings: SemanticCacheSettings,
    semantic_tier: bool,
}

impl SemanticCache {
    pub fn new(
        exact: Arc<dyn ExactCache>,
        embeddings: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        clock: Arc<dyn Clock>,
        settings: SemanticCacheSettings,
    ) -> Self {
        Self { exact, embeddings, index, clock, guard: PiiGuard, settings, semantic_tier: true }
    }

    /// Serve and populate the exact tier only; the embedding service is never
    /// called. Used when no embedding backend is configured.
    pub fn without_semantic_tier(mut self) -> Self {
        self.semantic_tier = false;
        self
    }

    pub fn settings(&self) -> &SemanticCacheSettings {
        &self.settings
    }

    /// Lookup with the configured similarity threshold.
    pub async fn lookup_default(&self, query: &str, language: Option<&str>) -> Option<CacheHit> {
        self.lookup(query, language, self.settings.similarity_threshold).await
    }

    /// Exact tier first, then the nearest semantic neighbour at or above
    /// `threshold`. Upstream failures degrade to a miss.
    pub async fn lookup(
        &self,
        query: &str,
        language: Option<&str>,
        threshold: f32,
    ) -> Option<CacheHit> {
        let key = query_key(query);
        let timeout = self.settings.upstream_timeout;

        match with_timeout("exact_cache", timeout, self.exact.get(&key)).await {
            Ok(Some(cached)) => {
                if let Some(hit) = self.confirm_exact(cached).await {
                    debug!(event_name = "cache.exact.hit", "exact tier hit");
                    return Some(hit);
                }
            }
            Ok(None) => {}
            Err(error) => log_degraded("cache.exact.unavailable", &error),
        }
        if !self.semantic_tier {
            debug!(event_name = "cache.exact.miss", "exact tier miss");
            return None;
        }

        let embedding = match with_timeout("embedding", timeout, self.embeddings.embed(query)).await
        {
            Ok(embedding) => embedding,
            Err(error) => {
                log_degraded("cache.semantic.embedding_failed", &error);
                return None;
            }
        };

        let nearest =
            match with_timeout("vector_index", timeout, self.index.nearest(&embedding, threshold, 1))
                .await
            {
                Ok(matches) => matches.into_iter().next(),
                Err(error) => {
                    log_degraded("cache.semantic.index_failed", &error);
                    return None;
                }
            };

        let Some(found) = nearest.filter(|found| found.similarity >= threshold) else {
            debug!(event_name = "cache.semantic.miss", "no neighbour above threshold");
            return None;
        };
        if let Some(language) = language {
            if !found.entry.language.eq_ignore_ascii_case(language) {
                debug!(
                    event_name = "cache.semantic.language_mismatch",
                    wanted = language,
                    stored = %found.entry.language,
                    "nearest neighbour is in another language"
                );
                return None;
            }
        }

        let entry = found.entry;
        if let Err(error) =
            with_timeout("vector_index", timeout, self.index.increment_hits(entry.id)).await
        {
            log_degraded("cache.semantic.hit_count_failed", &error);
        }

        if found.similarity >= self.settings.promotion_threshold {
            let promoted = CachedResponse {
                response: entry.response.clone(),
                category: entry.category.clone(),
                language: entry.language.clone(),
                entry_id: Some(entry.id),
            };
            if let Err(error) = with_timeout("exact_cache", timeout, self.exact.put(&key, promoted)).await
            {
                log_degraded("cache.exact.promotion_failed", &error);
            }
        }

        debug!(
            event_name = "cache.semantic.hit",
            similarity = found.similarity,
            entry_id = %entry.id,
            "semantic tier hit"
        );
        Some(CacheHit {
            response: entry.response,
            similarity: found.similarity,
            tier: CacheTier::Semantic,
            entry_id: Some(entry.id),
        })
    }

    /// Writes a model response into both tiers unless the PII guard rejects
    /// it. Never fails; upstream errors are logged and reported as
    /// [`StoreOutcome::Failed`].
    pub async fn store(
        &self,
        query: &str,
        response: &str,
        category: &str,
        language: &str,
    ) -> StoreOutcome {
        if let Err(violation) = self.guard.check(response) {
            info!(
                event_name = "cache.store.rejected",
                reason = %violation,
                "response withheld from shared cache"
            );
            return StoreOutcome::Rejected(violation);
        }

        let timeout = self.settings.upstream_timeout;
        let entry_id = Uuid::new_v4();
        let key = query_key(query);
        let exact_value = CachedResponse {
            response: response.to_string(),
            category: category.to_string(),
            language: language.to_string(),
            entry_id: Some(entry_id),
        };
        if let Err(error) = with_timeout("exact_cache", timeout, self.exact.put(&key, exact_value)).await
        {
            log_degraded("cache.exact.write_failed", &error);
        }
        if !self.semantic_tier {
            return StoreOutcome::Stored { entry_id };
        }

        let embedding = match with_timeout("embedding", timeout, self.embeddings.embed(query)).await
        {
            Ok(embedding) => embedding,
            Err(error) => {
                log_degraded("cache.store.embedding_failed", &error);
                return StoreOutcome::Failed;
            }
        };

        let entry = CacheEntry {
            id: entry_id,
            query: query.trim().to_string(),
            embedding,
            response: response.to_string(),
            category: category.to_string(),
            language: language.to_string(),
            hit_count: 0,
            active: true,
            created_at: self.clock.now(),
        };
        match with_timeout("vector_index", timeout, self.index.insert(entry)).await {
            Ok(()) => {
                debug!(event_name = "cache.store.completed", entry_id = %entry_id, "cache entry stored");
                StoreOutcome::Stored { entry_id }
            }
            Err(error) => {
                log_degraded("cache.store.index_failed", &error);
                StoreOutcome::Failed
            }
        }
    }

    /// Administrative content update; the only path that rewrites a stored
    /// response. Both tiers serve the new text afterwards. Returns `false`
    /// when no entry has this id.
    pub async fn update_response(&self, id: Uuid, response: &str) -> Result<bool, UpstreamError> {
        let rewritten = self.exact.update_entry(id, response).await?;
        let indexed = self.index.update_response(id, response).await?;
        info!(
            event_name = "cache.admin.updated",
            entry_id = %id,
            indexed,
            rewritten,
            "cache entry updated"
        );
        Ok(indexed || rewritten > 0)
    }

    /// Inactive entries never match again, in either tier. Returns `false`
    /// when no entry has this id.
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, UpstreamError> {
        let removed = self.exact.remove_entry(id).await?;
        let indexed = self.index.set_active(id, false).await?;
        info!(
            event_name = "cache.admin.deactivated",
            entry_id = %id,
            indexed,
            removed,
            "cache entry deactivated"
        );
        Ok(indexed || removed > 0)
    }

    /// Exact hits that came from a semantic-tier entry follow that entry, so
    /// admin changes made by another process reach this tier too. An unknown
    /// entry or an unreachable index keeps the cached text.
    async fn confirm_exact(&self, cached: CachedResponse) -> Option<CacheHit> {
        let entry_id = match cached.entry_id {
            Some(entry_id) if self.semantic_tier => entry_id,
            _ => return Some(exact_hit(cached)),
        };
        let timeout = self.settings.upstream_timeout;

        match with_timeout("vector_index", timeout, self.index.entry(entry_id)).await {
            Ok(Some(entry)) if !entry.active => {
                if let Err(error) =
                    with_timeout("exact_cache", timeout, self.exact.remove_entry(entry_id)).await
                {
                    log_degraded("cache.exact.invalidate_failed", &error);
                }
                debug!(
                    event_name = "cache.exact.inactive",
                    entry_id = %entry_id,
                    "dropped inactive exact entry"
                );
                None
            }
            Ok(Some(entry)) if entry.response != cached.response => {
                if let Err(error) =
                    with_timeout("exact_cache", timeout, self.exact.update_entry(entry_id, &entry.response))
                        .await
                {
                    log_degraded("cache.exact.refresh_failed", &error);
                }
                Some(exact_hit(CachedResponse { response: entry.response, ..cached }))
            }
            Ok(_) => Some(exact_hit(cached)),
            Err(error) => {
                log_degraded("cache.exact.confirm_failed", &error);
                Some(exact_hit(cached))
            }
        }
    }
}

fn exact_hit(cached: CachedResponse) -> CacheHit {
    CacheHit {
        response: cached.response,
        similarity: 1.0,
        tier: CacheTier::Exact,
        entry_id: cached.entry_id,
    }
}

fn log_degraded(event_name: &'static str, error: &UpstreamError) {
    warn!(event_name, service = error.service(), error = %error, "cache degraded");
}
