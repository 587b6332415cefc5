use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CacheEntry, SimilarityMatch, VectorIndex};
use crate::errors::UpstreamError;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Brute-force cosine index, suitable for tests and small deployments.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<CacheEntry> {
        self.entries.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Ranks `entries` by similarity to `vector`, keeping active ones at or above
/// the floor.
pub fn rank_entries<'a>(
    entries: impl Iterator<Item = &'a CacheEntry>,
    vector: &[f32],
    similarity_floor: f32,
    limit: usize,
) -> Vec<SimilarityMatch> {
    let mut matches = entries
        .filter(|entry| entry.active)
        .map(|entry| (entry, cosine_similarity(vector, &entry.embedding)))
        .filter(|(_, similarity)| *similarity >= similarity_floor)
        .map(|(entry, similarity)| SimilarityMatch { entry: entry.clone(), similarity })
        .collect::<Vec<_>>();
    matches.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
    matches.truncate(limit);
    matches
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn nearest(
        &self,
        vector: &[f32],
        similarity_floor: f32,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, UpstreamError> {
        let entries = self.entries.read().await;
        Ok(rank_entries(entries.values(), vector, similarity_floor, limit))
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), UpstreamError> {
        self.entries.write().await.insert(entry.id, entry);
        Ok(())
    }

    async fn entry(&self, id: Uuid) -> Result<Option<CacheEntry>, UpstreamError> {
        Ok(self.get(id).await)
    }

    async fn increment_hits(&self, id: Uuid) -> Result<(), UpstreamError> {
        if let Some(entry) = self.entries.write().await.get_mut(&id) {
            entry.hit_count += 1;
        }
        Ok(())
    }

    async fn update_response(&self, id: Uuid, response: &str) -> Result<bool, UpstreamError> {
        let mut entries = self.entries.write().await;
        Ok(entries.get_mut(&id).map(|entry| entry.response = response.to_string()).is_some())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, UpstreamError> {
        let mut entries = self.entries.write().await;
        Ok(entries.get_mut(&id).map(|entry| entry.active = active).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{cosine_similarity, InMemoryVectorIndex};
    use crate::cache::{CacheEntry, VectorIndex};

    fn entry(embedding: Vec<f32>) -> CacheEntry {
        CacheEntry {
            id: Uuid::new_v4(),
            query: "q".to_string(),
            embedding,
            response: "r".to_string(),
            category: "general".to_string(),
            language: "en".to_string(),
            hit_count: 0,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn nearest_orders_by_similarity_and_skips_inactive() {
        let index = InMemoryVectorIndex::new();
        let close = entry(vec![1.0, 0.1]);
        let exact = entry(vec![1.0, 0.0]);
        let hidden = entry(vec![1.0, 0.0]);
        let hidden_id = hidden.id;
        for item in [close.clone(), exact.clone(), hidden] {
            index.insert(item).await.expect("insert");
        }
        assert!(index.set_active(hidden_id, false).await.expect("deactivate"));

        let matches = index.nearest(&[1.0, 0.0], 0.5, 5).await.expect("nearest");

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entry.id, exact.id);
        assert_eq!(matches[1].entry.id, close.id);
    }

    #[tokio::test]
    async fn hit_counter_and_admin_update() {
        let index = InMemoryVectorIndex::new();
        let stored = entry(vec![0.0, 1.0]);
        let id = stored.id;
        index.insert(stored).await.expect("insert");

        index.increment_hits(id).await.expect("hit");
        index.increment_hits(id).await.expect("hit");
        assert!(index.update_response(id, "updated").await.expect("update"));
        assert!(!index.update_response(Uuid::new_v4(), "x").await.expect("update missing"));

        let entry = index.get(id).await.expect("entry present");
        assert_eq!(entry.hit_count, 2);
        assert_eq!(entry.response, "updated");
    }
}
