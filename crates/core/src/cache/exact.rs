use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CachedResponse, ExactCache};
use crate::clock::Clock;
use crate::errors::UpstreamError;

/// Hex SHA-256 of the lower-cased, trimmed query.
pub fn query_key(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Process-local exact tier with an optional time-to-live per key.
pub struct InMemoryExactCache {
    clock: Arc<dyn Clock>,
    ttl: Option<chrono::Duration>,
    entries: RwLock<HashMap<String, (CachedResponse, DateTime<Utc>)>>,
}

impl InMemoryExactCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Option<Duration>) -> Self {
        Self {
            clock,
            ttl: ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ExactCache for InMemoryExactCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, UpstreamError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let value = entries.get(key).and_then(|(value, stored_at)| match self.ttl {
            Some(ttl) if now - *stored_at >= ttl => None,
            _ => Some(value.clone()),
        });
        Ok(value)
    }

    async fn put(&self, key: &str, value: CachedResponse) -> Result<(), UpstreamError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        if let Some(ttl) = self.ttl {
            entries.retain(|_, (_, stored_at)| now - *stored_at < ttl);
        }
        entries.insert(key.to_string(), (value, now));
        Ok(())
    }

    async fn update_entry(&self, entry_id: Uuid, response: &str) -> Result<usize, UpstreamError> {
        let mut entries = self.entries.write().await;
        let mut updated = 0;
        for (value, _) in entries.values_mut() {
            if value.entry_id == Some(entry_id) {
                value.response = response.to_string();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn remove_entry(&self, entry_id: Uuid) -> Result<usize, UpstreamError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (value, _)| value.entry_id != Some(entry_id));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};
    use uuid::Uuid;

    use super::{query_key, InMemoryExactCache};
    use crate::cache::{CachedResponse, ExactCache};
    use crate::clock::ManualClock;

    fn response(text: &str) -> CachedResponse {
        CachedResponse {
            response: text.to_string(),
            category: "general".to_string(),
            language: "en".to_string(),
            entry_id: None,
        }
    }

    #[test]
    fn key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(query_key("  Do you deliver?  "), query_key("do you deliver?"));
        assert_ne!(query_key("do you deliver?"), query_key("do you  deliver?"));
        assert_eq!(query_key("x").len(), 64);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = InMemoryExactCache::new(clock.clone(), Some(Duration::from_secs(60)));

        cache.put("k", response("hello")).await.expect("put");
        assert_eq!(cache.get("k").await.expect("get"), Some(response("hello")));

        clock.advance(ChronoDuration::seconds(61));
        assert_eq!(cache.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn entry_id_reaches_every_key_it_was_stored_under() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = InMemoryExactCache::new(clock, None);
        let entry_id = Uuid::new_v4();
        let linked = CachedResponse { entry_id: Some(entry_id), ..response("Yes") };

        cache.put("stored", linked.clone()).await.expect("put");
        cache.put("promoted", linked).await.expect("put");
        cache.put("other", response("Maybe")).await.expect("put");

        assert_eq!(cache.update_entry(entry_id, "No, pickup only").await.expect("update"), 2);
        let updated = cache.get("promoted").await.expect("get").expect("present");
        assert_eq!(updated.response, "No, pickup only");

        assert_eq!(cache.remove_entry(entry_id).await.expect("remove"), 2);
        assert_eq!(cache.get("stored").await.expect("get"), None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn no_ttl_keeps_entries() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = InMemoryExactCache::new(clock.clone(), None);

        cache.put("k", response("hello")).await.expect("put");
        clock.advance(ChronoDuration::days(30));

        assert!(cache.get("k").await.expect("get").is_some());
        assert_eq!(cache.len().await, 1);
    }
}
