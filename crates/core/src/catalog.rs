use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::domain::catalog::CatalogItem;
use crate::errors::{with_timeout, UpstreamError};

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only source of all active catalog items.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<CatalogItem>, UpstreamError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub items: Arc<Vec<CatalogItem>>,
    pub from_cache: bool,
}

impl CatalogSnapshot {
    pub fn unavailable() -> Self {
        Self { items: Arc::new(Vec::new()), from_cache: false }
    }

    pub fn is_unavailable(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
struct CachedCatalog {
    items: Arc<Vec<CatalogItem>>,
    fetched_at: DateTime<Utc>,
}

/// Cache-aside wrapper around a [`CatalogStore`].
///
/// Refresh is lazy: the first read after the TTL has elapsed fetches a new
/// snapshot. Concurrent refreshes are not serialized; each one replaces the
/// entry with an equivalent snapshot.
pub struct CatalogCache {
    store: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    fetch_timeout: Duration,
    entry: RwLock<Option<CachedCatalog>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn CatalogStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(30)),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            entry: RwLock::new(None),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Never fails: a fetch error yields the last good snapshot, or the empty
    /// "unavailable" snapshot when nothing was ever fetched.
    pub async fn get(&self) -> CatalogSnapshot {
        let now = self.clock.now();

        let stale = {
            let entry = self.entry.read().await;
            match entry.as_ref() {
                Some(cached) if now - cached.fetched_at < self.ttl => {
                    return CatalogSnapshot { items: Arc::clone(&cached.items), from_cache: true };
                }
                Some(cached) => Some(Arc::clone(&cached.items)),
                None => None,
            }
        };

        match with_timeout("catalog", self.fetch_timeout, self.store.fetch_all()).await {
            Ok(items) => {
                debug!(
                    event_name = "catalog.refresh.completed",
                    item_count = items.len(),
                    "catalog snapshot refreshed"
                );
                let items = Arc::new(items);
                let mut entry = self.entry.write().await;
                *entry = Some(CachedCatalog { items: Arc::clone(&items), fetched_at: now });
                CatalogSnapshot { items, from_cache: false }
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.refresh.failed",
                    error = %error,
                    has_stale_snapshot = stale.is_some(),
                    "catalog fetch failed; serving last good snapshot"
                );
                match stale {
                    Some(items) => CatalogSnapshot { items, from_cache: true },
                    None => CatalogSnapshot::unavailable(),
                }
            }
        }
    }

    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        *entry = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};

    use super::{CatalogCache, CatalogStore, DEFAULT_CATALOG_TTL};
    use crate::clock::ManualClock;
    use crate::domain::catalog::{CatalogItem, StrainType, TierPrices};
    use crate::errors::UpstreamError;

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl CatalogStore for CountingStore {
        async fn fetch_all(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(UpstreamError::unavailable("catalog", "store offline"));
            }
            Ok(vec![CatalogItem {
                name: format!("Strain {call}"),
                category: "flower".to_string(),
                strain_type: StrainType::Hybrid,
                thc: None,
                cbg: None,
                prices: TierPrices::default(),
                in_house: false,
            }])
        }
    }

    fn cache(store: Arc<CountingStore>, clock: Arc<ManualClock>) -> CatalogCache {
        CatalogCache::new(store, clock, DEFAULT_CATALOG_TTL)
    }

    #[tokio::test]
    async fn serves_cached_snapshot_within_ttl() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(store.clone(), clock.clone());

        let first = cache.get().await;
        clock.advance(ChronoDuration::minutes(29));
        let second = cache.get().await;

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.items[0].name, "Strain 1");
    }

    #[tokio::test]
    async fn refreshes_after_ttl_expiry() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(store.clone(), clock.clone());

        cache.get().await;
        clock.advance(ChronoDuration::minutes(30));
        let refreshed = cache.get().await;

        assert!(!refreshed.from_cache);
        assert_eq!(refreshed.items[0].name, "Strain 2");
    }

    #[tokio::test]
    async fn fetch_failure_serves_last_good_snapshot() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(store.clone(), clock.clone());

        cache.get().await;
        store.failing.store(true, Ordering::SeqCst);
        clock.advance(ChronoDuration::hours(2));
        let snapshot = cache.get().await;

        assert!(snapshot.from_cache);
        assert_eq!(snapshot.items[0].name, "Strain 1");
    }

    #[tokio::test]
    async fn fetch_failure_without_history_is_unavailable() {
        let store = Arc::new(CountingStore { failing: AtomicBool::new(true), ..Default::default() });
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(store, clock);

        let snapshot = cache.get().await;

        assert!(snapshot.is_unavailable());
        assert!(!snapshot.from_cache);
    }

    struct HangingStore;

    #[async_trait]
    impl CatalogStore for HangingStore {
        async fn fetch_all(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn hanging_store_fails_closed() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = CatalogCache::new(Arc::new(HangingStore), clock, DEFAULT_CATALOG_TTL)
            .with_fetch_timeout(Duration::from_millis(20));

        assert!(cache.get().await.is_unavailable());
    }
}
