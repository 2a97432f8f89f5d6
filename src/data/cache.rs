use dashmap::DashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// Upstream payloads are considered fresh for five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// What happens to an entry once its TTL has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePolicy {
    /// Remove expired entries when they are read.
    Evict,
    /// Keep expired entries around as a last resort when a refresh fails.
    ServeStale,
}

/// Outcome of [`TtlCache::get_or_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// Served from cache within the TTL.
    Hit(V),
    /// Fetched from upstream and stored.
    Fetched(V),
    /// Upstream failed; an expired entry was served instead.
    Stale(V),
}

impl<V> Lookup<V> {
    pub fn into_inner(self) -> V {
        match self {
            Lookup::Hit(v) | Lookup::Fetched(v) | Lookup::Stale(v) => v,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Lookup::Stale(_))
    }
}

/// Keyed TTL cache with lazy expiry (no background sweeper).
///
/// Refresh is read-check-then-fetch: two concurrent misses on the same key
/// may both hit upstream. That is acceptable for the feeds cached here.
pub struct TtlCache<V> {
    cache: DashMap<String, CachedEntry<V>>,
    ttl: Duration,
    policy: StalePolicy,
}

struct CachedEntry<V> {
    value: V,
    fetched_at: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, policy: StalePolicy) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
            policy,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.cache.insert(
            key.into(),
            CachedEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Get value if not expired (evict on read under [`StalePolicy::Evict`])
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.cache.get(key)?;
        if entry.fetched_at.elapsed() <= self.ttl {
            return Some(entry.value.clone());
        }

        drop(entry); // Drop the read lock before touching the shard again
        if self.policy == StalePolicy::Evict {
            self.cache.remove(key);
        }
        None
    }

    /// Get value regardless of age. Always `None` under [`StalePolicy::Evict`]
    /// once the entry has been evicted by a read.
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.cache.get(key).map(|entry| entry.value.clone())
    }

    /// Serve a fresh entry, otherwise run `fetch` once and store its result.
    ///
    /// On fetch failure an expired entry is served when the policy allows it;
    /// otherwise the fetch error is returned.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Lookup::Hit(value));
        }

        match fetch().await {
            Ok(value) => {
                self.insert(key, value.clone());
                Ok(Lookup::Fetched(value))
            }
            Err(e) => match self.policy {
                StalePolicy::ServeStale => match self.get_stale(key) {
                    Some(value) => Ok(Lookup::Stale(value)),
                    None => Err(e),
                },
                StalePolicy::Evict => Err(e),
            },
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, StalePolicy::Evict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cache_insert_and_get() {
        let cache = TtlCache::default();
        cache.insert("us recession 2025", 42.0);

        assert_eq!(cache.get("us recession 2025"), Some(42.0));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_cache_ttl_expiration_evicts() {
        let cache = TtlCache::new(Duration::from_millis(50), StalePolicy::Evict);
        cache.insert("jet fuel prices", 71.0);

        assert_eq!(cache.get("jet fuel prices"), Some(71.0));

        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get("jet fuel prices"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.get_stale("jet fuel prices"), None);
    }

    #[test]
    fn test_serve_stale_keeps_expired_entry() {
        let cache = TtlCache::new(Duration::from_millis(50), StalePolicy::ServeStale);
        cache.insert("events", vec![1, 2, 3]);

        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get("events"), None);
        assert_eq!(cache.get_stale("events"), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_hits_after_first_fetch() {
        let cache: TtlCache<u32> = TtlCache::default();

        let first = cache
            .get_or_fetch("k", || async { Ok::<_, String>(7) })
            .await
            .unwrap();
        assert_eq!(first, Lookup::Fetched(7));

        let second = cache
            .get_or_fetch("k", || async { Err::<u32, _>("upstream down".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, Lookup::Hit(7));
    }

    #[tokio::test]
    async fn test_get_or_fetch_serves_stale_on_failure() {
        let cache = TtlCache::new(Duration::from_millis(30), StalePolicy::ServeStale);
        cache.insert("events", 3usize);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let lookup = cache
            .get_or_fetch("events", || async { Err::<usize, _>("timeout") })
            .await
            .unwrap();
        assert!(lookup.is_stale());
        assert_eq!(lookup.into_inner(), 3);
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_error_without_entry() {
        let cache: TtlCache<usize> = TtlCache::new(DEFAULT_TTL, StalePolicy::ServeStale);

        let result = cache
            .get_or_fetch("events", || async { Err::<usize, _>("timeout") })
            .await;
        assert_eq!(result, Err("timeout"));
    }

    #[tokio::test]
    async fn test_get_or_fetch_refreshes_expired_entry() {
        let cache = TtlCache::new(Duration::from_millis(30), StalePolicy::Evict);
        cache.insert("k", 1u32);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let lookup = cache
            .get_or_fetch("k", || async { Ok::<_, String>(2) })
            .await
            .unwrap();
        assert_eq!(lookup, Lookup::Fetched(2));
        assert_eq!(cache.get("k"), Some(2));
    }
}
