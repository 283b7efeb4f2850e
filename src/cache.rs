use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::Result;

/// Dashboard data is refreshed at most once an hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Time-keyed memoization of query results. Entries expire after their TTL;
/// concurrent misses on a cold key may compute twice (last write wins), which
/// is acceptable for a read-only dashboard.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let now = self.clock.now();

        {
            let entries = self.entries.lock().await;
            if let Some((value, expires_at)) = entries.get(&key) {
                if now < *expires_at {
                    return Ok(value.clone());
                }
            }
        }

        // Lock is not held across the await; errors are never cached
        let value = compute().await?;

        let mut entries = self.entries.lock().await;
        entries.insert(key, (value.clone(), now + ttl));
        Ok(value)
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    struct ManualClock {
        base: Instant,
        offset: std::sync::Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: std::sync::Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_does_not_recompute() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        let computed = AtomicUsize::new(0);
        let computed = &computed;

        for _ in 0..2 {
            let value = cache
                .get_or_compute("generated", DEFAULT_TTL, || async move {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<&str, i64> = TtlCache::with_clock(clock.clone());
        let computed = AtomicUsize::new(0);
        let computed = &computed;

        let fetch = || {
            cache.get_or_compute("uploads", Duration::from_secs(60), || async move {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
        };

        fetch().await.unwrap();
        clock.advance(Duration::from_secs(61));
        fetch().await.unwrap();

        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_keys_are_cached_independently() {
        let cache: TtlCache<(&str, i64), i64> = TtlCache::new();

        let a = cache
            .get_or_compute(("count", 7), DEFAULT_TTL, || async move { Ok(1) })
            .await
            .unwrap();
        let b = cache
            .get_or_compute(("count", 30), DEFAULT_TTL, || async move { Ok(2) })
            .await
            .unwrap();

        assert_eq!((a, b), (1, 2));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        let computed = AtomicUsize::new(0);
        let computed = &computed;

        let err = cache
            .get_or_compute("flaky", DEFAULT_TTL, || async move {
                computed.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("connection refused").into())
            })
            .await;
        assert!(err.is_err());

        let value = cache
            .get_or_compute("flaky", DEFAULT_TTL, || async move {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok(9)
            })
            .await
            .unwrap();

        assert_eq!(value, 9);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }
}
