// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter-keyed query cache with single-flight de-duplication.
//!
//! Entries are tagged with the namespace generation current when their fetch
//! *started*. Invalidation bumps the generation, which atomically marks every
//! entry stale, including results still in flight. A read issued after an
//! invalidation can therefore never be served a result computed before it.
//!
//! Concurrent readers of the same key within one generation share a single
//! fetch: the first caller becomes the leader and runs the fetch, later
//! callers wait on a watch channel for the leader's result.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use atendo_core::AtendoError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::trace;

type FlightResult<V> = Result<Arc<V>, String>;
type FlightReceiver<V> = watch::Receiver<Option<FlightResult<V>>>;

struct CacheEntry<V> {
    generation: u64,
    value: Arc<V>,
}

/// Generation-invalidated result cache keyed by query shape.
pub struct QueryCache<K, V> {
    generation: AtomicU64,
    entries: DashMap<K, CacheEntry<V>>,
    inflight: DashMap<(K, u64), FlightReceiver<V>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            entries: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    /// Current namespace generation. Monotonically increasing.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every entry at once.
    ///
    /// Bumping the generation marks all stored and in-flight results stale
    /// without touching them. Idempotent in effect: repeated calls with no
    /// interleaved writes change nothing observable.
    pub fn invalidate_all(&self) {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(generation = next, "cache invalidated");
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    ///
    /// At most one fetch per (key, generation) runs at a time; concurrent
    /// callers share the leader's result. Errors are never cached, and the
    /// leader's error is returned to it verbatim while waiters receive a
    /// rendered copy.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<Arc<V>, AtendoError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, AtendoError>>,
    {
        loop {
            let generation = self.generation.load(Ordering::Acquire);
            if let Some(entry) = self.entries.get(&key)
                && entry.generation == generation
            {
                return Ok(Arc::clone(&entry.value));
            }

            let flight_key = (key.clone(), generation);
            let tx = {
                // Guard scope kept tight: no awaiting while a shard is locked.
                match self.inflight.entry(flight_key.clone()) {
                    Entry::Occupied(occupied) => {
                        let rx = occupied.get().clone();
                        drop(occupied);
                        match self.wait_for_leader(&flight_key, rx).await {
                            Some(result) => return result,
                            // Leader vanished without a result; start over.
                            None => continue,
                        }
                    }
                    Entry::Vacant(vacant) => {
                        let (tx, rx) = watch::channel(None);
                        vacant.insert(rx);
                        tx
                    }
                }
            };

            // This caller is the leader for (key, generation).
            let result = fetch().await;
            self.inflight.remove(&flight_key);
            return match result {
                Ok(value) => {
                    let value = Arc::new(value);
                    self.entries.insert(
                        key,
                        CacheEntry {
                            generation,
                            value: Arc::clone(&value),
                        },
                    );
                    let _ = tx.send(Some(Ok(Arc::clone(&value))));
                    Ok(value)
                }
                Err(e) => {
                    let _ = tx.send(Some(Err(e.to_string())));
                    Err(e)
                }
            };
        }
    }

    /// Wait for the in-flight leader of `flight_key` to publish its result.
    ///
    /// Returns `None` when the leader dropped its channel without publishing
    /// (task cancelled mid-fetch); the stale flight entry is removed so the
    /// caller can retry and take over.
    async fn wait_for_leader(
        &self,
        flight_key: &(K, u64),
        mut rx: FlightReceiver<V>,
    ) -> Option<Result<Arc<V>, AtendoError>> {
        loop {
            let published = rx.borrow().clone();
            if let Some(result) = published {
                return Some(result.map_err(|message| {
                    AtendoError::Internal(format!("shared query fetch failed: {message}"))
                }));
            }
            if rx.changed().await.is_err() {
                self.inflight
                    .remove_if(flight_key, |_, other| other.same_channel(&rx));
                return None;
            }
        }
    }
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn second_read_hits_cache() {
        let cache: QueryCache<String, i64> = QueryCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("k".to_string(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(7i64) }
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let cache: QueryCache<String, i64> = QueryCache::new();

        let a = cache
            .get_or_fetch("a".to_string(), || async { Ok(1i64) })
            .await
            .unwrap();
        let b = cache
            .get_or_fetch("b".to_string(), || async { Ok(2i64) })
            .await
            .unwrap();
        assert_eq!(*a, 1);
        assert_eq!(*b, 2);

        // Re-reading "a" still hits its own entry.
        let a2 = cache
            .get_or_fetch("a".to_string(), || async { Ok(99i64) })
            .await
            .unwrap();
        assert_eq!(*a2, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_readers_share_one_fetch() {
        let cache: Arc<QueryCache<String, i64>> = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("k".to_string(), || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // Hold the flight open so the other readers join it.
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(42i64)
                        }
                    })
                    .await
            }));
        }

        for task in tasks {
            let value = task.await.unwrap().unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache: QueryCache<String, i64> = QueryCache::new();

        let first = cache
            .get_or_fetch("k".to_string(), || async { Ok(1i64) })
            .await
            .unwrap();
        assert_eq!(*first, 1);

        cache.invalidate_all();
        cache.invalidate_all(); // idempotent, no observable difference

        let second = cache
            .get_or_fetch("k".to_string(), || async { Ok(2i64) })
            .await
            .unwrap();
        assert_eq!(*second, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalidation_during_fetch_marks_result_stale() {
        let cache: Arc<QueryCache<String, i64>> = Arc::new(QueryCache::new());
        let source = Arc::new(AtomicUsize::new(1));
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let leader = {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k".to_string(), || {
                        let source = Arc::clone(&source);
                        let started = Arc::clone(&started);
                        let release = Arc::clone(&release);
                        async move {
                            let snapshot = source.load(Ordering::SeqCst) as i64;
                            started.notify_one();
                            release.notified().await;
                            Ok(snapshot)
                        }
                    })
                    .await
            })
        };

        started.notified().await;
        // The world changes while the fetch is in flight.
        source.store(2, Ordering::SeqCst);
        cache.invalidate_all();
        release.notify_one();

        // The in-flight caller still gets its pre-invalidation snapshot.
        let stale = leader.await.unwrap().unwrap();
        assert_eq!(*stale, 1);

        // But a read issued after the invalidation must refetch.
        let fresh = cache
            .get_or_fetch("k".to_string(), || {
                let source = Arc::clone(&source);
                async move { Ok(source.load(Ordering::SeqCst) as i64) }
            })
            .await
            .unwrap();
        assert_eq!(*fresh, 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: QueryCache<String, i64> = QueryCache::new();
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch("k".to_string(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AtendoError::Internal("boom".into())) }
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));

        let value = cache
            .get_or_fetch("k".to_string(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(5i64) }
            })
            .await
            .unwrap();
        assert_eq!(*value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
