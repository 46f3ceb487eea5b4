//! Best-effort, expiring cache of analysis results.
//!
//! Entries live under `analysis_<key>` in a [`KeyValueStore`] as
//! `{ result, timestamp, expires, last_access }` (epoch milliseconds). Every
//! failure is logged and treated as a miss; nothing here is surfaced to the
//! caller.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::digest::{SHA256, digest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::AnalysisMode;
use crate::error::{CodelensError, Result};
use crate::store::KeyValueStore;

/// Prefix applied to every cache key.
pub const CACHE_NAMESPACE: &str = "analysis_";
/// Lifetime of a cached result: one hour.
pub const CACHE_TTL_MILLIS: i64 = 60 * 60 * 1000;
/// Default bound on stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Source of the current time in epoch milliseconds.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    result: T,
    timestamp: i64,
    expires: i64,
    #[serde(default)]
    last_access: i64,
}

#[derive(Debug, Deserialize)]
struct EntryMeta {
    expires: i64,
    #[serde(default)]
    last_access: i64,
    #[serde(default)]
    timestamp: i64,
}

impl EntryMeta {
    fn recency(&self) -> i64 {
        self.last_access.max(self.timestamp)
    }
}

/// Deterministic cache key for a submission to the backend at `api_url`.
pub fn cache_key(api_url: &str, mode: AnalysisMode, language: &str, code: &str) -> String {
    let material = format!(
        "{}\n{}\n{}\n{}",
        api_url.trim().trim_end_matches('/'),
        mode.as_str(),
        language.to_ascii_lowercase(),
        code
    );
    URL_SAFE_NO_PAD.encode(digest(&SHA256, material.as_bytes()).as_ref())
}

/// Expiring, size-bounded result cache.
#[derive(Debug)]
pub struct ResultCache<S, C> {
    store: S,
    clock: C,
    max_entries: usize,
}

impl<S: KeyValueStore, C: Clock> ResultCache<S, C> {
    /// Create a cache holding at most [`DEFAULT_MAX_ENTRIES`] entries.
    pub fn new(store: S, clock: C) -> Self {
        Self::with_max_entries(store, clock, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with an explicit entry bound (minimum one).
    pub fn with_max_entries(store: S, clock: C, max_entries: usize) -> Self {
        Self {
            store,
            clock,
            max_entries: max_entries.max(1),
        }
    }

    /// Store a result; failures are logged, never returned.
    pub fn cache<T: Serialize>(&self, key: &str, result: &T) {
        if let Err(err) = self.try_cache(key, result) {
            log::warn!("failed to cache analysis result: {err}");
        }
    }

    /// Fetch an unexpired result; expired or unreadable entries are misses.
    pub fn get_cached<T: DeserializeOwned + Serialize>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("failed to get cached analysis result: {err}");
                None
            }
        }
    }

    /// Drop a single entry.
    pub fn invalidate(&self, key: &str) {
        if let Err(err) = self.store.remove(&namespaced(key)) {
            log::warn!("failed to remove cached analysis result: {err}");
        }
    }

    fn try_cache<T: Serialize>(&self, key: &str, result: &T) -> Result<()> {
        let now = self.clock.now_millis();
        let entry = CacheEntry {
            result,
            timestamp: now,
            expires: now + CACHE_TTL_MILLIS,
            last_access: now,
        };
        self.store
            .set(&namespaced(key), &serde_json::to_string(&entry)?)?;
        self.enforce_bound(now)
    }

    fn try_get<T: DeserializeOwned + Serialize>(&self, key: &str) -> Result<Option<T>> {
        let storage_key = namespaced(key);
        let Some(raw) = self.store.get(&storage_key)? else {
            return Ok(None);
        };
        let mut entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("discarding unreadable cache entry {storage_key}: {err}");
                return Ok(None);
            }
        };
        let now = self.clock.now_millis();
        if now > entry.expires {
            self.store.remove(&storage_key)?;
            return Ok(None);
        }
        entry.last_access = now;
        if let Err(err) = serde_json::to_string(&entry)
            .map_err(CodelensError::from)
            .and_then(|raw| self.store.set(&storage_key, &raw))
        {
            log::debug!("failed to refresh cache recency for {storage_key}: {err}");
        }
        Ok(Some(entry.result))
    }

    /// Purge expired entries, then evict least recently used ones down to the bound.
    fn enforce_bound(&self, now: i64) -> Result<()> {
        let mut live = Vec::new();
        for key in self.store.keys()? {
            if !key.starts_with(CACHE_NAMESPACE) {
                continue;
            }
            let meta = self
                .store
                .get(&key)?
                .and_then(|raw| serde_json::from_str::<EntryMeta>(&raw).ok());
            match meta {
                Some(meta) if now <= meta.expires => live.push((meta.recency(), key)),
                _ => self.store.remove(&key)?,
            }
        }
        if live.len() <= self.max_entries {
            return Ok(());
        }
        live.sort();
        let excess = live.len() - self.max_entries;
        for (_, key) in live.into_iter().take(excess) {
            log::debug!("evicting cached analysis result {key}");
            self.store.remove(&key)?;
        }
        Ok(())
    }
}

fn namespaced(key: &str) -> String {
    format!("{CACHE_NAMESPACE}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{AnalysisResult, classify, fixtures};
    use crate::store::{MemoryStore, MockKeyValueStore};
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn at(millis: i64) -> Self {
            Self(AtomicI64::new(millis))
        }

        fn advance(&self, millis: i64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn combined() -> AnalysisResult {
        classify(fixtures::combined()).expect("fixture")
    }

    #[test]
    fn cached_result_is_returned_unchanged() {
        let clock = ManualClock::at(1_000);
        let cache = ResultCache::new(MemoryStore::new(), &clock);
        let result = combined();

        cache.cache("k1", &result);
        let cached: Option<AnalysisResult> = cache.get_cached("k1");
        assert_eq!(cached, Some(result));
    }

    #[test]
    fn computed_scores_survive_the_cache_bit_for_bit() {
        let clock = ManualClock::at(1_000);
        let cache = ResultCache::new(MemoryStore::new(), &clock);
        let scores = [0.9856906946328695_f64, 0.1 + 0.2, 1.0 / 3.0, 2.0_f64.sqrt() - 1.0];

        for (index, score) in scores.into_iter().enumerate() {
            let mut body = fixtures::combined();
            body["assessment"]["overall_score"] = serde_json::json!(score);
            let result = classify(body).expect("fixture");
            let key = format!("score-{index}");

            cache.cache(&key, &result);
            let cached: Option<AnalysisResult> = cache.get_cached(&key);
            match cached {
                Some(AnalysisResult::Combined(response)) => {
                    assert_eq!(response.assessment.overall_score.to_bits(), score.to_bits());
                }
                other => panic!("expected cached combined result, got {other:?}"),
            }

            cache.cache("raw", &score);
            let raw = cache.get_cached::<f64>("raw").expect("raw score");
            assert_eq!(raw.to_bits(), score.to_bits());
        }
    }

    #[test]
    fn result_expires_after_one_hour() {
        let clock = ManualClock::at(1_000);
        let store = MemoryStore::new();
        let cache = ResultCache::new(&store, &clock);
        cache.cache("k1", &combined());

        clock.advance(CACHE_TTL_MILLIS);
        assert!(cache.get_cached::<AnalysisResult>("k1").is_some());

        clock.advance(1);
        assert!(cache.get_cached::<AnalysisResult>("k1").is_none());
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn unreadable_entry_is_a_miss() {
        let clock = ManualClock::at(0);
        let store = MemoryStore::new();
        store.set("analysis_bad", "{not json").expect("seed");
        let cache = ResultCache::new(&store, &clock);
        assert!(cache.get_cached::<AnalysisResult>("bad").is_none());
    }

    #[test]
    fn write_failures_are_swallowed() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_set()
            .returning(|_, _| Err(CodelensError::Other("quota exceeded".to_string())));
        store.expect_keys().never();
        let mut clock = MockClock::new();
        clock.expect_now_millis().return_const(5_i64);

        let cache = ResultCache::new(store, clock);
        cache.cache("k1", &combined());
    }

    #[test]
    fn read_failures_are_misses() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(CodelensError::Other("storage disabled".to_string())));
        let mut clock = MockClock::new();
        clock.expect_now_millis().return_const(5_i64);

        let cache = ResultCache::new(store, clock);
        assert!(cache.get_cached::<AnalysisResult>("k1").is_none());
    }

    #[test]
    fn bound_evicts_least_recently_used() {
        let clock = ManualClock::at(0);
        let store = MemoryStore::new();
        let cache = ResultCache::with_max_entries(&store, &clock, 2);

        cache.cache("a", &1_u32);
        clock.advance(10);
        cache.cache("b", &2_u32);
        clock.advance(10);
        assert_eq!(cache.get_cached::<u32>("a"), Some(1));
        clock.advance(10);
        cache.cache("c", &3_u32);

        assert_eq!(
            store.keys().expect("keys"),
            vec!["analysis_a".to_string(), "analysis_c".to_string()]
        );
    }

    #[test]
    fn writes_purge_expired_entries_and_ignore_foreign_keys() {
        let clock = ManualClock::at(0);
        let store = MemoryStore::new();
        store.set("settings", "{}").expect("seed");
        let cache = ResultCache::new(&store, &clock);

        cache.cache("old", &1_u32);
        clock.advance(CACHE_TTL_MILLIS + 1);
        cache.cache("new", &2_u32);

        assert_eq!(
            store.keys().expect("keys"),
            vec!["analysis_new".to_string(), "settings".to_string()]
        );
    }

    #[test]
    fn invalidate_removes_entry() {
        let clock = ManualClock::at(0);
        let cache = ResultCache::new(MemoryStore::new(), &clock);
        cache.cache("k", &7_u32);
        cache.invalidate("k");
        assert_eq!(cache.get_cached::<u32>("k"), None);
    }

    #[test]
    fn cache_key_is_stable_and_mode_sensitive() {
        let backend = "http://localhost:8000";
        let a = cache_key(backend, AnalysisMode::Combined, "C", "int main(){}");
        let b = cache_key(backend, AnalysisMode::Combined, "c", "int main(){}");
        let c = cache_key(backend, AnalysisMode::Ast, "c", "int main(){}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        );
    }

    #[test]
    fn cache_key_separates_backends() {
        let local = cache_key("http://localhost:8000", AnalysisMode::Combined, "c", "x");
        let slashed = cache_key("http://localhost:8000/ ", AnalysisMode::Combined, "c", "x");
        let remote = cache_key("https://codelens.example", AnalysisMode::Combined, "c", "x");
        assert_eq!(local, slashed);
        assert_ne!(local, remote);
    }
}
