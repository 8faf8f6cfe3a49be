//! Fingerprinted, TTL-bucketed, fuzzy-matched prompt → response cache.
//!
//! Exact fingerprint lookups come first; a bounded similarity search over
//! the stored entries catches re-phrasings. Everything runs synchronously
//! under one mutex — the lock is never held across a suspension point.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use ashbot_core::similarity::sequence_ratio;

/// Fuzzy matches at or above this ratio count as hits.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Caches larger than this are similarity-searched over a uniform sample.
const SAMPLE_LIMIT: usize = 1_000;

/// Size above which writes opportunistically sweep expired entries.
const SWEEP_SIZE: usize = 500;

/// Every this-many writes past [`SWEEP_SIZE`], a sweep runs before insert.
const SWEEP_STRIDE: usize = 50;

/// Query classification for TTL selection, auto-detected from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Faq,
    GamingQuery,
    Personality,
    Trivia,
    General,
}

impl QueryType {
    pub fn ttl(&self) -> Duration {
        let secs = match self {
            QueryType::Faq => 86_400,
            QueryType::GamingQuery => 21_600,
            QueryType::Personality => 43_200,
            QueryType::Trivia => 604_800,
            QueryType::General => 10_800,
        };
        Duration::seconds(secs)
    }

    /// Heuristic classification; callers may override at insert.
    pub fn detect(query: &str) -> Self {
        let q = query.to_lowercase();

        let faq_markers = [
            "who is", "who are", "what is you", "what is your", "what are you",
            "what are your", "what is the", "how do you", "how does", "how did you",
            "where is", "where are", "where do", "when is", "when are", "when do",
            "when did",
        ];
        if faq_markers.iter().any(|m| q.contains(m)) {
            return QueryType::Faq;
        }

        let gaming_markers = [
            "game", "play", "episode", "hour", "complete", "finish", "jonesy",
            "captain", "series", "genre", "rpg", "horror", "youtube", "twitch",
            "view", "stream",
        ];
        if gaming_markers.iter().any(|m| q.contains(m)) {
            return QueryType::GamingQuery;
        }

        let personality_markers = [
            "hello", "hi ", "hey", "greetings", "thank", "appreciate",
            "good morning", "good afternoon", "good evening", "good night",
            "how are you",
        ];
        if personality_markers.iter().any(|m| q.starts_with(m) || q.contains(m)) {
            return QueryType::Personality;
        }

        QueryType::General
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    original_query: String,
    normalized_query: String,
    response: String,
    query_type: QueryType,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    hits: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_queries: u64,
    pub cache_size: usize,
    pub api_calls_saved: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.hits as f64 / self.total_queries as f64 * 100.0
    }
}

/// One line of the operator-facing cache dump.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub query: String,
    pub query_type: QueryType,
    pub hits: u64,
    pub age_secs: i64,
    pub expires_in_secs: i64,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    total_queries: u64,
    saves: u64,
}

pub struct ResponseCache {
    inner: Mutex<Inner>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                total_queries: 0,
                saves: 0,
            }),
        }
    }

    /// Look up a response. Exact fingerprint first, then bounded fuzzy
    /// search. Expired exact hits are evicted on the spot.
    pub fn get(&self, query: &str, now: DateTime<Utc>) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.total_queries += 1;

        let normalized = normalize_query(query);
        let key = fingerprint(&normalized);

        match inner.entries.get(&key).map(|e| e.is_expired(now)) {
            Some(true) => {
                inner.entries.remove(&key);
                inner.misses += 1;
                return None;
            }
            Some(false) => {
                if let Some(entry) = inner.entries.get_mut(&key) {
                    entry.hits += 1;
                    entry.last_accessed = now;
                    let response = entry.response.clone();
                    let hits = entry.hits;
                    inner.hits += 1;
                    inner.saves += 1;
                    debug!(hits, "cache hit (exact)");
                    return Some(response);
                }
            }
            None => {}
        }

        if let Some(key) = find_similar(&inner, &normalized, now) {
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.hits += 1;
                entry.last_accessed = now;
                let response = entry.response.clone();
                inner.hits += 1;
                inner.saves += 1;
                debug!("cache hit (fuzzy)");
                return Some(response);
            }
        }

        inner.misses += 1;
        None
    }

    /// Cache a response. TTL comes from the query type (auto-detected unless
    /// overridden). Oversized caches sweep expired entries every
    /// [`SWEEP_STRIDE`] writes.
    pub fn set(
        &self,
        query: &str,
        response: &str,
        query_type: Option<QueryType>,
        now: DateTime<Utc>,
    ) {
        let mut inner = self.inner.lock().unwrap();

        if inner.entries.len() > SWEEP_SIZE && inner.entries.len() % SWEEP_STRIDE == 0 {
            sweep(&mut inner, now);
        }

        let query_type = query_type.unwrap_or_else(|| QueryType::detect(query));
        let normalized = normalize_query(query);
        let key = fingerprint(&normalized);
        let ttl = query_type.ttl();

        inner.entries.insert(
            key,
            CacheEntry {
                original_query: query.to_string(),
                normalized_query: normalized,
                response: response.to_string(),
                query_type,
                created_at: now,
                expires_at: now + ttl,
                last_accessed: now,
                hits: 0,
            },
        );
    }

    /// Remove expired entries; returns how many were dropped.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.lock().unwrap();
        sweep(&mut inner, now)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            total_queries: inner.total_queries,
            cache_size: inner.entries.len(),
            api_calls_saved: inner.saves,
        }
    }

    /// Top entries by hit count, for the operator status dump.
    pub fn info(&self, limit: usize, now: DateTime<Utc>) -> Vec<CacheEntryInfo> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<_> = inner
            .entries
            .values()
            .filter(|e| !e.is_expired(now))
            .map(|e| CacheEntryInfo {
                query: e.original_query.chars().take(50).collect(),
                query_type: e.query_type,
                hits: e.hits,
                age_secs: (now - e.created_at).num_seconds(),
                expires_in_secs: (e.expires_at - now).num_seconds(),
            })
            .collect();
        entries.sort_by(|a, b| b.hits.cmp(&a.hits));
        entries.truncate(limit);
        entries
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        let size = inner.entries.len();
        inner.entries.clear();
        info!(size, "cache cleared");
    }
}

fn sweep(inner: &mut Inner, now: DateTime<Utc>) -> usize {
    let before = inner.entries.len();
    inner.entries.retain(|_, e| !e.is_expired(now));
    let removed = before - inner.entries.len();
    if removed > 0 {
        info!(removed, "cache sweep removed expired entries");
    }
    removed
}

/// Best fuzzy match at or above the threshold. Large caches are searched
/// over a uniform random sample to bound cost.
fn find_similar(inner: &Inner, normalized: &str, now: DateTime<Utc>) -> Option<String> {
    let keys: Vec<&String> = inner.entries.keys().collect();
    let sampled: Vec<&String> = if keys.len() > SAMPLE_LIMIT {
        let mut rng = rand::thread_rng();
        keys.choose_multiple(&mut rng, SAMPLE_LIMIT).copied().collect()
    } else {
        keys
    };

    let mut best: Option<(String, f64)> = None;
    for key in sampled {
        let entry = &inner.entries[key];
        if entry.is_expired(now) {
            continue;
        }
        let ratio = sequence_ratio(normalized, &entry.normalized_query);
        if ratio >= SIMILARITY_THRESHOLD && best.as_ref().map_or(true, |(_, b)| ratio > *b) {
            best = Some((key.clone(), ratio));
        }
    }
    best.map(|(key, _)| key)
}

/// Normalize for matching: lowercase, collapse whitespace, strip trailing
/// terminal punctuation, drop filler phrases.
fn normalize_query(query: &str) -> String {
    let mut normalized = query.to_lowercase();
    for filler in ["please", "can you", "could you", "would you"] {
        normalized = normalized.replace(filler, "");
    }
    let normalized = normalized
        .trim_end_matches(['?', '.', '!', ','])
        .to_string();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn exact_hit_after_normalization() {
        let cache = ResponseCache::new();
        cache.set("Has Jonesy played Portal?", "Affirmative.", None, t0());

        // Different case, punctuation, and filler still hit.
        let hit = cache.get("can you has jonesy played portal", t0());
        assert_eq!(hit.as_deref(), Some("Affirmative."));
    }

    #[test]
    fn fuzzy_hit_above_threshold() {
        let cache = ResponseCache::new();
        cache.set("has jonesy played dark souls", "Yes, 14 episodes.", None, t0());

        let hit = cache.get("has jonesy played dark soul", t0());
        assert_eq!(hit.as_deref(), Some("Yes, 14 episodes."));

        assert!(cache.get("completely unrelated question", t0()).is_none());
    }

    #[test]
    fn entries_expire_by_query_type_ttl() {
        let cache = ResponseCache::new();
        cache.set("hello there", "Greetings.", Some(QueryType::General), t0());

        let before = t0() + Duration::seconds(10_799);
        assert!(cache.get("hello there", before).is_some());

        let after = t0() + Duration::seconds(10_801);
        assert!(cache.get("hello there", after).is_none());
    }

    #[test]
    fn hit_implies_not_expired() {
        let cache = ResponseCache::new();
        cache.set("q", "r", Some(QueryType::Trivia), t0());
        let now = t0() + Duration::days(6);
        assert!(cache.get("q", now).is_some());
        let now = t0() + Duration::days(8);
        assert!(cache.get("q", now).is_none());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache = ResponseCache::new();
        cache.set("short lived", "a", Some(QueryType::General), t0());
        cache.set("long lived", "b", Some(QueryType::Trivia), t0());

        let removed = cache.sweep_expired(t0() + Duration::days(1));
        assert_eq!(removed, 1);
        assert_eq!(cache.stats().cache_size, 1);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = ResponseCache::new();
        cache.set("known", "r", None, t0());
        cache.get("known", t0());
        cache.get("unknown never cached", t0());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.api_calls_saved, 1);
        assert!((stats.hit_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn large_cache_similarity_search_stays_bounded() {
        let cache = ResponseCache::new();
        for i in 0..1_001 {
            cache.set(
                &format!("distinct query number {i} about topic {i}"),
                "r",
                Some(QueryType::Trivia),
                t0(),
            );
        }
        assert!(cache.stats().cache_size >= 1_000);
        // A miss must come back after scanning at most the sample size.
        assert!(cache.get("zzz nothing like the others at all", t0()).is_none());
    }

    #[test]
    fn type_detection() {
        assert_eq!(QueryType::detect("Who is Captain Jonesy?"), QueryType::Faq);
        assert_eq!(
            QueryType::detect("most played game this year"),
            QueryType::GamingQuery
        );
        assert_eq!(QueryType::detect("hello friend"), QueryType::Personality);
        assert_eq!(QueryType::detect("tell me something"), QueryType::General);
    }
}
