//! IGDB metadata lookup.
//!
//! Authentication is the Twitch client-credentials flow (IGDB is
//! Twitch-owned). The service allows four requests per second; calls are
//! paced 250 ms apart and results cached for 24 hours.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use ashbot_core::retry::RetryPolicy;
use ashbot_core::similarity::sequence_ratio;

use crate::error::{CatalogError, Result};
use crate::http::send_with_retry;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const GAMES_URL: &str = "https://api.igdb.com/v4/games";

/// Minimum spacing between requests (4 req/s allowance).
const REQUEST_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// Cached lookups live this long.
const CACHE_TTL_HOURS: i64 = 24;

/// Upper bound on a single metadata request.
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Validation result for one extracted name.
#[derive(Debug, Clone, Default)]
pub struct IgdbEnrichment {
    pub canonical_name: String,
    pub alternative_names: Vec<String>,
    pub genre: Option<String>,
    pub series_name: Option<String>,
    pub release_year: Option<i32>,
    pub igdb_id: Option<i64>,
    /// Similarity between the queried name and the canonical name.
    pub confidence: f64,
    pub match_found: bool,
}

/// External game-metadata lookup, mockable for ingestor tests.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn validate_and_enrich(&self, game_name: &str) -> Result<IgdbEnrichment>;
}

/// Stand-in used when no metadata credentials are configured: every lookup
/// reports no match, so extraction results are stored low-confidence and
/// flagged for review instead of failing the run.
pub struct OfflineMetadata;

#[async_trait]
impl MetadataClient for OfflineMetadata {
    async fn validate_and_enrich(&self, game_name: &str) -> Result<IgdbEnrichment> {
        Ok(IgdbEnrichment {
            canonical_name: game_name.to_string(),
            ..Default::default()
        })
    }
}

pub struct IgdbClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    retry: RetryPolicy,
    /// (token, expiry). Refreshed lazily.
    token: tokio::sync::Mutex<Option<(String, DateTime<Utc>)>>,
    /// Last request instant for pacing.
    last_request: tokio::sync::Mutex<Option<Instant>>,
    cache: Mutex<HashMap<String, (IgdbEnrichment, DateTime<Utc>)>>,
}

impl IgdbClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            client_id,
            client_secret,
            retry: RetryPolicy::metadata_lookup(),
            token: tokio::sync::Mutex::new(None),
            last_request: tokio::sync::Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some((tok, expires)) = token.as_ref() {
            if Utc::now() < *expires {
                return Ok(tok.clone());
            }
        }

        let resp = send_with_retry(&self.retry, || {
            self.client
                .post(TOKEN_URL)
                .query(&[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ])
                .send()
        })
        .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, "IGDB token request failed");
            return Err(CatalogError::Api {
                status,
                message: text,
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        // Refresh one minute early to dodge clock skew.
        let expires = Utc::now() + Duration::seconds(body.expires_in.saturating_sub(60));
        *token = Some((body.access_token.clone(), expires));
        info!("IGDB access token refreshed");
        Ok(body.access_token)
    }

    /// Space requests at least [`REQUEST_INTERVAL`] apart.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < REQUEST_INTERVAL {
                tokio::time::sleep(REQUEST_INTERVAL - since).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn search(&self, game_name: &str, token: &str) -> Result<Vec<IgdbGame>> {
        self.pace().await;

        // Escape embedded quotes so the query body stays well-formed.
        let escaped = game_name.replace('"', "\\\"");
        let body = format!(
            "search \"{}\"; fields name,alternative_names.name,franchises.name,\
             genres.name,release_dates.y; limit 5;",
            escaped
        );

        let resp = send_with_retry(&self.retry, || {
            self.client
                .post(GAMES_URL)
                .header("Client-ID", &self.client_id)
                .header("Authorization", format!("Bearer {token}"))
                .body(body.clone())
                .send()
        })
        .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, "IGDB search failed");
            return Err(CatalogError::Api {
                status,
                message: text,
            });
        }

        resp.json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MetadataClient for IgdbClient {
    /// Validate a game name and return enrichment data with a confidence
    /// score. The best (first) search hit is used.
    async fn validate_and_enrich(&self, game_name: &str) -> Result<IgdbEnrichment> {
        let cache_key = game_name.trim().to_lowercase();
        {
            let cache = self.cache.lock().unwrap();
            if let Some((cached, stored_at)) = cache.get(&cache_key) {
                if Utc::now() - *stored_at < Duration::hours(CACHE_TTL_HOURS) {
                    debug!(game_name, "IGDB cache hit");
                    return Ok(cached.clone());
                }
            }
        }

        let token = self.access_token().await?;
        let results = self.search(game_name, &token).await?;

        let Some(best) = results.into_iter().next() else {
            return Ok(IgdbEnrichment {
                canonical_name: game_name.to_string(),
                ..Default::default()
            });
        };

        let confidence = calculate_confidence(game_name, &best.name);
        let enrichment = IgdbEnrichment {
            confidence,
            match_found: true,
            igdb_id: Some(best.id),
            alternative_names: best
                .alternative_names
                .into_iter()
                .map(|a| a.name)
                .take(5)
                .collect(),
            genre: best.genres.into_iter().next().map(|g| g.name),
            series_name: best.franchises.into_iter().next().map(|f| f.name),
            release_year: best.release_dates.into_iter().find_map(|r| r.y),
            canonical_name: best.name,
        };

        info!(
            queried = game_name,
            canonical = %enrichment.canonical_name,
            confidence,
            "IGDB validation"
        );

        let mut cache = self.cache.lock().unwrap();
        cache.insert(cache_key, (enrichment.clone(), Utc::now()));
        Ok(enrichment)
    }
}

/// Confidence of a (queried → canonical) name match: 1.0 for an exact
/// case-insensitive match, otherwise the sequence ratio, with word overlap
/// taking the max for multi-word names. Rounded to two decimals.
pub fn calculate_confidence(extracted: &str, igdb_name: &str) -> f64 {
    let a = extracted.trim().to_lowercase();
    let b = igdb_name.trim().to_lowercase();

    if a == b {
        return 1.0;
    }

    let mut similarity = sequence_ratio(&a, &b);

    let a_words: Vec<&str> = a.split_whitespace().collect();
    if a_words.len() > 1 {
        let b_words: Vec<&str> = b.split_whitespace().collect();
        if !b_words.is_empty() {
            let overlap = a_words.iter().filter(|w| b_words.contains(w)).count();
            let word_score = overlap as f64 / b_words.len() as f64;
            similarity = similarity.max(word_score);
        }
    }

    (similarity * 100.0).round() / 100.0
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Deserialize)]
struct IgdbGame {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    alternative_names: Vec<IgdbNamed>,
    #[serde(default)]
    franchises: Vec<IgdbNamed>,
    #[serde(default)]
    genres: Vec<IgdbNamed>,
    #[serde(default)]
    release_dates: Vec<IgdbReleaseDate>,
}

#[derive(Deserialize)]
struct IgdbNamed {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct IgdbReleaseDate {
    y: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_full_confidence() {
        assert_eq!(calculate_confidence("Portal 2", "portal 2"), 1.0);
    }

    #[test]
    fn near_match_scores_above_review_threshold() {
        let c = calculate_confidence("Zombie Army 4", "Zombie Army 4: Dead War");
        assert!(c >= 0.7, "got {c}");
    }

    #[test]
    fn word_overlap_rescues_reordered_names() {
        // Character order alone scores poorly; full word overlap wins.
        let c = calculate_confidence("Wild Hunt The Witcher 3", "the witcher 3");
        assert!(c >= 0.8, "got {c}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let c = calculate_confidence("Subnautica", "FIFA 23");
        assert!(c < 0.5, "got {c}");
    }
}
