//! Cross-source reconciliation into the played-games catalog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use ashbot_core::game::{CompletionStatus, Game, CONFIDENCE_ACCEPT, CONFIDENCE_REVIEW};
use ashbot_core::similarity::sequence_ratio;
use ashbot_db::{Database, NewGame};

use crate::error::Result;
use crate::extract::{extract_candidates, has_completed_tag};
use crate::igdb::{IgdbEnrichment, MetadataClient};
use crate::quality::{normalize_genre, normalize_series};
use crate::sources::{split_multi_game_title, SourceRecord};

/// Near-duplicate canonical names at or above this ratio are merged.
const DEDUP_THRESHOLD: f64 = 0.92;

/// A sweep whose failure share exceeds this aborts.
const ABORT_FAILURE_RATE: f64 = 0.2;

/// Records processed before the abort check engages.
const ABORT_MIN_PROCESSED: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub flagged_for_review: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// Resolved identity for one record.
struct Resolved {
    canonical: String,
    extracted: String,
    confidence: f64,
    enrichment: Option<IgdbEnrichment>,
}

/// Per-record statistics to fold into the catalog entry.
struct RecordStats {
    episodes: u32,
    playtime_minutes: u32,
    completed_tag: bool,
    playlist_url: Option<String>,
    stream_url: Option<String>,
}

pub struct CatalogIngestor {
    db: Arc<Database>,
    metadata: Arc<dyn MetadataClient>,
}

impl CatalogIngestor {
    pub fn new(db: Arc<Database>, metadata: Arc<dyn MetadataClient>) -> Self {
        Self { db, metadata }
    }

    /// Reconcile a batch of source records with the catalog. Individual
    /// record failures are logged and counted; the run continues unless the
    /// failure rate crosses [`ABORT_FAILURE_RATE`].
    pub async fn ingest(&self, records: &[SourceRecord], now: DateTime<Utc>) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for record in records {
            report.processed += 1;

            let outcome = self.ingest_record(record, now).await;
            match outcome {
                Ok(results) => {
                    for merged in results {
                        match merged {
                            MergeOutcome::Created { needs_review } => {
                                report.created += 1;
                                if needs_review {
                                    report.flagged_for_review += 1;
                                }
                            }
                            MergeOutcome::Updated => report.updated += 1,
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(err = %e, "record ingestion failed");
                }
            }

            if report.processed >= ABORT_MIN_PROCESSED
                && (report.failed as f64) / (report.processed as f64) > ABORT_FAILURE_RATE
            {
                error!(
                    failed = report.failed,
                    processed = report.processed,
                    "failure rate too high, aborting ingestion run"
                );
                report.aborted = true;
                break;
            }
        }

        info!(
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            flagged = report.flagged_for_review,
            failed = report.failed,
            aborted = report.aborted,
            "ingestion run finished"
        );
        Ok(report)
    }

    /// One record may yield several catalog mutations (multi-game streams).
    async fn ingest_record(
        &self,
        record: &SourceRecord,
        now: DateTime<Utc>,
    ) -> Result<Vec<MergeOutcome>> {
        match record {
            SourceRecord::Playlist(p) => {
                let resolved = self.resolve_identity(&p.title).await?;
                let stats = RecordStats {
                    episodes: p.item_count,
                    playtime_minutes: p.item_durations_minutes.iter().sum(),
                    completed_tag: has_completed_tag(&p.title),
                    playlist_url: Some(p.url.clone()),
                    stream_url: None,
                };
                Ok(vec![self.merge_or_insert(resolved, stats, now)?])
            }
            SourceRecord::Stream(s) => {
                // Platform classification wins outright.
                if let Some(name) = &s.game_name {
                    let resolved = Resolved {
                        canonical: name.clone(),
                        extracted: name.clone(),
                        confidence: 1.0,
                        enrichment: None,
                    };
                    let stats = RecordStats {
                        episodes: 1,
                        playtime_minutes: s.duration_minutes,
                        completed_tag: has_completed_tag(&s.title),
                        playlist_url: None,
                        stream_url: s.url.clone(),
                    };
                    return Ok(vec![self.merge_or_insert(resolved, stats, now)?]);
                }

                // A back-to-back title yields one entry per segment, stats
                // split evenly.
                let segments = split_multi_game_title(&s.title);
                let share = s.duration_minutes / segments.len().max(1) as u32;
                let mut outcomes = Vec::new();
                for segment in &segments {
                    let resolved = self.resolve_identity(segment).await?;
                    let stats = RecordStats {
                        episodes: 1,
                        playtime_minutes: share,
                        completed_tag: has_completed_tag(&s.title),
                        playlist_url: None,
                        stream_url: s.url.clone(),
                    };
                    outcomes.push(self.merge_or_insert(resolved, stats, now)?);
                }
                Ok(outcomes)
            }
        }
    }

    /// Extraction plus metadata validation: candidates are tried in
    /// strategy order, stopping at the first high-confidence validation;
    /// otherwise the best-scoring candidate is kept with its (reduced)
    /// confidence and flagged downstream.
    async fn resolve_identity(&self, title: &str) -> Result<Resolved> {
        let candidates = extract_candidates(title);
        if candidates.is_empty() {
            return Err(crate::error::CatalogError::Parse(format!(
                "no game name extractable from title: {title}"
            )));
        }

        let mut best: Option<Resolved> = None;
        for candidate in candidates {
            let enrichment = self.metadata.validate_and_enrich(&candidate).await?;
            let mut confidence = enrichment.confidence;

            // Empty alternative-name lists strongly correlate with
            // wrong-franchise matches.
            if enrichment.match_found && enrichment.alternative_names.is_empty() {
                confidence = confidence.min(CONFIDENCE_REVIEW);
            }

            let resolved = Resolved {
                canonical: if confidence >= CONFIDENCE_ACCEPT && enrichment.match_found {
                    enrichment.canonical_name.clone()
                } else {
                    candidate.clone()
                },
                extracted: candidate.clone(),
                confidence,
                enrichment: Some(enrichment),
            };

            let better = best.as_ref().map_or(true, |b| confidence > b.confidence);
            if better {
                let done = confidence >= CONFIDENCE_ACCEPT;
                best = Some(resolved);
                if done {
                    break;
                }
            }
        }

        best.ok_or_else(|| {
            crate::error::CatalogError::Parse(format!("no validated candidate for title: {title}"))
        })
    }

    /// Apply the merge rules against an existing entry, or create one.
    fn merge_or_insert(
        &self,
        resolved: Resolved,
        stats: RecordStats,
        now: DateTime<Utc>,
    ) -> Result<MergeOutcome> {
        let enrichment = resolved.enrichment.as_ref();
        let accepted = resolved.confidence >= CONFIDENCE_ACCEPT;

        // A rejected match must not merge through the wrong franchise's
        // external id; name lookup still applies.
        let existing = match enrichment.filter(|_| accepted).and_then(|e| e.igdb_id) {
            Some(igdb_id) => match self.db.game_by_igdb_id(igdb_id)? {
                Some(g) => Some(g),
                None => self.lookup_by_names(&resolved)?,
            },
            None => self.lookup_by_names(&resolved)?,
        };

        match existing {
            Some(mut game) => {
                self.merge_into(&mut game, &resolved, &stats, accepted, now);
                self.db.save_game(&game)?;
                Ok(MergeOutcome::Updated)
            }
            None => {
                // A rejected match contributes only the extracted name; its
                // alternative names belong to whatever franchise it actually
                // matched.
                let mut alt_names = Vec::new();
                if accepted {
                    if let Some(e) = enrichment {
                        alt_names.extend(e.alternative_names.iter().cloned());
                    }
                }
                if !resolved
                    .extracted
                    .eq_ignore_ascii_case(&resolved.canonical)
                {
                    alt_names.push(resolved.extracted.clone());
                }

                let status = if stats.completed_tag {
                    CompletionStatus::Completed
                } else {
                    CompletionStatus::InProgress
                };

                let new = NewGame {
                    canonical_name: resolved.canonical.clone(),
                    alternative_names: alt_names,
                    series_name: enrichment
                        .filter(|_| accepted)
                        .and_then(|e| e.series_name.as_deref())
                        .and_then(normalize_series),
                    genre: enrichment
                        .filter(|_| accepted)
                        .and_then(|e| e.genre.as_deref())
                        .and_then(normalize_genre),
                    release_year: enrichment.filter(|_| accepted).and_then(|e| e.release_year),
                    completion_status: status,
                    total_episodes: stats.episodes,
                    total_playtime_minutes: stats.playtime_minutes,
                    igdb_id: enrichment.filter(|_| accepted).and_then(|e| e.igdb_id),
                    confidence: resolved.confidence,
                    playlist_url: stats.playlist_url.clone(),
                    stream_urls: stats.stream_url.clone().into_iter().collect(),
                    first_played_at: None,
                };
                let game = self.db.insert_game(&new, now)?;
                Ok(MergeOutcome::Created {
                    needs_review: game.needs_review(),
                })
            }
        }
    }

    fn lookup_by_names(&self, resolved: &Resolved) -> Result<Option<Game>> {
        if let Some(game) = self.db.find_game(&resolved.canonical)? {
            return Ok(Some(game));
        }
        Ok(self.db.find_game(&resolved.extracted)?)
    }

    fn merge_into(
        &self,
        game: &mut Game,
        resolved: &Resolved,
        stats: &RecordStats,
        accepted: bool,
        now: DateTime<Utc>,
    ) {
        // Episode and playtime totals never decrease on a same-source merge;
        // a partial fetch must not clobber fuller data.
        game.total_episodes = game.total_episodes.max(stats.episodes);
        game.total_playtime_minutes = game.total_playtime_minutes.max(stats.playtime_minutes);

        if let Some(e) = resolved.enrichment.as_ref() {
            if accepted {
                game.alternative_names
                    .extend(e.alternative_names.iter().cloned());
                if game.igdb_id.is_none() {
                    game.igdb_id = e.igdb_id;
                }
                if let Some(genre) = e.genre.as_deref().and_then(normalize_genre) {
                    game.genre = Some(genre);
                }
                if let Some(series) = e.series_name.as_deref().and_then(normalize_series) {
                    game.series_name = Some(series);
                }
                if game.release_year.is_none() {
                    game.release_year = e.release_year;
                }
            }
        }
        if !resolved.extracted.eq_ignore_ascii_case(&game.canonical_name) {
            game.alternative_names.push(resolved.extracted.clone());
        }

        // The completed tag upgrades an in-progress entry; nothing downgrades
        // automatically.
        if stats.completed_tag && game.completion_status == CompletionStatus::InProgress {
            game.completion_status = CompletionStatus::Completed;
        }

        if stats.playlist_url.is_some() {
            game.playlist_url = stats.playlist_url.clone();
        }
        if let Some(url) = &stats.stream_url {
            if !game.stream_urls.contains(url) {
                game.stream_urls.push(url.clone());
            }
        }

        game.confidence = game.confidence.max(resolved.confidence);
        game.last_validated_at = Some(now);
    }

    /// Merge near-duplicate catalog entries. Duplicates hold disjoint
    /// records, so episodes and playtime are summed; the external
    /// identifier comes from the higher-confidence side.
    pub fn dedup_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let games = self.db.all_games()?;
        let mut consumed: Vec<i64> = Vec::new();
        let mut merges = 0usize;

        for i in 0..games.len() {
            if consumed.contains(&games[i].id) {
                continue;
            }
            for j in (i + 1)..games.len() {
                if consumed.contains(&games[j].id) {
                    continue;
                }
                let ratio = sequence_ratio(
                    &games[i].canonical_name.to_lowercase(),
                    &games[j].canonical_name.to_lowercase(),
                );
                if ratio < DEDUP_THRESHOLD {
                    continue;
                }

                let (keep, drop) = if games[i].confidence >= games[j].confidence {
                    (&games[i], &games[j])
                } else {
                    (&games[j], &games[i])
                };

                info!(
                    keep = %keep.canonical_name,
                    drop = %drop.canonical_name,
                    ratio,
                    "merging near-duplicate catalog entries"
                );

                let mut merged = keep.clone();
                merged.total_episodes = keep.total_episodes + drop.total_episodes;
                merged.total_playtime_minutes =
                    keep.total_playtime_minutes + drop.total_playtime_minutes;
                merged
                    .alternative_names
                    .extend(drop.alternative_names.iter().cloned());
                merged.alternative_names.push(drop.canonical_name.clone());
                if merged.igdb_id.is_none() {
                    merged.igdb_id = drop.igdb_id;
                }
                let new_stream_urls: Vec<_> = drop
                    .stream_urls
                    .iter()
                    .filter(|u| !merged.stream_urls.contains(u))
                    .cloned()
                    .collect();
                merged.stream_urls.extend(new_stream_urls);
                if merged.playlist_url.is_none() {
                    merged.playlist_url = drop.playlist_url.clone();
                }
                merged.last_validated_at = Some(now);

                self.db.remove_game(drop.id)?;
                self.db.save_game(&merged)?;
                consumed.push(drop.id);
                consumed.push(keep.id);
                merges += 1;
                break;
            }
        }
        Ok(merges)
    }
}

enum MergeOutcome {
    Created { needs_review: bool },
    Updated,
}
