//! Person discovery orchestration.
//!
//! Fans out one branch per enabled source, absorbs per-source failures into
//! result metadata, merges the surviving fragments by identity key in fixed
//! source-priority order, ranks, truncates, and caches. Identical concurrent
//! requests share one computation through the cache's single-flight path.

use crate::clients::{ContactsClient, DirectoryClient, HistoryClient};
use crate::config::DiscoveryConfig;
use crate::contacts::ContactsCollector;
use crate::directory::DirectorySearchAdapter;
use crate::error::{DiscoveryError, Result};
use crate::history::HistoryCollector;
use crate::ranker::RelevanceRanker;
use chrono::Utc;
use futures::future::join_all;
use rolodex_cache::{CacheError, ResultCache, TtlClass};
use rolodex_model::{CommunicationStats, PersonRecord, PersonSource, SearchStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One discovery query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Free-form search text: a name fragment, an address, or `@domain`
    pub query: String,
    /// Sources to consult; defaults to all of them
    #[serde(default = "default_sources")]
    pub sources: Vec<PersonSource>,
    /// Carry per-correspondent communication stats in the results
    #[serde(default = "default_include_stats")]
    pub include_stats: bool,
    /// Override of the configured history window
    #[serde(default)]
    pub time_window_days: Option<u32>,
    /// Override of the configured result cap
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_sources() -> Vec<PersonSource> {
    PersonSource::ALL.to_vec()
}

fn default_include_stats() -> bool {
    true
}

impl DiscoveryRequest {
    /// A request for `query` with every source enabled.
    #[must_use]
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: default_sources(),
            include_stats: true,
            time_window_days: None,
            max_results: None,
        }
    }
}

/// How a discovery result was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryMetadata {
    /// Sources that completed and contributed (possibly zero) fragments
    pub sources_used: Vec<PersonSource>,
    /// Sources that failed or timed out; the result is partial
    pub degraded_sources: Vec<PersonSource>,
    /// Directory strategy that produced the directory fragments, if any
    pub strategy_used: Option<SearchStrategy>,
    /// Whether this result was served from the cache
    pub cache_hit: bool,
}

/// Ranked, merged discovery output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Best-first person records
    pub records: Vec<PersonRecord>,
    /// Provenance of the result
    pub metadata: DiscoveryMetadata,
}

/// Directional communication stats for one correspondent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationHistory {
    /// The correspondent's address, lowercased
    pub address: String,
    /// Days of traffic scanned
    pub window_days: u32,
    /// Aggregated per-direction stats; empty when no traffic was found
    pub stats: CommunicationStats,
}

/// The discovery pipeline front door.
pub struct PersonDiscovery {
    directory: DirectorySearchAdapter,
    contacts: ContactsCollector,
    history: HistoryCollector,
    ranker: RelevanceRanker,
    cache: Arc<ResultCache>,
    config: DiscoveryConfig,
}

impl PersonDiscovery {
    /// Wire the pipeline over the three source clients.
    #[must_use]
    pub fn new(
        directory_client: Arc<dyn DirectoryClient>,
        contacts_client: Arc<dyn ContactsClient>,
        history_client: Arc<dyn HistoryClient>,
        cache: Arc<ResultCache>,
        config: DiscoveryConfig,
    ) -> Self {
        let ranker = RelevanceRanker::new(config.ranker.clone());
        Self {
            directory: DirectorySearchAdapter::new(
                directory_client,
                config.max_results,
                config.call_timeout(),
                config.fuzzy_threshold,
            ),
            contacts: ContactsCollector::new(
                contacts_client,
                config.max_results,
                config.call_timeout(),
            ),
            history: HistoryCollector::new(
                history_client,
                config.history_window_days,
                config.call_timeout(),
            ),
            ranker,
            cache,
            config,
        }
    }

    /// Find people matching a query across the enabled sources.
    ///
    /// Per-source failures degrade the result (see
    /// [`DiscoveryMetadata::degraded_sources`]); only an empty query, a total
    /// source failure, or cancellation produce an `Err`.
    pub async fn discover(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(DiscoveryError::InvalidQuery);
        }

        let mut sources = request.sources.clone();
        sources.sort();
        sources.dedup();
        if sources.is_empty() {
            sources = PersonSource::ALL.to_vec();
        }

        let limit = request.max_results.unwrap_or(self.config.max_results);
        let window = request
            .time_window_days
            .unwrap_or(self.config.history_window_days);
        let key = discover_cache_key(&query, &sources, request.include_stats, window, limit);

        let cached = self
            .cache
            .get_or_compute(TtlClass::DirectorySearch, &key, || {
                self.run_discovery(&query, &sources, request.include_stats, window, limit, cancel)
            })
            .await
            .map_err(map_cache_error)?;

        let mut result: DiscoveryResult = cached.value;
        result.metadata.cache_hit = cached.hit;
        Ok(result)
    }

    /// Best single match for an email address.
    ///
    /// `Ok(None)` means the address is genuinely unknown to every source.
    pub async fn lookup(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PersonRecord>> {
        let address = email.trim().to_lowercase();
        if address.is_empty() || !address.contains('@') {
            return Err(DiscoveryError::InvalidQuery);
        }

        let sources = PersonSource::ALL.to_vec();
        let cached = self
            .cache
            .get_or_compute(TtlClass::PersonDetail, &address, || async {
                let result = self
                    .run_discovery(
                        &address,
                        &sources,
                        true,
                        self.config.history_window_days,
                        1,
                        cancel,
                    )
                    .await?;
                Ok::<_, DiscoveryError>(result.records.into_iter().next())
            })
            .await
            .map_err(map_cache_error)?;

        Ok(cached.value)
    }

    /// Directional message stats for one correspondent.
    pub async fn communication_history(
        &self,
        email: &str,
        window_days: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<CommunicationHistory> {
        let address = email.trim().to_lowercase();
        if address.is_empty() || !address.contains('@') {
            return Err(DiscoveryError::InvalidQuery);
        }

        let window = window_days.unwrap_or(self.config.history_window_days);
        let key = format!("{address}:{window}");

        let cached = self
            .cache
            .get_or_compute(TtlClass::ContentSearch, &key, || async {
                let scan = tokio::select! {
                    r = self.history.collect_window(&address, window) => r,
                    () = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
                };
                let fragments = scan
                    .map_err(|e| DiscoveryError::AllSourcesFailed(e.to_string()))?;
                let stats = fragments
                    .into_iter()
                    .find(|f| f.primary_email() == Some(address.as_str()))
                    .map(|f| f.stats)
                    .unwrap_or_default();
                Ok::<_, DiscoveryError>(CommunicationHistory {
                    address: address.clone(),
                    window_days: window,
                    stats,
                })
            })
            .await
            .map_err(map_cache_error)?;

        Ok(cached.value)
    }

    /// The cache-miss path: fan out, merge, rank, truncate.
    async fn run_discovery(
        &self,
        query: &str,
        sources: &[PersonSource],
        include_stats: bool,
        window_days: u32,
        limit: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<DiscoveryResult, DiscoveryError> {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        // Branches are built highest-priority first so that processing order
        // (and therefore merge order and rank tie-breaks) never depends on
        // completion order.
        let mut enabled: Vec<PersonSource> = sources.to_vec();
        enabled.sort_by_key(|s| std::cmp::Reverse(s.priority()));

        // Per-collaborator-call timeouts live inside the adapters; the
        // request deadline bounds each whole branch, so a source that keeps
        // answering slowly (e.g. a directory chain of near-budget steps)
        // still cannot hold the request open.
        let deadline = self.config.request_deadline();
        let branches: Vec<_> = enabled
            .iter()
            .map(|&source| async move {
                match tokio::time::timeout(deadline, self.run_source(source, query, window_days))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err("request deadline elapsed".to_string()),
                }
            })
            .collect();

        let outcomes = tokio::select! {
            r = join_all(branches) => r,
            () = cancel.cancelled() => {
                info!(query, "discovery cancelled");
                return Err(DiscoveryError::Cancelled);
            }
        };

        let mut fragments: Vec<PersonRecord> = Vec::new();
        let mut strategy_used = None;
        let mut sources_used = Vec::new();
        let mut degraded_sources = Vec::new();
        let mut failures = Vec::new();

        for (source, outcome) in enabled.iter().copied().zip(outcomes) {
            match outcome {
                Ok(branch) => {
                    if source == PersonSource::Directory {
                        strategy_used = branch.strategy;
                    }
                    fragments.extend(branch.fragments);
                    sources_used.push(source);
                }
                Err(message) => {
                    warn!(source = %source, error = %message, "source degraded");
                    failures.push(format!("{source}: {message}"));
                    degraded_sources.push(source);
                }
            }
        }

        if sources_used.is_empty() {
            return Err(DiscoveryError::AllSourcesFailed(failures.join("; ")));
        }

        let now = Utc::now();
        let merged = merge_fragments(fragments, now);
        let total = merged.len();
        let mut records = self.ranker.rank(merged, query, now);
        records.truncate(limit);
        if !include_stats {
            for record in &mut records {
                record.stats = CommunicationStats::default();
            }
        }

        debug!(
            query,
            candidates = total,
            returned = records.len(),
            ?strategy_used,
            "discovery complete"
        );

        Ok(DiscoveryResult {
            records,
            metadata: DiscoveryMetadata {
                sources_used,
                degraded_sources,
                strategy_used,
                cache_hit: false,
            },
        })
    }

    /// One source branch. Failures come back as messages, never panics or
    /// early returns, so `join_all` always yields one outcome per source.
    async fn run_source(
        &self,
        source: PersonSource,
        query: &str,
        window_days: u32,
    ) -> std::result::Result<BranchOutput, String> {
        match source {
            PersonSource::Directory => self
                .directory
                .search(query)
                .await
                .map(|outcome| BranchOutput {
                    fragments: outcome.fragments,
                    strategy: outcome.strategy_used,
                })
                .map_err(|e| e.to_string()),
            PersonSource::PersonalContacts => self
                .contacts
                .collect(query)
                .await
                .map(BranchOutput::plain)
                .map_err(|e| e.to_string()),
            PersonSource::MessageHistory => self
                .history
                .collect_window(query, window_days)
                .await
                .map(BranchOutput::plain)
                .map_err(|e| e.to_string()),
        }
    }
}

struct BranchOutput {
    fragments: Vec<PersonRecord>,
    strategy: Option<SearchStrategy>,
}

impl BranchOutput {
    fn plain(fragments: Vec<PersonRecord>) -> Self {
        Self {
            fragments,
            strategy: None,
        }
    }
}

/// Collapse fragments sharing an identity key, preserving first-discovery
/// order. Fragments arrive highest-priority-source first, so the surviving
/// scalar fields follow source priority.
fn merge_fragments(
    fragments: Vec<PersonRecord>,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<PersonRecord> {
    let mut merged: Vec<PersonRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        match index.get(&fragment.identity_key) {
            Some(&at) => merged[at].merge(&fragment, now),
            None => {
                index.insert(fragment.identity_key.clone(), merged.len());
                merged.push(fragment);
            }
        }
    }

    for record in &mut merged {
        record.recompute_strength(now);
    }
    merged
}

fn discover_cache_key(
    query: &str,
    sources: &[PersonSource],
    include_stats: bool,
    window_days: u32,
    limit: usize,
) -> String {
    let source_tags: Vec<String> = sources.iter().map(ToString::to_string).collect();
    format!(
        "{}|{}|{}|{}|{}",
        query.to_lowercase(),
        source_tags.join(","),
        include_stats,
        window_days,
        limit
    )
}

fn map_cache_error(error: CacheError<DiscoveryError>) -> DiscoveryError {
    match error {
        CacheError::Compute(inner) => inner,
        CacheError::Shared(message) => DiscoveryError::CacheCompute(message),
        CacheError::LeaderVanished => {
            DiscoveryError::CacheCompute("concurrent computation abandoned".to_string())
        }
        CacheError::Serialization(error) => DiscoveryError::CacheCompute(error.to_string()),
    }
}
