//! Fallback directory search.
//!
//! Strategies run strictly in order — exact, partial, domain, fuzzy — and
//! the chain stops at the first one that yields entries. The domain step is
//! attempted only for queries containing `'@'`. A step that errors or times
//! out is logged and treated as empty so the chain can continue; the whole
//! search fails only when every attempted step failed.

use crate::clients::{ClientError, DirectoryClient, DirectoryEntry};
use crate::matching;
use rolodex_model::{PersonRecord, PersonSource, SearchStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What the strategy chain produced.
#[derive(Debug, Default)]
pub struct DirectorySearchOutcome {
    /// Unmerged per-entry person fragments, in directory order
    pub fragments: Vec<PersonRecord>,
    /// The strategy that produced them; `None` when the chain was exhausted
    pub strategy_used: Option<SearchStrategy>,
}

/// Runs the four-strategy chain against a [`DirectoryClient`].
pub struct DirectorySearchAdapter {
    client: Arc<dyn DirectoryClient>,
    max_results: usize,
    call_timeout: Duration,
    fuzzy_threshold: f64,
}

enum StepResult {
    Entries(Vec<DirectoryEntry>),
    Failed(String),
}

impl DirectorySearchAdapter {
    /// Create an adapter over the given client.
    #[must_use]
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        max_results: usize,
        call_timeout: Duration,
        fuzzy_threshold: f64,
    ) -> Self {
        Self {
            client,
            max_results,
            call_timeout,
            fuzzy_threshold,
        }
    }

    /// Run the chain for `query`.
    ///
    /// `Ok` with an empty outcome means the directory genuinely has nothing;
    /// `Err` means every step that applied to this query failed.
    pub async fn search(&self, query: &str) -> Result<DirectorySearchOutcome, ClientError> {
        let mut attempted = 0_u32;
        let mut failures: Vec<String> = Vec::new();

        let mut strategy = Some(SearchStrategy::Exact);
        while let Some(current) = strategy {
            match self.run_step(current, query).await {
                StepResult::Entries(entries) if !entries.is_empty() => {
                    debug!(
                        strategy = %current,
                        count = entries.len(),
                        "directory strategy matched"
                    );
                    return Ok(DirectorySearchOutcome {
                        fragments: self.to_fragments(entries, current),
                        strategy_used: Some(current),
                    });
                }
                StepResult::Entries(_) => {
                    attempted += 1;
                }
                StepResult::Failed(message) => {
                    attempted += 1;
                    warn!(strategy = %current, error = %message, "directory strategy failed");
                    failures.push(format!("{current}: {message}"));
                }
            }
            strategy = next_strategy(current, query);
        }

        if attempted > 0 && failures.len() as u32 == attempted {
            return Err(ClientError::Transport(failures.join("; ")));
        }

        debug!(query, "directory strategies exhausted without a match");
        Ok(DirectorySearchOutcome::default())
    }

    async fn run_step(&self, strategy: SearchStrategy, query: &str) -> StepResult {
        let call = async {
            match strategy {
                SearchStrategy::Exact => self.client.resolve_exact(query).await,
                SearchStrategy::Partial => self.client.resolve_partial(query).await,
                // Only reachable when the query has a domain part; the chain
                // skips this state otherwise.
                SearchStrategy::Domain => match query_domain(query) {
                    Some(domain) => {
                        let entries = self.client.resolve_domain(domain).await?;
                        Ok(retain_domain(entries, domain))
                    }
                    None => Ok(Vec::new()),
                },
                SearchStrategy::Fuzzy => {
                    let candidates = self.client.resolve_fuzzy(query).await?;
                    Ok(self.retain_similar(candidates, query))
                }
            }
        };

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(mut entries)) => {
                entries.truncate(self.max_results);
                StepResult::Entries(entries)
            }
            Ok(Err(error)) => StepResult::Failed(error.to_string()),
            Err(_) => StepResult::Failed(ClientError::Timeout.to_string()),
        }
    }

    /// Keep fuzzy candidates at or above the similarity threshold, best
    /// first.
    fn retain_similar(
        &self,
        candidates: Vec<DirectoryEntry>,
        query: &str,
    ) -> Vec<DirectoryEntry> {
        let mut scored: Vec<(f64, DirectoryEntry)> = candidates
            .into_iter()
            .filter_map(|entry| {
                let sim =
                    matching::fuzzy_similarity(query, &entry.display_name, Some(&entry.address));
                (sim >= self.fuzzy_threshold).then_some((sim, entry))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, entry)| entry).collect()
    }

    fn to_fragments(
        &self,
        entries: Vec<DirectoryEntry>,
        strategy: SearchStrategy,
    ) -> Vec<PersonRecord> {
        entries
            .into_iter()
            .map(|entry| {
                let mut record = PersonRecord::new(
                    &entry.display_name,
                    Some(&entry.address),
                    PersonSource::Directory,
                );
                record.organization = entry.organization;
                record.department = entry.department;
                record.job_title = entry.job_title;
                record.office_location = entry.office_location;
                for phone in entry.phone_numbers {
                    record.add_phone(phone);
                }
                record.matched_strategy = Some(strategy);
                record
            })
            .collect()
    }
}

fn next_strategy(current: SearchStrategy, query: &str) -> Option<SearchStrategy> {
    match current {
        SearchStrategy::Exact => Some(SearchStrategy::Partial),
        SearchStrategy::Partial => {
            if query_domain(query).is_some() {
                Some(SearchStrategy::Domain)
            } else {
                Some(SearchStrategy::Fuzzy)
            }
        }
        SearchStrategy::Domain => Some(SearchStrategy::Fuzzy),
        SearchStrategy::Fuzzy => None,
    }
}

/// The domain part of an address-shaped query, if any.
fn query_domain(query: &str) -> Option<&str> {
    let (_, domain) = query.rsplit_once('@')?;
    (!domain.is_empty()).then_some(domain)
}

/// Drop entries whose address is outside `domain`.
fn retain_domain(entries: Vec<DirectoryEntry>, domain: &str) -> Vec<DirectoryEntry> {
    let suffix = format!("@{}", domain.to_lowercase());
    entries
        .into_iter()
        .filter(|entry| entry.address.to_lowercase().ends_with(&suffix))
        .collect()
}
