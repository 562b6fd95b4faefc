//! Generation-tagged ruleset cache.
//!
//! # Responsibilities
//! - Fetch every configured source in one refresh pass
//! - Record per-source failures without aborting the pass
//! - Publish the whole result as a new generation with one atomic swap
//!
//! # Design Decisions
//! - Readers get an `Arc<Generation>` from `ArcSwap`; they never wait on a
//!   refresh and never see a half-built sequence
//! - Refreshes queue on an async mutex (single-flight, never rejected)
//! - Generation ids only grow, so a published generation is never replaced
//!   by an older one

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::ruleset::fetch::{fetch_origin, Fetcher};
use crate::ruleset::source::RulesetSource;

/// Fetched content for one source.
#[derive(Debug, Clone)]
pub struct RulesetContent {
    pub source: RulesetSource,
    /// Raw text; `None` when the fetch failed.
    pub body: Option<Arc<str>>,
    pub fetched_at: SystemTime,
    pub fetch_error: Option<String>,
}

impl RulesetContent {
    /// Rule lines with comments, blanks and Clash list syntax removed.
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        let clash = self.source.kind.is_clash();
        self.body
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| {
                !line.is_empty()
                    && !line.starts_with('#')
                    && !line.starts_with("//")
                    && !line.starts_with(';')
                    && *line != "payload:"
            })
            .map(move |line| {
                if clash {
                    line.trim_start_matches('-')
                        .trim()
                        .trim_matches(|c| c == '\'' || c == '"')
                } else {
                    line
                }
            })
    }
}

/// One complete, internally consistent snapshot.
#[derive(Debug, Default)]
pub struct Generation {
    id: u64,
    contents: Vec<RulesetContent>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn contents(&self) -> &[RulesetContent] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Entries for `tag`, in configuration order.
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a RulesetContent> {
        self.contents.iter().filter(move |c| c.source.tag == tag)
    }

    pub fn failed_count(&self) -> usize {
        self.contents.iter().filter(|c| c.fetch_error.is_some()).count()
    }
}

/// Owner of the current ruleset generation.
pub struct RulesetStore {
    current: ArcSwap<Generation>,
    refresh_lock: Mutex<()>,
    fetcher: Arc<dyn Fetcher>,
}

impl RulesetStore {
    /// An empty store at generation 0.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Generation::default()),
            refresh_lock: Mutex::new(()),
            fetcher,
        }
    }

    /// The currently published generation.
    pub fn read(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// Fetch all `sources` and publish them as the next generation.
    ///
    /// Waits for any refresh already in progress before starting.
    pub async fn refresh(&self, sources: &[RulesetSource]) -> Arc<Generation> {
        let _pass = self.refresh_lock.lock().await;
        let start = Instant::now();

        let contents = join_all(sources.iter().map(|source| self.fetch_one(source))).await;
        let generation = Arc::new(Generation {
            id: self.current.load().id + 1,
            contents,
        });
        self.current.store(Arc::clone(&generation));

        let failed = generation.failed_count();
        tracing::info!(
            generation = generation.id,
            total = generation.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rulesets refreshed"
        );
        metrics::record_ruleset_refresh(generation.len(), failed, start);

        generation
    }

    async fn fetch_one(&self, source: &RulesetSource) -> RulesetContent {
        let result = fetch_origin(self.fetcher.as_ref(), &source.origin).await;
        let fetched_at = SystemTime::now();

        match result {
            Ok(body) => RulesetContent {
                source: source.clone(),
                body: Some(Arc::from(body)),
                fetched_at,
                fetch_error: None,
            },
            Err(e) => {
                tracing::warn!(
                    tag = %source.tag,
                    origin = %source.origin,
                    error = %e,
                    "Failed to fetch ruleset"
                );
                RulesetContent {
                    source: source.clone(),
                    body: None,
                    fetched_at,
                    fetch_error: Some(e.to_string()),
                }
            }
        }
    }
}
