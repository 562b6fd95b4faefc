//! Base template set (artifact regeneration).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::RuntimeState;
use crate::ruleset::{fetch_origin, Fetcher, Origin};

/// Target name → template text, replaced as a whole on regeneration.
pub struct TemplateSet {
    current: ArcSwap<BTreeMap<String, Arc<str>>>,
    regenerations: AtomicU64,
    fetcher: Arc<dyn Fetcher>,
}

impl TemplateSet {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            current: ArcSwap::from_pointee(BTreeMap::new()),
            regenerations: AtomicU64::new(0),
            fetcher,
        }
    }

    /// Reload every `[templates]` entry of `state`. Unreadable entries are skipped.
    pub async fn regenerate(&self, state: &RuntimeState) {
        let mut loaded = BTreeMap::new();

        for (target, locator) in &state.preferences.templates {
            let origin = match Origin::parse(locator) {
                Ok(origin) => origin,
                Err(e) => {
                    tracing::warn!(template = %target, error = %e, "Invalid template locator");
                    continue;
                }
            };
            match fetch_origin(self.fetcher.as_ref(), &origin).await {
                Ok(text) => {
                    loaded.insert(target.clone(), Arc::from(text));
                }
                Err(e) => {
                    tracing::warn!(template = %target, error = %e, "Failed to load base template");
                }
            }
        }

        let count = loaded.len();
        self.current.store(Arc::new(loaded));
        let n = self.regenerations.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(templates = count, regeneration = n, "Base templates regenerated");
    }

    pub fn get(&self, target: &str) -> Option<Arc<str>> {
        self.current.load().get(target).cloned()
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<String, Arc<str>>> {
        self.current.load_full()
    }

    /// Number of completed regenerations.
    pub fn regenerations(&self) -> u64 {
        self.regenerations.load(Ordering::Relaxed)
    }
}
