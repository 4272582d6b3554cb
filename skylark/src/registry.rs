//! Feed registry.
//!
//! A registry maps feed names to built feeds. Library APIs take an
//! explicit registry; the process-wide default exists as a convenience
//! façade that delegates to one shared instance.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use skylark_core::{FeedError, FeedName};

use crate::feed::{Feed, FeedBuilder};

/// Mapping from feed name to immutable feed definition.
#[derive(Default)]
pub struct FeedRegistry {
    feeds: RwLock<HashMap<FeedName, Feed>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed. Registering the same name again is idempotent
    /// for an identical definition and an error for a different one.
    pub fn define(&self, builder: FeedBuilder) -> Result<Feed, FeedError> {
        let feed = builder.build()?;
        let mut feeds = self.feeds.write().unwrap_or_else(|e| e.into_inner());
        match feeds.get(feed.name()) {
            Some(existing) => {
                let same_provider = Arc::ptr_eq(existing.provider(), feed.provider());
                if same_provider && existing.config() == feed.config() {
                    Ok(existing.clone())
                } else {
                    Err(FeedError::config(format!(
                        "feed '{}' is already defined with a different configuration",
                        feed.name()
                    )))
                }
            }
            None => {
                feeds.insert(feed.name().clone(), feed.clone());
                Ok(feed)
            }
        }
    }

    pub fn get(&self, name: &FeedName) -> Option<Feed> {
        self.feeds
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &FeedName) -> bool {
        self.feeds
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    pub fn names(&self) -> Vec<FeedName> {
        let mut names: Vec<FeedName> = self
            .feeds
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// The process-wide registry backing [`crate::define`] and
/// [`crate::feed`]. Lives until process exit.
pub fn default_registry() -> &'static FeedRegistry {
    static DEFAULT: OnceLock<FeedRegistry> = OnceLock::new();
    DEFAULT.get_or_init(FeedRegistry::new)
}
