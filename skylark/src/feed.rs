//! Named feeds and their builder.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use skylark_core::{DEFAULT_MAX_SIZE, FeedConfig, FeedError, FeedName, UserId};
use skylark_store::FeedProvider;

use crate::activity::{Activity, UserActivity};
use crate::scope::Scope;

pub(crate) struct FeedInner {
    pub(crate) config: FeedConfig,
    pub(crate) provider: Arc<dyn FeedProvider>,
}

/// A configured feed: immutable configuration plus its provider.
///
/// Cheap to clone; all clones share the same inner state. Activity
/// handles borrow nothing from the feed beyond this shared inner, so
/// they can outlive the handle that produced them.
#[derive(Clone)]
pub struct Feed {
    inner: Arc<FeedInner>,
}

impl Feed {
    pub fn name(&self) -> &FeedName {
        &self.inner.config.name
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    pub fn provider(&self) -> &Arc<dyn FeedProvider> {
        &self.inner.provider
    }

    /// A multi-user activity handle over the given users.
    pub fn activity<I, U>(&self, users: I) -> Result<Activity, FeedError>
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Activity::new(
            self.inner.clone(),
            users.into_iter().map(Into::into).collect(),
        )
    }

    /// A single-user handle returning unwrapped scalars.
    pub fn activity_for(&self, user: impl Into<UserId>) -> Result<UserActivity, FeedError> {
        UserActivity::new(self.inner.clone(), user.into())
    }

    /// Run a callback with an activity and a named-data bundle in
    /// scope. The callback may return a future to await.
    pub fn with_activity<I, U, R, F>(
        &self,
        users: I,
        bindings: IndexMap<String, Value>,
        callback: F,
    ) -> Result<R, FeedError>
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
        F: FnOnce(Scope) -> R,
    {
        let activity = self.activity(users)?;
        Ok(callback(Scope::new(activity, bindings)))
    }
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builder for one feed definition.
///
/// Every option may be assigned at most once per definition; a repeat
/// assignment is a configuration error reported at build time. Unset
/// options fall back to the documented defaults, except `max_size`,
/// which follows an explicitly-set `per_page` at ten pages of history.
pub struct FeedBuilder {
    name: FeedName,
    provider: Option<Arc<dyn FeedProvider>>,
    namespace: Option<String>,
    per_page: Option<usize>,
    batch_size: Option<usize>,
    max_size: Option<usize>,
    op_timeout: Option<Duration>,
    duplicate: Option<&'static str>,
}

impl FeedBuilder {
    pub fn new(name: impl Into<FeedName>) -> Self {
        Self {
            name: name.into(),
            provider: None,
            namespace: None,
            per_page: None,
            batch_size: None,
            max_size: None,
            op_timeout: None,
            duplicate: None,
        }
    }

    fn mark_duplicate(&mut self, option: &'static str) {
        if self.duplicate.is_none() {
            self.duplicate = Some(option);
        }
    }

    pub fn provider(mut self, provider: Arc<dyn FeedProvider>) -> Self {
        if self.provider.is_some() {
            self.mark_duplicate("provider");
        }
        self.provider = Some(provider);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        if self.namespace.is_some() {
            self.mark_duplicate("namespace");
        }
        self.namespace = Some(namespace.into());
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        if self.per_page.is_some() {
            self.mark_duplicate("per_page");
        }
        self.per_page = Some(per_page);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        if self.batch_size.is_some() {
            self.mark_duplicate("batch_size");
        }
        self.batch_size = Some(batch_size);
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        if self.max_size.is_some() {
            self.mark_duplicate("max_size");
        }
        self.max_size = Some(max_size);
        self
    }

    pub fn op_timeout(mut self, op_timeout: Duration) -> Self {
        if self.op_timeout.is_some() {
            self.mark_duplicate("op_timeout");
        }
        self.op_timeout = Some(op_timeout);
        self
    }

    pub fn build(self) -> Result<Feed, FeedError> {
        if let Some(option) = self.duplicate {
            return Err(FeedError::config(format!(
                "option '{option}' assigned more than once for feed '{}'",
                self.name
            )));
        }
        let provider = self
            .provider
            .ok_or_else(|| FeedError::config(format!("feed '{}' requires a provider", self.name)))?;

        let mut config = FeedConfig::new(self.name);
        config.namespace = self.namespace;
        if let Some(per_page) = self.per_page {
            config.per_page = per_page;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        config.max_size = match (self.max_size, self.per_page) {
            (Some(max_size), _) => max_size,
            (None, Some(per_page)) => per_page.saturating_mul(10),
            (None, None) => DEFAULT_MAX_SIZE,
        };
        if let Some(op_timeout) = self.op_timeout {
            config.op_timeout = op_timeout;
        }
        config.validate()?;

        Ok(Feed {
            inner: Arc::new(FeedInner { config, provider }),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use skylark_store::MemoryProvider;

    fn provider() -> Arc<dyn FeedProvider> {
        Arc::new(MemoryProvider::new())
    }

    #[test]
    fn test_builder_defaults() {
        let feed = FeedBuilder::new("news").provider(provider()).build().unwrap();
        assert_eq!(feed.config().per_page, 50);
        assert_eq!(feed.config().batch_size, 10);
        assert_eq!(feed.config().max_size, 1000);
    }

    #[test]
    fn test_max_size_follows_explicit_per_page() {
        let feed = FeedBuilder::new("news")
            .provider(provider())
            .per_page(2)
            .build()
            .unwrap();
        assert_eq!(feed.config().max_size, 20);

        let feed = FeedBuilder::new("news")
            .provider(provider())
            .per_page(2)
            .max_size(7)
            .build()
            .unwrap();
        assert_eq!(feed.config().max_size, 7);
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let result = FeedBuilder::new("news")
            .provider(provider())
            .per_page(50)
            .per_page(2)
            .build();
        match result {
            Err(FeedError::Config { message }) => assert!(message.contains("per_page")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_provider_rejected() {
        assert!(matches!(
            FeedBuilder::new("news").build(),
            Err(FeedError::Config { .. })
        ));
    }
}
