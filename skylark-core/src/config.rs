//! Feed configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FeedError;
use crate::types::FeedName;

pub const DEFAULT_PER_PAGE: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_SIZE: usize = 1000;
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable configuration of one named feed.
///
/// Built once at registration time and shared by reference afterwards.
/// Providers receive it on every call; it carries everything a provider
/// needs to address and bound a user's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Registered feed name; part of every backing key.
    pub name: FeedName,
    /// Optional keyspace prefix allowing feeds to coexist in one keyspace.
    pub namespace: Option<String>,
    /// Default page length for paginated reads.
    pub per_page: usize,
    /// Upper bound on users dispatched together on one connection.
    pub batch_size: usize,
    /// Per-user hard cap on event count; oldest entries trim on overflow.
    pub max_size: usize,
    /// Overall deadline for one batched call.
    pub op_timeout: Duration,
}

impl FeedConfig {
    /// A configuration with the documented defaults for the given name.
    pub fn new(name: impl Into<FeedName>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            per_page: DEFAULT_PER_PAGE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        if self.name.as_str().is_empty() {
            return Err(FeedError::config("feed name must not be empty"));
        }
        if self.per_page == 0 {
            return Err(FeedError::config("per_page must be positive"));
        }
        if self.batch_size == 0 {
            return Err(FeedError::config("batch_size must be positive"));
        }
        if self.max_size == 0 {
            return Err(FeedError::config("max_size must be positive"));
        }
        if let Some(ns) = &self.namespace
            && ns.is_empty()
        {
            return Err(FeedError::config("namespace must not be empty when set"));
        }
        Ok(())
    }

    /// Key prefix identifying this feed's slice of a shared keyspace:
    /// `<namespace>|<name>` or `<name>` when no namespace is set.
    pub fn key_prefix(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}|{}", self.name),
            None => self.name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedConfig::new("news");
        assert_eq!(config.per_page, 50);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.op_timeout, Duration::from_secs(5));
        assert!(config.namespace.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_prefix() {
        let mut config = FeedConfig::new("news");
        assert_eq!(config.key_prefix(), "news");
        config.namespace = Some("prod".to_string());
        assert_eq!(config.key_prefix(), "prod|news");
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let mut config = FeedConfig::new("news");
        config.per_page = 0;
        assert!(config.validate().is_err());

        let mut config = FeedConfig::new("news");
        config.max_size = 0;
        assert!(config.validate().is_err());

        let mut config = FeedConfig::new("news");
        config.namespace = Some(String::new());
        assert!(config.validate().is_err());
    }
}
