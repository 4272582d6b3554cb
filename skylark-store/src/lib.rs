//! skylark-store - Provider contract for Skylark activity feeds
//!
//! This crate defines the batched operation set every backing store must
//! honor, plus the in-process reference provider used for tests and small
//! deployments.

pub mod batch;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use skylark_core::{Event, FeedConfig, FeedError, Response, UserId};

pub use memory::MemoryProvider;

/// Predicate handed to [`FeedProvider::delete_if`], invoked once per
/// (user, event) pair.
pub type EventPredicate<'a> = &'a (dyn Fn(&UserId, &Event) -> bool + Send + Sync);

/// Parameters of one paginated read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,
    /// Page length override; feed `per_page` when unset.
    pub per_page: Option<usize>,
    /// When true, the read leaves `last_read` untouched.
    pub peek: bool,
    /// When true, each page carries the user's total event count.
    pub with_total: bool,
}

impl PageRequest {
    pub fn new(page: usize) -> Self {
        Self {
            page,
            per_page: None,
            peek: false,
            with_total: false,
        }
    }

    pub fn peek(mut self) -> Self {
        self.peek = true;
        self
    }

    pub fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        if self.page == 0 {
            return Err(FeedError::argument("page numbers start at 1"));
        }
        if self.per_page == Some(0) {
            return Err(FeedError::argument("per_page must be positive"));
        }
        Ok(())
    }

    /// Effective page length under the given feed configuration.
    pub fn effective_per_page(&self, config: &FeedConfig) -> usize {
        self.per_page.unwrap_or(config.per_page)
    }
}

/// One page of a user's feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events in the page window, newest first. Empty past the last page.
    pub events: Vec<Event>,
    /// Total event count, present when the request asked for it.
    pub total: Option<usize>,
}

/// Abstraction over feed storage backends.
///
/// Every operation is batched: it takes a list of user identifiers and
/// returns a per-user [`Response`]. Argument and configuration problems
/// are returned as `Err` before any work starts; per-user operational
/// failures are captured inside the `Response` so sibling users are
/// unaffected. Single-user ergonomics live above this trait, in the
/// activity handle.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Insert `event` into each user's feed. `true` means newly
    /// inserted; a duplicate value leaves the existing score untouched
    /// and returns `false`. Insertion and capacity trimming are atomic
    /// per user with respect to subsequent reads.
    async fn store(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError>;

    /// Remove the event matching `event.value()`. Idempotent: absent
    /// values report `false`.
    async fn delete(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError>;

    /// Remove every event the predicate selects, returning the count
    /// removed per user.
    async fn delete_if(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        predicate: EventPredicate<'_>,
    ) -> Result<Response<usize>, FeedError>;

    /// Reset a user's state to freshly-created. `true` when prior state
    /// existed.
    async fn wipe(&self, config: &FeedConfig, users: &[UserId])
    -> Result<Response<bool>, FeedError>;

    /// Read one page, newest first. Unless the request peeks, advances
    /// `last_read` to the newest timestamp in the returned slice.
    async fn paginate(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        request: &PageRequest,
    ) -> Result<Response<EventPage>, FeedError>;

    /// All events for each user, newest first.
    async fn fetch(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<Vec<Event>>, FeedError>;

    /// Events strictly newer than `at`, newest first.
    async fn fetch_since(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        at: f64,
    ) -> Result<Response<Vec<Event>>, FeedError>;

    /// Move the unread watermark to `at` (current time when `None`).
    /// The watermark never decreases; the reply is the effective value.
    async fn reset_last_read(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        at: Option<f64>,
    ) -> Result<Response<f64>, FeedError>;

    async fn total_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError>;

    /// Number of events with `at` strictly above the watermark.
    async fn unread_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError>;

    async fn last_read(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<f64>, FeedError>;
}

/// Entry-point validation shared by providers: a batched call needs at
/// least one user and every id must be addressable.
pub fn check_users(users: &[UserId]) -> Result<(), FeedError> {
    if users.is_empty() {
        return Err(FeedError::argument("user list must not be empty"));
    }
    if users.iter().any(UserId::is_empty) {
        return Err(FeedError::argument("user ids must not be empty"));
    }
    Ok(())
}
