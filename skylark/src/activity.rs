//! Activity handles.
//!
//! One internal batched shape serves both arities: the multi-user
//! handle returns the per-user [`Response`] unchanged, and the
//! single-user handle is a thin adapter that unwraps a one-element
//! response to the scalar, raising that user's captured error.

use std::sync::Arc;

use skylark_core::{Event, FeedConfig, FeedError, Response, UserId};
use skylark_store::{EventPage, EventPredicate, PageRequest, check_users};

use crate::feed::FeedInner;

/// Multi-user handle: every operation fans out to all bound users.
///
/// Stateless between calls; it holds only the feed's shared inner and
/// the user list, never cached feed state.
#[derive(Clone)]
pub struct Activity {
    inner: Arc<FeedInner>,
    users: Vec<UserId>,
}

impl Activity {
    pub(crate) fn new(inner: Arc<FeedInner>, users: Vec<UserId>) -> Result<Self, FeedError> {
        check_users(&users)?;
        Ok(Self { inner, users })
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    pub async fn store(&self, event: &Event) -> Result<Response<bool>, FeedError> {
        self.inner
            .provider
            .store(&self.inner.config, &self.users, event)
            .await
    }

    /// Store an event stamped with the current wall time.
    pub async fn store_value(&self, value: impl Into<String>) -> Result<Response<bool>, FeedError> {
        self.store(&Event::new(value)).await
    }

    pub async fn delete(&self, event: &Event) -> Result<Response<bool>, FeedError> {
        self.inner
            .provider
            .delete(&self.inner.config, &self.users, event)
            .await
    }

    pub async fn delete_if(
        &self,
        predicate: EventPredicate<'_>,
    ) -> Result<Response<usize>, FeedError> {
        self.inner
            .provider
            .delete_if(&self.inner.config, &self.users, predicate)
            .await
    }

    pub async fn wipe(&self) -> Result<Response<bool>, FeedError> {
        self.inner
            .provider
            .wipe(&self.inner.config, &self.users)
            .await
    }

    pub async fn paginate(&self, request: &PageRequest) -> Result<Response<EventPage>, FeedError> {
        self.inner
            .provider
            .paginate(&self.inner.config, &self.users, request)
            .await
    }

    pub async fn fetch(&self) -> Result<Response<Vec<Event>>, FeedError> {
        self.inner
            .provider
            .fetch(&self.inner.config, &self.users)
            .await
    }

    pub async fn fetch_since(&self, at: f64) -> Result<Response<Vec<Event>>, FeedError> {
        self.inner
            .provider
            .fetch_since(&self.inner.config, &self.users, at)
            .await
    }

    pub async fn reset_last_read(&self, at: Option<f64>) -> Result<Response<f64>, FeedError> {
        self.inner
            .provider
            .reset_last_read(&self.inner.config, &self.users, at)
            .await
    }

    pub async fn total_count(&self) -> Result<Response<usize>, FeedError> {
        self.inner
            .provider
            .total_count(&self.inner.config, &self.users)
            .await
    }

    pub async fn unread_count(&self) -> Result<Response<usize>, FeedError> {
        self.inner
            .provider
            .unread_count(&self.inner.config, &self.users)
            .await
    }

    pub async fn last_read(&self) -> Result<Response<f64>, FeedError> {
        self.inner
            .provider
            .last_read(&self.inner.config, &self.users)
            .await
    }
}

/// Single-user handle returning unwrapped scalars.
#[derive(Clone)]
pub struct UserActivity {
    activity: Activity,
}

impl UserActivity {
    pub(crate) fn new(inner: Arc<FeedInner>, user: UserId) -> Result<Self, FeedError> {
        Ok(Self {
            activity: Activity::new(inner, vec![user])?,
        })
    }

    pub fn user(&self) -> &UserId {
        &self.activity.users[0]
    }

    /// The batched view of this handle, for callers that want the
    /// response shape anyway.
    pub fn as_activity(&self) -> &Activity {
        &self.activity
    }

    fn unwrap<T>(&self, response: Response<T>) -> Result<T, FeedError> {
        response.into_value(self.user())
    }

    pub async fn store(&self, event: &Event) -> Result<bool, FeedError> {
        let response = self.activity.store(event).await?;
        self.unwrap(response)
    }

    pub async fn store_value(&self, value: impl Into<String>) -> Result<bool, FeedError> {
        let response = self.activity.store_value(value).await?;
        self.unwrap(response)
    }

    pub async fn delete(&self, event: &Event) -> Result<bool, FeedError> {
        let response = self.activity.delete(event).await?;
        self.unwrap(response)
    }

    pub async fn delete_if(&self, predicate: EventPredicate<'_>) -> Result<usize, FeedError> {
        let response = self.activity.delete_if(predicate).await?;
        self.unwrap(response)
    }

    pub async fn wipe(&self) -> Result<bool, FeedError> {
        let response = self.activity.wipe().await?;
        self.unwrap(response)
    }

    pub async fn paginate(&self, request: &PageRequest) -> Result<EventPage, FeedError> {
        let response = self.activity.paginate(request).await?;
        self.unwrap(response)
    }

    pub async fn fetch(&self) -> Result<Vec<Event>, FeedError> {
        let response = self.activity.fetch().await?;
        self.unwrap(response)
    }

    pub async fn fetch_since(&self, at: f64) -> Result<Vec<Event>, FeedError> {
        let response = self.activity.fetch_since(at).await?;
        self.unwrap(response)
    }

    pub async fn reset_last_read(&self, at: Option<f64>) -> Result<f64, FeedError> {
        let response = self.activity.reset_last_read(at).await?;
        self.unwrap(response)
    }

    pub async fn total_count(&self) -> Result<usize, FeedError> {
        let response = self.activity.total_count().await?;
        self.unwrap(response)
    }

    pub async fn unread_count(&self) -> Result<usize, FeedError> {
        let response = self.activity.unread_count().await?;
        self.unwrap(response)
    }

    pub async fn last_read(&self) -> Result<f64, FeedError> {
        let response = self.activity.last_read().await?;
        self.unwrap(response)
    }
}
