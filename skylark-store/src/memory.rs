//! In-process reference provider.
//!
//! State lives in an ordered-by-score structure per user, guarded by a
//! per-user mutex; the outer map lock is only ever held long enough to
//! clone the per-user handle. Groups are processed sequentially, so the
//! batched semantics stay easy to reason about in tests.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use skylark_core::{Event, FeedConfig, FeedError, Response, UserId, time};

use crate::batch::{Deadline, groups};
use crate::{EventPage, EventPredicate, FeedProvider, PageRequest, check_users};

pub mod dump;

/// Ranking key: feed order is newest first, ties broken by value
/// descending. The maximum key is therefore the trim victim (lowest
/// timestamp, smallest value among ties).
#[derive(Debug, Clone)]
struct EventKey {
    at: f64,
    value: String,
}

impl EventKey {
    fn of(event: &Event) -> Self {
        Self {
            at: event.at(),
            value: event.value().to_string(),
        }
    }

    fn to_event(&self) -> Event {
        Event::with_at(self.value.clone(), self.at)
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.value.cmp(&self.value))
    }
}

/// One user's feed state: the ordered event set plus the unread
/// watermark.
#[derive(Debug, Default)]
struct UserFeedState {
    by_value: HashMap<String, f64>,
    ordered: BTreeSet<EventKey>,
    last_read: f64,
}

impl UserFeedState {
    /// Insert-if-absent plus capacity trim, as one step.
    fn insert(&mut self, event: &Event, max_size: usize) -> bool {
        if self.by_value.contains_key(event.value()) {
            return false;
        }
        self.by_value
            .insert(event.value().to_string(), event.at());
        self.ordered.insert(EventKey::of(event));
        if self.ordered.len() > max_size
            && let Some(victim) = self.ordered.pop_last()
        {
            self.by_value.remove(&victim.value);
        }
        true
    }

    fn remove(&mut self, value: &str) -> bool {
        match self.by_value.remove(value) {
            Some(at) => {
                self.ordered.remove(&EventKey {
                    at,
                    value: value.to_string(),
                });
                true
            }
            None => false,
        }
    }

    fn remove_if(&mut self, user: &UserId, predicate: EventPredicate<'_>) -> usize {
        let victims: Vec<EventKey> = self
            .ordered
            .iter()
            .filter(|key| predicate(user, &key.to_event()))
            .cloned()
            .collect();
        for key in &victims {
            self.by_value.remove(&key.value);
            self.ordered.remove(key);
        }
        victims.len()
    }

    fn events(&self) -> Vec<Event> {
        self.ordered.iter().map(EventKey::to_event).collect()
    }

    fn events_since(&self, at: f64) -> Vec<Event> {
        // Ordered newest-first, so newer-than-`at` is a prefix.
        self.ordered
            .iter()
            .take_while(|key| key.at > at)
            .map(EventKey::to_event)
            .collect()
    }

    fn page(&self, page: usize, per_page: usize) -> Vec<Event> {
        self.ordered
            .iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .map(EventKey::to_event)
            .collect()
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn unread(&self) -> usize {
        self.ordered
            .iter()
            .take_while(|key| key.at > self.last_read)
            .count()
    }

    /// Monotonic watermark advance; returns the effective value.
    fn advance_last_read(&mut self, candidate: f64) -> f64 {
        if candidate > self.last_read {
            self.last_read = candidate;
        }
        self.last_read
    }
}

type StateHandle = Arc<Mutex<UserFeedState>>;
type StateKey = (String, UserId);

/// In-memory feed provider.
///
/// One instance can back any number of feeds; state identity is
/// (key prefix, user id), matching the remote provider's keyspace
/// identity rule.
#[derive(Default)]
pub struct MemoryProvider {
    states: RwLock<HashMap<StateKey, StateHandle>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(config: &FeedConfig, user: &UserId) -> StateKey {
        (config.key_prefix(), user.clone())
    }

    /// Handle for an existing user, without creating state.
    async fn existing(&self, config: &FeedConfig, user: &UserId) -> Option<StateHandle> {
        self.states
            .read()
            .await
            .get(&Self::key(config, user))
            .cloned()
    }

    /// Handle for a user, creating fresh state on first write.
    async fn ensure(&self, config: &FeedConfig, user: &UserId) -> StateHandle {
        let mut states = self.states.write().await;
        states
            .entry(Self::key(config, user))
            .or_default()
            .clone()
    }
}

#[async_trait]
impl FeedProvider for MemoryProvider {
    async fn store(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let handle = self.ensure(config, user).await;
                let inserted = handle.lock().await.insert(event, config.max_size);
                response.insert(user.clone(), Ok(inserted));
            }
        }
        Ok(response)
    }

    async fn delete(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let removed = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.remove(event.value()),
                    None => false,
                };
                response.insert(user.clone(), Ok(removed));
            }
        }
        Ok(response)
    }

    async fn delete_if(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        predicate: EventPredicate<'_>,
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let removed = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.remove_if(user, predicate),
                    None => 0,
                };
                response.insert(user.clone(), Ok(removed));
            }
        }
        Ok(response)
    }

    async fn wipe(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let existed = self
                    .states
                    .write()
                    .await
                    .remove(&Self::key(config, user))
                    .is_some();
                response.insert(user.clone(), Ok(existed));
            }
        }
        Ok(response)
    }

    async fn paginate(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        request: &PageRequest,
    ) -> Result<Response<EventPage>, FeedError> {
        check_users(users)?;
        request.validate()?;
        let per_page = request.effective_per_page(config);
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let page = match self.existing(config, user).await {
                    Some(handle) => {
                        let mut state = handle.lock().await;
                        let events = state.page(request.page, per_page);
                        if !request.peek
                            && let Some(newest) = events.first()
                        {
                            state.advance_last_read(newest.at());
                        }
                        EventPage {
                            events,
                            total: request.with_total.then(|| state.len()),
                        }
                    }
                    None => EventPage {
                        events: Vec::new(),
                        total: request.with_total.then_some(0),
                    },
                };
                response.insert(user.clone(), Ok(page));
            }
        }
        Ok(response)
    }

    async fn fetch(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<Vec<Event>>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let events = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.events(),
                    None => Vec::new(),
                };
                response.insert(user.clone(), Ok(events));
            }
        }
        Ok(response)
    }

    async fn fetch_since(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        at: f64,
    ) -> Result<Response<Vec<Event>>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let events = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.events_since(at),
                    None => Vec::new(),
                };
                response.insert(user.clone(), Ok(events));
            }
        }
        Ok(response)
    }

    async fn reset_last_read(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        at: Option<f64>,
    ) -> Result<Response<f64>, FeedError> {
        check_users(users)?;
        let candidate = at.unwrap_or_else(time::unix_now);
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let handle = self.ensure(config, user).await;
                let effective = handle.lock().await.advance_last_read(candidate);
                response.insert(user.clone(), Ok(effective));
            }
        }
        Ok(response)
    }

    async fn total_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let count = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.len(),
                    None => 0,
                };
                response.insert(user.clone(), Ok(count));
            }
        }
        Ok(response)
    }

    async fn unread_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let count = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.unread(),
                    None => 0,
                };
                response.insert(user.clone(), Ok(count));
            }
        }
        Ok(response)
    }

    async fn last_read(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<f64>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let mut response = Response::with_capacity(users.len());
        for group in groups(users, config.batch_size) {
            for user in group {
                if deadline.expired() {
                    response.insert(user.clone(), Err(deadline.error()));
                    continue;
                }
                let watermark = match self.existing(config, user).await {
                    Some(handle) => handle.lock().await.last_read,
                    None => 0.0,
                };
                response.insert(user.clone(), Ok(watermark));
            }
        }
        Ok(response)
    }
}
