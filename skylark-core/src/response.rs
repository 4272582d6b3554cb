//! Per-user result container for multi-user calls.

use indexmap::IndexMap;

use crate::error::FeedError;
use crate::types::UserId;

/// Result of one batched operation, keyed by user id.
///
/// Entries iterate in the order of the input user list. A failure for
/// one user never disturbs its siblings; each entry independently holds
/// either the operation's value or the captured error.
#[derive(Debug, Clone)]
pub struct Response<T> {
    entries: IndexMap<UserId, Result<T, FeedError>>,
}

impl<T> Response<T> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Record one user's outcome. Last write wins for a repeated id.
    pub fn insert(&mut self, user: UserId, result: Result<T, FeedError>) {
        self.entries.insert(user, result);
    }

    pub fn get(&self, user: &UserId) -> Option<&Result<T, FeedError>> {
        self.entries.get(user)
    }

    /// The success value for a user, or the captured error.
    ///
    /// Asking for a user that was not part of the call is an argument
    /// error, not a silent `None`.
    pub fn value(&self, user: &UserId) -> Result<&T, FeedError> {
        match self.entries.get(user) {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FeedError::argument(format!(
                "user '{user}' was not part of this call"
            ))),
        }
    }

    /// Consume the response, extracting one user's outcome.
    pub fn into_value(mut self, user: &UserId) -> Result<T, FeedError> {
        match self.entries.swap_remove(user) {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err),
            None => Err(FeedError::argument(format!(
                "user '{user}' was not part of this call"
            ))),
        }
    }

    /// Entries in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &Result<T, FeedError>)> {
        self.entries.iter()
    }

    /// User ids in input order.
    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.entries.keys()
    }

    /// Successful entries only, in input order.
    pub fn values(&self) -> impl Iterator<Item = (&UserId, &T)> {
        self.entries
            .iter()
            .filter_map(|(user, result)| result.as_ref().ok().map(|value| (user, value)))
    }

    /// Failed entries only, in input order.
    pub fn errors(&self) -> impl Iterator<Item = (&UserId, &FeedError)> {
        self.entries
            .iter()
            .filter_map(|(user, result)| result.as_ref().err().map(|err| (user, err)))
    }

    pub fn has_errors(&self) -> bool {
        self.entries.values().any(|result| result.is_err())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for Response<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a == b)
    }
}

impl<T> FromIterator<(UserId, Result<T, FeedError>)> for Response<T> {
    fn from_iter<I: IntoIterator<Item = (UserId, Result<T, FeedError>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Response<T> {
    type Item = (UserId, Result<T, FeedError>);
    type IntoIter = indexmap::map::IntoIter<UserId, Result<T, FeedError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
