//! Batch dispatch helpers shared by providers.
//!
//! A batched call partitions its user list into groups of at most
//! `batch_size`, preserving input order, and carries one overall
//! deadline. How groups run (sequentially under per-user locks, or
//! concurrently on pooled connections) is the provider's business.

use std::time::{Duration, Instant};

use skylark_core::{FeedError, UserId};

/// Partition a user list into dispatch groups.
pub fn groups(users: &[UserId], batch_size: usize) -> std::slice::Chunks<'_, UserId> {
    users.chunks(batch_size.max(1))
}

/// Deadline of one batched call.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn starting_now(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// The timeout error surfaced for users whose sub-operation did not
    /// complete in time.
    pub fn error(&self) -> FeedError {
        FeedError::timeout(self.started.elapsed().as_millis() as u64)
    }
}
