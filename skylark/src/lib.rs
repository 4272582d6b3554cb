//! Skylark - per-user activity feeds
//!
//! Each user owns a bounded, reverse-chronological list of small events
//! with an unread watermark. Feeds are registered once with a provider
//! and paging policy; activity handles then run single- or multi-user
//! operations against the backing store.
//!
//! # Quick start
//!
//! ```text
//! use skylark::{Event, FeedBuilder, MemoryProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = skylark::define(
//!         FeedBuilder::new("news")
//!             .provider(Arc::new(MemoryProvider::new()))
//!             .per_page(25),
//!     )?;
//!
//!     let me = feed.activity_for(1u64)?;
//!     me.store(&Event::new("welcome!")).await?;
//!     println!("{} unread", me.unread_count().await?);
//!     Ok(())
//! }
//! ```

mod activity;
mod feed;
mod registry;
mod scope;

pub use activity::{Activity, UserActivity};
pub use feed::{Feed, FeedBuilder};
pub use registry::{FeedRegistry, default_registry};
pub use scope::Scope;

// Core types
pub use skylark_core::{Event, FeedConfig, FeedError, FeedName, Response, UserId};

// Provider contract and the reference provider
pub use skylark_store::{EventPage, FeedProvider, MemoryProvider, PageRequest};

// Production provider
pub use skylark_redis::{ConnectionPool, PoolConfig, RedisProvider, RetryPolicy};

/// Register a feed in the process-wide default registry.
pub fn define(builder: FeedBuilder) -> Result<Feed, FeedError> {
    default_registry().define(builder)
}

/// Look up a feed in the process-wide default registry.
pub fn feed(name: impl Into<FeedName>) -> Option<Feed> {
    default_registry().get(&name.into())
}
