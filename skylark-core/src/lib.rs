//! skylark-core - Core types for the Skylark activity feed
//!
//! This crate holds the value types shared by every provider and by the
//! feed facade: events, identifiers, configuration, the error taxonomy,
//! and the per-user response aggregator. It knows nothing about any
//! backing store.

mod config;
mod error;
mod event;
mod response;
pub mod time;
mod types;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_SIZE, DEFAULT_OP_TIMEOUT, DEFAULT_PER_PAGE, FeedConfig,
};
pub use error::FeedError;
pub use event::{Event, feed_order};
pub use response::Response;
pub use types::{FeedName, UserId};
