//! skylark-redis - Remote sorted-set provider for Skylark activity feeds
//!
//! Maps each user's feed onto two keys in a Redis-compatible keyspace:
//! a sorted set of event values scored by timestamp, and a small meta
//! key holding the unread watermark. Commands for a batch group are
//! pipelined on one pooled connection; groups run concurrently.
//!
//! Every command touches a single user's keys, so the keyspace shards
//! transparently behind a hashing proxy.

mod codec;
mod conn;
mod pool;
mod provider;
mod retry;

pub use codec::{Command, Reply};
pub use conn::Connection;
pub use pool::{ConnectionPool, PoolConfig, PoolStats, PooledConn};
pub use provider::RedisProvider;
pub use retry::RetryPolicy;
