//! Flat dump/restore format for the in-memory provider.
//!
//! The dump is a JSON mapping from user id to `{events, last_read}`,
//! used for test fixtures and small-deployment snapshots. Round-trips
//! losslessly: restoring a dump yields states semantically equal to the
//! originals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use skylark_core::{Event, FeedConfig, FeedError};

use super::{MemoryProvider, UserFeedState};

/// One user's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDump {
    /// Events newest first, as a read would return them.
    pub events: Vec<Event>,
    pub last_read: f64,
}

/// Snapshot of one feed: user id to state.
pub type FeedDump = BTreeMap<String, UserDump>;

impl MemoryProvider {
    /// Snapshot every user of the given feed.
    pub async fn dump(&self, config: &FeedConfig) -> FeedDump {
        let prefix = config.key_prefix();
        let handles: Vec<_> = self
            .states
            .read()
            .await
            .iter()
            .filter(|((feed, _), _)| *feed == prefix)
            .map(|((_, user), handle)| (user.clone(), handle.clone()))
            .collect();

        let mut dump = FeedDump::new();
        for (user, handle) in handles {
            let state = handle.lock().await;
            dump.insert(
                user.to_string(),
                UserDump {
                    events: state.events(),
                    last_read: state.last_read,
                },
            );
        }
        dump
    }

    /// Replace the given feed's state with a snapshot.
    pub async fn restore(&self, config: &FeedConfig, dump: FeedDump) {
        let prefix = config.key_prefix();
        let mut states = self.states.write().await;
        states.retain(|(feed, _), _| *feed != prefix);
        for (user, user_dump) in dump {
            let mut state = UserFeedState::default();
            // Events arrive newest first; insertion order does not
            // matter for the ordered set, and the cap still applies.
            for event in &user_dump.events {
                state.insert(event, config.max_size);
            }
            state.last_read = user_dump.last_read;
            states.insert(
                (prefix.clone(), user.into()),
                std::sync::Arc::new(tokio::sync::Mutex::new(state)),
            );
        }
    }

    /// Write a feed snapshot to disk (temp file + rename).
    pub async fn dump_to(&self, config: &FeedConfig, path: &Path) -> Result<(), FeedError> {
        let dump = self.dump(config).await;
        let json = serde_json::to_string_pretty(&dump)
            .map_err(|e| FeedError::provider(format!("dump encode failed: {e}")))?;

        let temp = path.with_extension("tmp");
        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| FeedError::provider(format!("dump write failed: {e}")))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| FeedError::provider(format!("dump write failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| FeedError::provider(format!("dump write failed: {e}")))?;
        drop(file);
        fs::rename(&temp, path)
            .await
            .map_err(|e| FeedError::provider(format!("dump write failed: {e}")))?;
        Ok(())
    }

    /// Load a feed snapshot from disk, replacing current state.
    pub async fn restore_from(&self, config: &FeedConfig, path: &Path) -> Result<(), FeedError> {
        let json = fs::read_to_string(path)
            .await
            .map_err(|e| FeedError::provider(format!("dump read failed: {e}")))?;
        let dump: FeedDump = serde_json::from_str(&json)
            .map_err(|e| FeedError::provider(format!("dump decode failed: {e}")))?;
        self.restore(config, dump).await;
        Ok(())
    }
}
