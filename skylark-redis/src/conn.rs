//! Pipelined connection to the backing keyspace.

use futures::{SinkExt, StreamExt};
use std::env;
use std::sync::OnceLock;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use skylark_core::FeedError;

use crate::codec::{Command, Reply, RespCodec};

/// The single debug switch: truthy `SKYLARK_DEBUG` turns on per-command
/// logging of remote commands. Checked once per process.
fn debug_commands() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        matches!(
            env::var("SKYLARK_DEBUG")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// One framed connection speaking RESP.
pub struct Connection {
    framed: Framed<TcpStream, RespCodec>,
}

impl Connection {
    /// Connect to a `host:port` address.
    pub async fn connect(addr: &str) -> Result<Self, FeedError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| FeedError::transport(format!("connect {addr}: {e}")))?;
        Ok(Self {
            framed: Framed::new(stream, RespCodec),
        })
    }

    /// Send every command, flush once, then read exactly one reply per
    /// command, in order.
    pub async fn pipeline(&mut self, commands: Vec<Command>) -> Result<Vec<Reply>, FeedError> {
        let expected = commands.len();
        for command in commands {
            if debug_commands() {
                debug!(target: "skylark_redis", command = %command.render(), "pipelining command");
            }
            self.framed
                .feed(command)
                .await
                .map_err(|e| FeedError::transport(format!("write failed: {e}")))?;
        }
        self.framed
            .flush()
            .await
            .map_err(|e| FeedError::transport(format!("flush failed: {e}")))?;

        let mut replies = Vec::with_capacity(expected);
        while replies.len() < expected {
            match self.framed.next().await {
                Some(Ok(reply)) => replies.push(reply),
                Some(Err(e)) => {
                    return Err(FeedError::transport(format!("read failed: {e}")));
                }
                None => {
                    return Err(FeedError::transport("connection closed mid-pipeline"));
                }
            }
        }
        Ok(replies)
    }

    /// Round-trip a single command.
    pub async fn command(&mut self, command: Command) -> Result<Reply, FeedError> {
        let mut replies = self.pipeline(vec![command]).await?;
        replies
            .pop()
            .ok_or_else(|| FeedError::transport("connection returned no reply"))
    }
}
