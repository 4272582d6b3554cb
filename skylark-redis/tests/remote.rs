//! Provider tests against a scripted wire server.
//!
//! The server speaks just enough RESP to accept pipelined commands,
//! record the argv it saw, and answer from a canned reply script. That
//! keeps the full provider path honest - key layout, pipelining order,
//! reply parsing - without a live keyspace.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use skylark_core::{Event, FeedConfig, FeedError, UserId};
use skylark_redis::{Command, Connection, ConnectionPool, PoolConfig, RedisProvider};
use skylark_store::batch::Deadline;
use skylark_store::{FeedProvider, PageRequest};

struct ScriptedServer {
    addr: String,
    recorded: Arc<Mutex<Vec<Vec<String>>>>,
    connections: Arc<AtomicUsize>,
}

impl ScriptedServer {
    /// Start a server answering each received command with the next
    /// canned reply. An exhausted script goes silent.
    async fn start(replies: Vec<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(Mutex::new(
            replies.into_iter().collect::<VecDeque<&'static str>>(),
        ));

        let recorded_task = recorded.clone();
        let connections_task = connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                connections_task.fetch_add(1, Ordering::SeqCst);
                let recorded = recorded_task.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    let (read_half, mut write_half) = socket.into_split();
                    let mut reader = BufReader::new(read_half);
                    while let Some(argv) = read_command(&mut reader).await {
                        recorded.lock().await.push(argv);
                        let reply = script.lock().await.pop_front();
                        if let Some(reply) = reply
                            && write_half.write_all(reply.as_bytes()).await.is_err()
                        {
                            return;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            recorded,
            connections,
        }
    }

    async fn recorded(&self) -> Vec<Vec<String>> {
        self.recorded.lock().await.clone()
    }

    fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn pool(&self, max_size: usize) -> ConnectionPool {
        ConnectionPool::new(PoolConfig::new(self.addr.clone()).with_max_size(max_size))
    }
}

/// Read one inbound command (`*N` array of bulk strings) as argv.
async fn read_command(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> Option<Vec<String>> {
    let mut header = String::new();
    if reader.read_line(&mut header).await.ok()? == 0 {
        return None;
    }
    let argc: usize = header.trim_start_matches('*').trim().parse().ok()?;
    let mut argv = Vec::with_capacity(argc);
    for _ in 0..argc {
        let mut len_line = String::new();
        reader.read_line(&mut len_line).await.ok()?;
        let len: usize = len_line.trim_start_matches('$').trim().parse().ok()?;
        let mut payload = vec![0u8; len + 2];
        reader.read_exact(&mut payload).await.ok()?;
        argv.push(String::from_utf8_lossy(&payload[..len]).into_owned());
    }
    Some(argv)
}

fn config() -> FeedConfig {
    let mut config = FeedConfig::new("news");
    config.max_size = 3;
    config
}

fn user() -> UserId {
    UserId::from(1u64)
}

#[tokio::test]
async fn pipeline_returns_replies_in_order() {
    let server = ScriptedServer::start(vec!["+A\r\n", "+B\r\n", "+C\r\n"]).await;
    let mut conn = Connection::connect(&server.addr).await.unwrap();

    let replies = conn
        .pipeline(vec![
            Command::new("PING").arg("1"),
            Command::new("PING").arg("2"),
            Command::new("PING").arg("3"),
        ])
        .await
        .unwrap();

    let simple: Vec<String> = replies
        .into_iter()
        .map(|reply| match reply {
            skylark_redis::Reply::Simple(s) => s,
            other => panic!("unexpected reply {other:?}"),
        })
        .collect();
    assert_eq!(simple, ["A", "B", "C"]);
}

#[tokio::test]
async fn store_issues_transaction_with_exact_keys() {
    let server = ScriptedServer::start(vec![
        "+OK\r\n",
        "+QUEUED\r\n",
        "+QUEUED\r\n",
        "*2\r\n:1\r\n:0\r\n",
    ])
    .await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider
        .store(&config(), &[user()], &Event::with_at("hello", 1000.0))
        .await
        .unwrap();
    assert_eq!(response.value(&user()).unwrap(), &true);

    let recorded = server.recorded().await;
    assert_eq!(recorded[0], ["MULTI"]);
    assert_eq!(recorded[1], ["ZADD", "news|data|1", "NX", "1000", "hello"]);
    assert_eq!(recorded[2], ["ZREMRANGEBYRANK", "news|data|1", "0", "-4"]);
    assert_eq!(recorded[3], ["EXEC"]);
}

#[tokio::test]
async fn store_duplicate_reports_false() {
    let server = ScriptedServer::start(vec![
        "+OK\r\n",
        "+QUEUED\r\n",
        "+QUEUED\r\n",
        "*2\r\n:0\r\n:0\r\n",
    ])
    .await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider
        .store(&config(), &[user()], &Event::with_at("hello", 2000.0))
        .await
        .unwrap();
    assert_eq!(response.value(&user()).unwrap(), &false);
}

#[tokio::test]
async fn fetch_parses_members_and_scores() {
    let server = ScriptedServer::start(vec![
        "*4\r\n$1\r\nb\r\n$4\r\n20.5\r\n$1\r\na\r\n$2\r\n10\r\n",
    ])
    .await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider.fetch(&config(), &[user()]).await.unwrap();
    let events = response.value(&user()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].value(), "b");
    assert_eq!(events[0].at(), 20.5);
    assert_eq!(events[1].value(), "a");
    assert_eq!(events[1].at(), 10.0);

    let recorded = server.recorded().await;
    assert_eq!(
        recorded[0],
        ["ZREVRANGE", "news|data|1", "0", "-1", "WITHSCORES"]
    );
}

#[tokio::test]
async fn unread_count_reads_watermark_then_counts_above_it() {
    let server = ScriptedServer::start(vec!["$9\r\n30.000000\r\n", ":2\r\n"]).await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider.unread_count(&config(), &[user()]).await.unwrap();
    assert_eq!(response.value(&user()).unwrap(), &2);

    let recorded = server.recorded().await;
    assert_eq!(recorded[0], ["GET", "news|meta|1"]);
    assert_eq!(recorded[1], ["ZCOUNT", "news|data|1", "(30", "+inf"]);
}

#[tokio::test]
async fn paginate_advances_watermark_on_same_connection() {
    let server = ScriptedServer::start(vec![
        "*4\r\n$1\r\nb\r\n$2\r\n20\r\n$1\r\na\r\n$2\r\n10\r\n",
        "$-1\r\n",
        "+OK\r\n",
    ])
    .await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider
        .paginate(&config(), &[user()], &PageRequest::new(1).per_page(2))
        .await
        .unwrap();
    let page = response.value(&user()).unwrap();
    assert_eq!(page.events.len(), 2);
    assert_eq!(page.events[0].value(), "b");
    assert!(page.total.is_none());

    let recorded = server.recorded().await;
    assert_eq!(
        recorded[0],
        ["ZREVRANGE", "news|data|1", "0", "1", "WITHSCORES"]
    );
    assert_eq!(recorded[1], ["GET", "news|meta|1"]);
    assert_eq!(recorded[2], ["SET", "news|meta|1", "20.000000"]);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn peek_skips_the_watermark_write() {
    let server = ScriptedServer::start(vec![
        "*2\r\n$1\r\na\r\n$2\r\n10\r\n",
        "$-1\r\n",
    ])
    .await;
    let provider = RedisProvider::new(server.pool(2));

    provider
        .paginate(&config(), &[user()], &PageRequest::new(1).per_page(2).peek())
        .await
        .unwrap();

    let recorded = server.recorded().await;
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|argv| argv[0] != "SET"));
}

#[tokio::test]
async fn wipe_deletes_both_keys() {
    let server = ScriptedServer::start(vec![":2\r\n"]).await;
    let provider = RedisProvider::new(server.pool(2));

    let response = provider.wipe(&config(), &[user()]).await.unwrap();
    assert_eq!(response.value(&user()).unwrap(), &true);

    let recorded = server.recorded().await;
    assert_eq!(recorded[0], ["DEL", "news|data|1", "news|meta|1"]);
}

#[tokio::test]
async fn pool_is_bounded_and_reuses_lifo() {
    let server = ScriptedServer::start(vec!["+PONG\r\n", "+PONG\r\n"]).await;
    let pool = server.pool(1);

    let deadline = Deadline::starting_now(Duration::from_millis(100));
    let mut first = pool.acquire(&deadline).await.unwrap();
    first.command(Command::new("PING")).await.unwrap();

    // Capacity 1: a second checkout must time out while the first is
    // still held.
    let short = Deadline::starting_now(Duration::from_millis(50));
    let blocked = pool.acquire(&short).await;
    assert!(matches!(blocked, Err(FeedError::Timeout { .. })));

    drop(first);
    let deadline = Deadline::starting_now(Duration::from_millis(100));
    let mut second = pool.acquire(&deadline).await.unwrap();
    second.command(Command::new("PING")).await.unwrap();

    // Same underlying connection both times.
    assert_eq!(server.connection_count(), 1);
    assert_eq!(pool.stats().size, 1);
}

#[tokio::test]
async fn silent_server_surfaces_timeout_per_user() {
    let server = ScriptedServer::start(Vec::new()).await;
    let provider = RedisProvider::new(server.pool(2));
    let mut config = config();
    config.op_timeout = Duration::from_millis(100);

    let response = provider.fetch(&config, &[user()]).await.unwrap();
    assert!(matches!(
        response.value(&user()),
        Err(FeedError::Timeout { .. })
    ));
}

#[tokio::test]
async fn unreachable_server_surfaces_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let pool = ConnectionPool::new(
        PoolConfig::new(addr).with_connect_timeout(Duration::from_millis(200)),
    );
    let provider = RedisProvider::new(pool);
    let mut config = config();
    config.op_timeout = Duration::from_secs(2);

    let response = provider.fetch(&config, &[user()]).await.unwrap();
    match response.value(&user()) {
        Err(FeedError::Transport { .. }) | Err(FeedError::Timeout { .. }) => {}
        other => panic!("expected transport failure, got {other:?}"),
    }
}
