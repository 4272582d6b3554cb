//! The sorted-set provider.
//!
//! Key layout per user, always under the feed's key prefix:
//!
//! ```text
//! <namespace>|<feed>|data|<user_id>   sorted set: member = value, score = at
//! <namespace>|<feed>|meta|<user_id>   string: last_read, fixed-precision decimal
//! ```
//!
//! Batch groups run concurrently, one pooled connection per group, with
//! every command for the group pipelined. Idempotent commands retry on
//! transient transport errors; `store` never does.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tokio::time::timeout;

use skylark_core::{Event, FeedConfig, FeedError, Response, UserId, time};
use skylark_store::batch::{Deadline, groups};
use skylark_store::{EventPage, EventPredicate, FeedProvider, PageRequest, check_users};

use crate::codec::{Command, Reply};
use crate::conn::Connection;
use crate::pool::ConnectionPool;
use crate::retry::RetryPolicy;

type UserResults<T> = Vec<(UserId, Result<T, FeedError>)>;

/// Production provider over a Redis-compatible sorted-set keyspace.
pub struct RedisProvider {
    pool: ConnectionPool,
    retry: RetryPolicy,
}

impl RedisProvider {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Re-run a group attempt on transient transport errors, within the
    /// call deadline.
    async fn with_retries<T, F, Fut>(&self, deadline: &Deadline, mut attempt_fn: F) -> Result<T, FeedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FeedError>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Err(err)
                    if err.is_retryable()
                        && self.retry.should_retry(attempt)
                        && !deadline.expired() =>
                {
                    let delay = self.retry.delay_for_attempt(attempt + 1).min(deadline.remaining());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn store_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        event: &Event,
        deadline: &Deadline,
    ) -> Result<UserResults<bool>, FeedError> {
        let mut commands = Vec::with_capacity(group.len() * 4);
        for user in group {
            let key = data_key(config, user);
            commands.push(Command::new("MULTI"));
            commands.push(
                Command::new("ZADD")
                    .arg(&key)
                    .arg("NX")
                    .arg(fmt_score(event.at()))
                    .arg(event.value()),
            );
            // Keep only the top max_size ranks; a no-op when under cap.
            commands.push(
                Command::new("ZREMRANGEBYRANK")
                    .arg(&key)
                    .arg("0")
                    .arg(format!("-{}", config.max_size + 1)),
            );
            commands.push(Command::new("EXEC"));
        }

        let replies = self.exec(deadline, commands, group.len() * 4).await?;
        Ok(group
            .iter()
            .zip(replies.chunks(4))
            .map(|(user, chunk)| (user.clone(), store_reply(chunk)))
            .collect())
    }

    async fn delete_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        value: &str,
        deadline: &Deadline,
    ) -> Result<UserResults<bool>, FeedError> {
        let commands = group
            .iter()
            .map(|user| Command::new("ZREM").arg(data_key(config, user)).arg(value))
            .collect();
        let replies = self.exec(deadline, commands, group.len()).await?;
        Ok(group
            .iter()
            .zip(replies)
            .map(|(user, reply)| (user.clone(), expect_int(&reply).map(|n| n > 0)))
            .collect())
    }

    async fn delete_if_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        predicate: EventPredicate<'_>,
        deadline: &Deadline,
    ) -> Result<UserResults<usize>, FeedError> {
        let mut conn = self.pool.acquire(deadline).await?;

        let commands = group
            .iter()
            .map(|user| {
                Command::new("ZREVRANGE")
                    .arg(data_key(config, user))
                    .arg("0")
                    .arg("-1")
                    .arg("WITHSCORES")
            })
            .collect();
        let replies = match exec_on(&mut conn, deadline, commands).await {
            Ok(replies) => replies,
            Err(err) => {
                conn.discard();
                return Err(err);
            }
        };

        // Predicate runs client-side; concurrent writers may slip past.
        let mut entries: UserResults<usize> = Vec::with_capacity(group.len());
        let mut removals: Vec<(usize, Command)> = Vec::new();
        for (index, (user, reply)) in group.iter().zip(replies).enumerate() {
            match events_from(&reply) {
                Ok(events) => {
                    let victims: Vec<&Event> = events
                        .iter()
                        .filter(|event| predicate(user, event))
                        .collect();
                    if victims.is_empty() {
                        entries.push((user.clone(), Ok(0)));
                    } else {
                        let mut command = Command::new("ZREM").arg(data_key(config, user));
                        for victim in victims {
                            command = command.arg(victim.value());
                        }
                        entries.push((user.clone(), Ok(0)));
                        removals.push((index, command));
                    }
                }
                Err(err) => entries.push((user.clone(), Err(err))),
            }
        }

        if !removals.is_empty() {
            let commands = removals.iter().map(|(_, command)| command.clone()).collect();
            let replies = match exec_on(&mut conn, deadline, commands).await {
                Ok(replies) => replies,
                Err(err) => {
                    conn.discard();
                    for (index, _) in &removals {
                        entries[*index].1 = Err(err.clone());
                    }
                    return Ok(entries);
                }
            };
            for ((index, _), reply) in removals.iter().zip(replies) {
                entries[*index].1 = expect_int(&reply).map(|n| n as usize);
            }
        }
        Ok(entries)
    }

    async fn wipe_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        deadline: &Deadline,
    ) -> Result<UserResults<bool>, FeedError> {
        let commands = group
            .iter()
            .map(|user| {
                Command::new("DEL")
                    .arg(data_key(config, user))
                    .arg(meta_key(config, user))
            })
            .collect();
        let replies = self.exec(deadline, commands, group.len()).await?;
        Ok(group
            .iter()
            .zip(replies)
            .map(|(user, reply)| (user.clone(), expect_int(&reply).map(|n| n > 0)))
            .collect())
    }

    async fn paginate_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        request: &PageRequest,
        deadline: &Deadline,
    ) -> Result<UserResults<EventPage>, FeedError> {
        let per_page = request.effective_per_page(config);
        let start = (request.page - 1) * per_page;
        let stop = request.page * per_page - 1;
        let stride = 2 + usize::from(request.with_total);

        let mut commands = Vec::with_capacity(group.len() * stride);
        for user in group {
            commands.push(
                Command::new("ZREVRANGE")
                    .arg(data_key(config, user))
                    .arg(start.to_string())
                    .arg(stop.to_string())
                    .arg("WITHSCORES"),
            );
            commands.push(Command::new("GET").arg(meta_key(config, user)));
            if request.with_total {
                commands.push(Command::new("ZCARD").arg(data_key(config, user)));
            }
        }

        let mut conn = self.pool.acquire(deadline).await?;
        let replies = match exec_on(&mut conn, deadline, commands).await {
            Ok(replies) => replies,
            Err(err) => {
                conn.discard();
                return Err(err);
            }
        };
        if replies.len() != group.len() * stride {
            conn.discard();
            return Err(FeedError::provider("reply count mismatch"));
        }

        let mut entries: UserResults<EventPage> = Vec::with_capacity(group.len());
        let mut advances: Vec<(usize, f64)> = Vec::new();
        for (index, (user, chunk)) in group.iter().zip(replies.chunks(stride)).enumerate() {
            let page = events_from(&chunk[0]).and_then(|events| {
                let watermark = watermark_from(&chunk[1])?;
                let total = match chunk.get(2) {
                    Some(reply) => Some(expect_int(reply)? as usize),
                    None => None,
                };
                if !request.peek
                    && let Some(newest) = events.first()
                    && newest.at() > watermark
                {
                    advances.push((index, newest.at()));
                }
                Ok(EventPage { events, total })
            });
            entries.push((user.clone(), page));
        }

        // The watermark write rides the same connection as the read.
        // Not atomic with it, but monotonic, so racing readers converge.
        if !advances.is_empty() {
            let commands = advances
                .iter()
                .map(|(index, watermark)| {
                    Command::new("SET")
                        .arg(meta_key(config, &group[*index]))
                        .arg(fmt_watermark(*watermark))
                })
                .collect();
            let replies = match exec_on(&mut conn, deadline, commands).await {
                Ok(replies) => replies,
                Err(err) => {
                    conn.discard();
                    return Err(err);
                }
            };
            for ((index, _), reply) in advances.iter().zip(replies) {
                if let Reply::Error(message) = reply {
                    entries[*index].1 = Err(FeedError::provider(message));
                }
            }
        }
        Ok(entries)
    }

    async fn range_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        since: Option<f64>,
        deadline: &Deadline,
    ) -> Result<UserResults<Vec<Event>>, FeedError> {
        let commands = group
            .iter()
            .map(|user| match since {
                // Strictly newer than the cutoff, newest first.
                Some(at) => Command::new("ZREVRANGEBYSCORE")
                    .arg(data_key(config, user))
                    .arg("+inf")
                    .arg(format!("({}", fmt_score(at)))
                    .arg("WITHSCORES"),
                None => Command::new("ZREVRANGE")
                    .arg(data_key(config, user))
                    .arg("0")
                    .arg("-1")
                    .arg("WITHSCORES"),
            })
            .collect();
        let replies = self.exec(deadline, commands, group.len()).await?;
        Ok(group
            .iter()
            .zip(replies)
            .map(|(user, reply)| (user.clone(), events_from(&reply)))
            .collect())
    }

    async fn reset_last_read_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        candidate: f64,
        deadline: &Deadline,
    ) -> Result<UserResults<f64>, FeedError> {
        let mut conn = self.pool.acquire(deadline).await?;

        let commands = group
            .iter()
            .map(|user| Command::new("GET").arg(meta_key(config, user)))
            .collect();
        let replies = match exec_on(&mut conn, deadline, commands).await {
            Ok(replies) => replies,
            Err(err) => {
                conn.discard();
                return Err(err);
            }
        };

        let mut effectives: Vec<(UserId, Result<f64, FeedError>)> = Vec::with_capacity(group.len());
        let mut writes = Vec::with_capacity(group.len());
        for (user, reply) in group.iter().zip(replies) {
            match watermark_from(&reply) {
                Ok(current) => {
                    let effective = if candidate > current { candidate } else { current };
                    writes.push(
                        Command::new("SET")
                            .arg(meta_key(config, user))
                            .arg(fmt_watermark(effective)),
                    );
                    effectives.push((user.clone(), Ok(effective)));
                }
                Err(err) => effectives.push((user.clone(), Err(err))),
            }
        }

        if !writes.is_empty() {
            let replies = match exec_on(&mut conn, deadline, writes).await {
                Ok(replies) => replies,
                Err(err) => {
                    conn.discard();
                    return Err(err);
                }
            };
            let mut reply_iter = replies.into_iter();
            for entry in effectives.iter_mut().filter(|(_, result)| result.is_ok()) {
                if let Some(Reply::Error(message)) = reply_iter.next().as_ref() {
                    entry.1 = Err(FeedError::provider(message.clone()));
                }
            }
        }
        Ok(effectives)
    }

    async fn count_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        deadline: &Deadline,
    ) -> Result<UserResults<usize>, FeedError> {
        let commands = group
            .iter()
            .map(|user| Command::new("ZCARD").arg(data_key(config, user)))
            .collect();
        let replies = self.exec(deadline, commands, group.len()).await?;
        Ok(group
            .iter()
            .zip(replies)
            .map(|(user, reply)| (user.clone(), expect_int(&reply).map(|n| n as usize)))
            .collect())
    }

    async fn unread_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        deadline: &Deadline,
    ) -> Result<UserResults<usize>, FeedError> {
        let mut conn = self.pool.acquire(deadline).await?;

        let commands = group
            .iter()
            .map(|user| Command::new("GET").arg(meta_key(config, user)))
            .collect();
        let replies = match exec_on(&mut conn, deadline, commands).await {
            Ok(replies) => replies,
            Err(err) => {
                conn.discard();
                return Err(err);
            }
        };

        let mut entries: UserResults<usize> = Vec::with_capacity(group.len());
        let mut counts: Vec<(usize, Command)> = Vec::new();
        for (index, (user, reply)) in group.iter().zip(replies).enumerate() {
            match watermark_from(&reply) {
                Ok(watermark) => {
                    entries.push((user.clone(), Ok(0)));
                    counts.push((
                        index,
                        Command::new("ZCOUNT")
                            .arg(data_key(config, user))
                            .arg(format!("({}", fmt_score(watermark)))
                            .arg("+inf"),
                    ));
                }
                Err(err) => entries.push((user.clone(), Err(err))),
            }
        }

        if !counts.is_empty() {
            let commands = counts.iter().map(|(_, command)| command.clone()).collect();
            let replies = match exec_on(&mut conn, deadline, commands).await {
                Ok(replies) => replies,
                Err(err) => {
                    conn.discard();
                    return Err(err);
                }
            };
            for ((index, _), reply) in counts.iter().zip(replies) {
                entries[*index].1 = expect_int(&reply).map(|n| n as usize);
            }
        }
        Ok(entries)
    }

    async fn last_read_group(
        &self,
        config: &FeedConfig,
        group: &[UserId],
        deadline: &Deadline,
    ) -> Result<UserResults<f64>, FeedError> {
        let commands = group
            .iter()
            .map(|user| Command::new("GET").arg(meta_key(config, user)))
            .collect();
        let replies = self.exec(deadline, commands, group.len()).await?;
        Ok(group
            .iter()
            .zip(replies)
            .map(|(user, reply)| (user.clone(), watermark_from(&reply)))
            .collect())
    }

    /// Acquire, pipeline, release. Any failure discards the connection.
    async fn exec(
        &self,
        deadline: &Deadline,
        commands: Vec<Command>,
        expected: usize,
    ) -> Result<Vec<Reply>, FeedError> {
        let mut conn = self.pool.acquire(deadline).await?;
        let replies = match exec_on(&mut conn, deadline, commands).await {
            Ok(replies) => replies,
            Err(err) => {
                conn.discard();
                return Err(err);
            }
        };
        if replies.len() != expected {
            conn.discard();
            return Err(FeedError::provider("reply count mismatch"));
        }
        Ok(replies)
    }
}

#[async_trait]
impl FeedProvider for RedisProvider {
    async fn store(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        // Not retried: a replayed insert could observably double-apply.
        let futures = groups(users, config.batch_size).map(|group| async move {
            match self.store_group(config, group, event, &deadline).await {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn delete(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        event: &Event,
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || {
                    self.delete_group(config, group, event.value(), &deadline)
                })
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn delete_if(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        predicate: EventPredicate<'_>,
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        // Best-effort, no retry: the predicate ran against a snapshot.
        let futures = groups(users, config.batch_size).map(|group| async move {
            match self
                .delete_if_group(config, group, predicate, &deadline)
                .await
            {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn wipe(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<bool>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || self.wipe_group(config, group, &deadline))
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn paginate(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        request: &PageRequest,
    ) -> Result<Response<EventPage>, FeedError> {
        check_users(users)?;
        request.validate()?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || {
                    self.paginate_group(config, group, request, &deadline)
                })
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn fetch(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<Vec<Event>>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || self.range_group(config, group, None, &deadline))
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn fetch_since(
        &self,
        config: &FeedConfig,
        users: &[UserId],
        at: f64,
    ) -> Result<Response<Vec<Event>>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || {
                    self.range_group(config, group, Some(at), &deadline)
                })
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
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
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || {
                    self.reset_last_read_group(config, group, candidate, &deadline)
                })
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn total_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || self.count_group(config, group, &deadline))
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn unread_count(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<usize>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || self.unread_group(config, group, &deadline))
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn last_read(
        &self,
        config: &FeedConfig,
        users: &[UserId],
    ) -> Result<Response<f64>, FeedError> {
        check_users(users)?;
        let deadline = Deadline::starting_now(config.op_timeout);
        let futures = groups(users, config.batch_size).map(|group| async move {
            let result = self
                .with_retries(&deadline, || self.last_read_group(config, group, &deadline))
                .await;
            match result {
                Ok(entries) => entries,
                Err(err) => fail_group(group, err),
            }
        });
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }
}

fn data_key(config: &FeedConfig, user: &UserId) -> String {
    format!("{}|data|{user}", config.key_prefix())
}

fn meta_key(config: &FeedConfig, user: &UserId) -> String {
    format!("{}|meta|{user}", config.key_prefix())
}

fn fmt_score(at: f64) -> String {
    format!("{at}")
}

/// Watermarks persist as fixed-precision decimals for compatibility
/// with existing data.
fn fmt_watermark(at: f64) -> String {
    format!("{at:.6}")
}

fn fail_group<T>(group: &[UserId], err: FeedError) -> UserResults<T> {
    group
        .iter()
        .map(|user| (user.clone(), Err(err.clone())))
        .collect()
}

async fn exec_on(
    conn: &mut Connection,
    deadline: &Deadline,
    commands: Vec<Command>,
) -> Result<Vec<Reply>, FeedError> {
    match timeout(deadline.remaining(), conn.pipeline(commands)).await {
        Ok(result) => result,
        Err(_) => Err(deadline.error()),
    }
}

fn store_reply(chunk: &[Reply]) -> Result<bool, FeedError> {
    for reply in &chunk[..chunk.len() - 1] {
        if let Reply::Error(message) = reply {
            return Err(FeedError::provider(message.clone()));
        }
    }
    match chunk.last() {
        Some(Reply::Array(items)) if items.len() == 2 => Ok(expect_int(&items[0])? == 1),
        Some(Reply::Error(message)) => Err(FeedError::provider(message.clone())),
        Some(Reply::Nil) => Err(FeedError::provider("transaction aborted")),
        other => Err(FeedError::provider(format!(
            "unexpected transaction reply: {other:?}"
        ))),
    }
}

fn expect_int(reply: &Reply) -> Result<i64, FeedError> {
    match reply {
        Reply::Int(n) => Ok(*n),
        Reply::Error(message) => Err(FeedError::provider(message.clone())),
        other => Err(FeedError::provider(format!(
            "expected integer reply, got {other:?}"
        ))),
    }
}

fn parse_f64(bytes: &Bytes) -> Result<f64, FeedError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FeedError::provider("malformed float in reply"))
}

/// `GET meta` reply: absent users read as watermark 0.
fn watermark_from(reply: &Reply) -> Result<f64, FeedError> {
    match reply {
        Reply::Nil => Ok(0.0),
        Reply::Bulk(bytes) => parse_f64(bytes),
        Reply::Error(message) => Err(FeedError::provider(message.clone())),
        other => Err(FeedError::provider(format!(
            "expected watermark reply, got {other:?}"
        ))),
    }
}

/// A `WITHSCORES` range reply: flat `[member, score, ...]` pairs.
fn events_from(reply: &Reply) -> Result<Vec<Event>, FeedError> {
    let items = match reply {
        Reply::Array(items) => items,
        Reply::Nil => return Ok(Vec::new()),
        Reply::Error(message) => return Err(FeedError::provider(message.clone())),
        other => {
            return Err(FeedError::provider(format!(
                "expected range reply, got {other:?}"
            )));
        }
    };
    if items.len() % 2 != 0 {
        return Err(FeedError::provider("range reply missing scores"));
    }
    items
        .chunks(2)
        .map(|pair| {
            let member = pair[0]
                .as_bulk()
                .ok_or_else(|| FeedError::provider("range member is not a bulk string"))?;
            let score = pair[1]
                .as_bulk()
                .ok_or_else(|| FeedError::provider("range score is not a bulk string"))?;
            Ok(Event::with_at(
                String::from_utf8_lossy(member).into_owned(),
                parse_f64(score)?,
            ))
        })
        .collect()
}
