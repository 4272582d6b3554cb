//! Contract tests for the reference provider.
//!
//! These exercise the provider semantics every backend must satisfy:
//! dedup, trimming, watermark movement, pagination windows, and the
//! dump fixture round-trip.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use skylark_core::{Event, FeedConfig, FeedError, UserId};
use skylark_store::{FeedProvider, MemoryProvider, PageRequest};
use tempfile::TempDir;

fn config() -> FeedConfig {
    FeedConfig::new("contract")
}

fn user() -> UserId {
    UserId::from(1u64)
}

async fn seed(provider: &MemoryProvider, config: &FeedConfig, events: &[(&str, f64)]) {
    let users = [user()];
    for (value, at) in events {
        provider
            .store(config, &users, &Event::with_at(*value, *at))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn dedup_preserves_original_score() {
    // S1: a duplicate value is rejected and the original score survives.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    let first = provider
        .store(&config, &users, &Event::with_at("hello", 1000.0))
        .await
        .unwrap();
    assert_eq!(first.value(&users[0]).unwrap(), &true);

    let second = provider
        .store(&config, &users, &Event::with_at("hello", 2000.0))
        .await
        .unwrap();
    assert_eq!(second.value(&users[0]).unwrap(), &false);

    let fetched = provider.fetch(&config, &users).await.unwrap();
    let events = fetched.value(&users[0]).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value(), "hello");
    assert_eq!(events[0].at(), 1000.0);

    let counts = provider.total_count(&config, &users).await.unwrap();
    assert_eq!(counts.value(&users[0]).unwrap(), &1);
}

#[tokio::test]
async fn trimming_evicts_oldest() {
    // S2: the capacity cap evicts the lowest-scored entry.
    let provider = MemoryProvider::new();
    let mut config = config();
    config.max_size = 3;
    let users = [user()];

    seed(
        &provider,
        &config,
        &[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)],
    )
    .await;

    let fetched = provider.fetch(&config, &users).await.unwrap();
    let events = fetched.value(&users[0]).unwrap();
    let shape: Vec<(String, f64)> = events
        .iter()
        .map(|e| (e.value().to_string(), e.at()))
        .collect();
    assert_eq!(
        shape,
        [
            ("d".to_string(), 4.0),
            ("c".to_string(), 3.0),
            ("b".to_string(), 2.0)
        ]
    );

    let counts = provider.total_count(&config, &users).await.unwrap();
    assert_eq!(counts.value(&users[0]).unwrap(), &3);
}

#[tokio::test]
async fn paginate_advances_watermark() {
    // S3: a non-peek paginate moves last_read to the page's newest score.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("x", 10.0), ("y", 20.0), ("z", 30.0)]).await;

    let unread = provider.unread_count(&config, &users).await.unwrap();
    assert_eq!(unread.value(&users[0]).unwrap(), &3);

    let pages = provider
        .paginate(&config, &users, &PageRequest::new(1).per_page(2))
        .await
        .unwrap();
    let page = pages.value(&users[0]).unwrap();
    let shape: Vec<(String, f64)> = page
        .events
        .iter()
        .map(|e| (e.value().to_string(), e.at()))
        .collect();
    assert_eq!(shape, [("z".to_string(), 30.0), ("y".to_string(), 20.0)]);

    let watermark = provider.last_read(&config, &users).await.unwrap();
    assert_eq!(watermark.value(&users[0]).unwrap(), &30.0);

    let unread = provider.unread_count(&config, &users).await.unwrap();
    assert_eq!(unread.value(&users[0]).unwrap(), &0);
}

#[tokio::test]
async fn peek_leaves_watermark_alone() {
    // S4: peeking reads the same slice without consuming unreads.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("x", 10.0), ("y", 20.0), ("z", 30.0)]).await;

    let pages = provider
        .paginate(&config, &users, &PageRequest::new(1).per_page(2).peek())
        .await
        .unwrap();
    assert_eq!(pages.value(&users[0]).unwrap().events.len(), 2);

    let unread = provider.unread_count(&config, &users).await.unwrap();
    assert_eq!(unread.value(&users[0]).unwrap(), &3);

    let watermark = provider.last_read(&config, &users).await.unwrap();
    assert_eq!(watermark.value(&users[0]).unwrap(), &0.0);
}

#[tokio::test]
async fn delete_if_removes_matching_events() {
    // S6: predicate deletion reports the removed count.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    let events: Vec<(String, f64)> = (1..=10).map(|i| (format!("e{i}"), i as f64)).collect();
    for (value, at) in &events {
        provider
            .store(&config, &users, &Event::with_at(value.clone(), *at))
            .await
            .unwrap();
    }

    let removed = provider
        .delete_if(&config, &users, &|_, event| event.at() as u64 % 2 == 0)
        .await
        .unwrap();
    assert_eq!(removed.value(&users[0]).unwrap(), &5);

    let fetched = provider.fetch(&config, &users).await.unwrap();
    let remaining = fetched.value(&users[0]).unwrap();
    let ats: Vec<f64> = remaining.iter().map(Event::at).collect();
    assert_eq!(ats, [9.0, 7.0, 5.0, 3.0, 1.0]);
}

#[tokio::test]
async fn wipe_resets_to_initial_state() {
    // P7: wiped state looks freshly created.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("a", 1.0), ("b", 2.0)]).await;
    provider
        .paginate(&config, &users, &PageRequest::new(1))
        .await
        .unwrap();

    let wiped = provider.wipe(&config, &users).await.unwrap();
    assert_eq!(wiped.value(&users[0]).unwrap(), &true);

    let totals = provider.total_count(&config, &users).await.unwrap();
    assert_eq!(totals.value(&users[0]).unwrap(), &0);
    let unread = provider.unread_count(&config, &users).await.unwrap();
    assert_eq!(unread.value(&users[0]).unwrap(), &0);
    let watermark = provider.last_read(&config, &users).await.unwrap();
    assert_eq!(watermark.value(&users[0]).unwrap(), &0.0);
}

#[tokio::test]
async fn fetch_is_ordered_and_consistent_with_counts() {
    // P3 / P4 / P10 over an interleaved insertion order.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(
        &provider,
        &config,
        &[("m", 5.0), ("a", 9.0), ("q", 1.0), ("b", 9.0), ("n", 3.0)],
    )
    .await;
    provider
        .reset_last_read(&config, &users, Some(4.0))
        .await
        .unwrap();

    let fetched = provider.fetch(&config, &users).await.unwrap();
    let events = fetched.value(&users[0]).unwrap();
    for pair in events.windows(2) {
        assert!(pair[0].at() >= pair[1].at());
    }

    let totals = provider.total_count(&config, &users).await.unwrap();
    assert_eq!(totals.value(&users[0]).unwrap(), &events.len());

    let unread = provider.unread_count(&config, &users).await.unwrap();
    let expected = events.iter().filter(|e| e.at() > 4.0).count();
    assert_eq!(unread.value(&users[0]).unwrap(), &expected);
}

#[tokio::test]
async fn equal_timestamps_order_deterministically() {
    // Ties rank by value descending, on every read.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("b", 7.0), ("a", 7.0), ("c", 7.0)]).await;

    for _ in 0..3 {
        let fetched = provider.fetch(&config, &users).await.unwrap();
        let values: Vec<String> = fetched
            .value(&users[0])
            .unwrap()
            .iter()
            .map(|e| e.value().to_string())
            .collect();
        assert_eq!(values, ["c", "b", "a"]);
    }
}

#[tokio::test]
async fn paginate_past_the_end_is_empty_not_an_error() {
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("a", 1.0), ("b", 2.0)]).await;

    let pages = provider
        .paginate(&config, &users, &PageRequest::new(9).with_total())
        .await
        .unwrap();
    let page = pages.value(&users[0]).unwrap();
    assert!(page.events.is_empty());
    assert_eq!(page.total, Some(2));

    // And an empty page never moves the watermark.
    let watermark = provider.last_read(&config, &users).await.unwrap();
    assert_eq!(watermark.value(&users[0]).unwrap(), &0.0);
}

#[tokio::test]
async fn paginate_rejects_page_zero() {
    let provider = MemoryProvider::new();
    let result = provider
        .paginate(&config(), &[user()], &PageRequest::new(0))
        .await;
    assert!(matches!(result, Err(FeedError::Argument { .. })));
}

#[tokio::test]
async fn reset_last_read_never_regresses() {
    // I5: the watermark is monotonic outside of wipe.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    let first = provider
        .reset_last_read(&config, &users, Some(100.0))
        .await
        .unwrap();
    assert_eq!(first.value(&users[0]).unwrap(), &100.0);

    let second = provider
        .reset_last_read(&config, &users, Some(50.0))
        .await
        .unwrap();
    assert_eq!(second.value(&users[0]).unwrap(), &100.0);
}

#[tokio::test]
async fn fetch_since_filters_strictly_newer() {
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user()];

    seed(&provider, &config, &[("a", 1.0), ("b", 2.0), ("c", 3.0)]).await;

    let fetched = provider.fetch_since(&config, &users, 2.0).await.unwrap();
    let values: Vec<String> = fetched
        .value(&users[0])
        .unwrap()
        .iter()
        .map(|e| e.value().to_string())
        .collect();
    assert_eq!(values, ["c"]);
}

#[tokio::test]
async fn batch_response_preserves_input_order() {
    // P9 for the sequential provider: many users, small batch size.
    let provider = MemoryProvider::new();
    let mut config = config();
    config.batch_size = 2;
    let users: Vec<UserId> = (1u64..=7).map(UserId::from).collect();

    let response = provider
        .store(&config, &users, &Event::with_at("hello", 1.0))
        .await
        .unwrap();
    let order: Vec<&UserId> = response.users().collect();
    assert_eq!(order, users.iter().collect::<Vec<_>>());
    assert!(!response.has_errors());
}

#[tokio::test]
async fn dump_restore_round_trips() {
    // P8: a restored dump is semantically equal to the original.
    let provider = MemoryProvider::new();
    let config = config();
    let users = [user(), UserId::from(2u64)];

    provider
        .store(&config, &users, &Event::with_at("a", 1.5))
        .await
        .unwrap();
    provider
        .store(&config, &users[..1], &Event::with_at("b", 2.5))
        .await
        .unwrap();
    provider
        .reset_last_read(&config, &users[..1], Some(2.0))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contract.json");
    provider.dump_to(&config, &path).await.unwrap();

    let restored = MemoryProvider::new();
    restored.restore_from(&config, &path).await.unwrap();

    for user in &users {
        let original = provider.fetch(&config, &users).await.unwrap();
        let copied = restored.fetch(&config, &users).await.unwrap();
        assert_eq!(original.value(user).unwrap(), copied.value(user).unwrap());

        let original_lr = provider.last_read(&config, &users).await.unwrap();
        let copied_lr = restored.last_read(&config, &users).await.unwrap();
        assert_eq!(
            original_lr.value(user).unwrap(),
            copied_lr.value(user).unwrap()
        );
    }
}
