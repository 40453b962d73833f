use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pulse_notify::domain::types::{NotificationPayload, OutboxStatus};
use pulse_notify::relay::{RelayConfig, TickReport};

use crate::helpers::{
    MockOutboxRepo, MockSubscriberRepo, TEST_BATCH_SIZE, next_frame, payload, post_created_at,
    raw_entry_at, registry, relay, relay_config,
};

fn decode(frame: &str) -> NotificationPayload {
    serde_json::from_str(frame).unwrap()
}

// ── Delivery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_deliver_post_to_connected_subscriber_and_mark_processed() {
    let (author, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let p = payload("rust", author);
    let entry = post_created_at(&p, 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    let subscribers = MockSubscriberRepo::with_topic("rust", &[author, bob, carol]);
    let poller = relay(&outbox, subscribers, &registry, relay_config());

    let report = poller.tick().await;

    assert_eq!(
        report,
        TickReport {
            fetched: 1,
            processed: 1,
            ..TickReport::default()
        }
    );
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Processed);

    let frame = next_frame(&mut bob_stream).expect("bob receives the post");
    let received = decode(&frame);
    assert_eq!(received, p);
    assert_eq!(received.topic_name, "rust");
    assert_eq!(received.user_id, author);
    assert!(next_frame(&mut bob_stream).is_none());
}

#[tokio::test]
async fn should_deliver_posts_in_creation_order() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let first = payload("rust", author);
    let second = payload("rust", author);
    // Inserted out of order; the relay must sort by creation time.
    let outbox = MockOutboxRepo::new(vec![
        post_created_at(&second, 10),
        post_created_at(&first, 0),
    ]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;

    assert_eq!(report.processed, 2);
    assert_eq!(decode(&next_frame(&mut bob_stream).unwrap()), first);
    assert_eq!(decode(&next_frame(&mut bob_stream).unwrap()), second);
    assert_eq!(outbox.count(OutboxStatus::Pending), 0);
}

#[tokio::test]
async fn should_fan_out_to_every_stream_of_a_recipient() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut laptop = registry.register(bob).unwrap();
    let mut phone = registry.register(bob).unwrap();

    let p = payload("rust", author);
    let outbox = MockOutboxRepo::new(vec![post_created_at(&p, 0)]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    poller.tick().await;

    assert_eq!(decode(&next_frame(&mut laptop).unwrap()), p);
    assert_eq!(decode(&next_frame(&mut phone).unwrap()), p);
}

#[tokio::test]
async fn should_mark_processed_when_no_subscriber_is_connected() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);

    let entry = post_created_at(&payload("rust", author), 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;

    assert_eq!(report.processed, 1);
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Processed);
    assert_eq!(registry.recipient_count(), 0);
}

#[tokio::test]
async fn should_not_notify_author_even_if_query_returns_them() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut author_stream = registry.register(author).unwrap();
    let mut bob_stream = registry.register(bob).unwrap();

    let outbox = MockOutboxRepo::new(vec![post_created_at(&payload("rust", author), 0)]);
    let subscribers = MockSubscriberRepo {
        ignore_exclude: true,
        ..MockSubscriberRepo::with_topic("rust", &[author, bob])
    };
    let poller = relay(&outbox, subscribers, &registry, relay_config());

    poller.tick().await;

    assert!(next_frame(&mut bob_stream).is_some());
    assert!(next_frame(&mut author_stream).is_none());
}

// ── Backpressure ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_not_block_other_recipients_when_one_buffer_is_full() {
    let (author, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(1);
    let mut bob_stream = registry.register(bob).unwrap();
    let mut carol_stream = registry.register(carol).unwrap();

    // Bob never reads; fill his single slot.
    let stale = payload("other", author);
    assert_eq!(registry.send(bob, &stale).delivered, 1);

    let p = payload("rust", author);
    let entry = post_created_at(&p, 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob, carol]),
        &registry,
        relay_config(),
    );

    let report = tokio::time::timeout(Duration::from_secs(1), poller.tick())
        .await
        .expect("tick must not block on a full buffer");

    assert_eq!(report.processed, 1);
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Processed);
    assert_eq!(decode(&next_frame(&mut carol_stream).unwrap()), p);
    // Bob only has the frame that was already queued.
    assert_eq!(decode(&next_frame(&mut bob_stream).unwrap()), stale);
    assert!(next_frame(&mut bob_stream).is_none());
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_leave_malformed_entry_pending_without_blocking_the_rest() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let malformed = raw_entry_at(
        pulse_notify::domain::types::POST_CREATED,
        serde_json::json!({ "message": 42 }),
        0,
    );
    let p = payload("rust", author);
    let valid = post_created_at(&p, 10);
    let outbox = MockOutboxRepo::new(vec![malformed.clone(), valid.clone()]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;
    assert_eq!(report.fetched, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.retained, 1);
    assert_eq!(outbox.status_of(valid.id), OutboxStatus::Processed);
    assert_eq!(decode(&next_frame(&mut bob_stream).unwrap()), p);

    // Retried on every tick, never delivered, never marked failed.
    for _ in 0..3 {
        let report = poller.tick().await;
        assert_eq!(report.fetched, 1);
        assert_eq!(report.retained, 1);
    }
    assert_eq!(outbox.status_of(malformed.id), OutboxStatus::Pending);
    assert_eq!(outbox.count(OutboxStatus::Failed), 0);
    assert!(next_frame(&mut bob_stream).is_none());
}

#[tokio::test]
async fn should_retry_entry_after_subscriber_lookup_fails() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let entry = post_created_at(&payload("rust", author), 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    let subscribers = MockSubscriberRepo::with_topic("rust", &[bob]);
    subscribers.fail.store(true, Ordering::SeqCst);
    let poller = relay(&outbox, subscribers.clone(), &registry, relay_config());

    let report = poller.tick().await;
    assert_eq!(report.retained, 1);
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Pending);
    assert!(next_frame(&mut bob_stream).is_none());

    subscribers.fail.store(false, Ordering::SeqCst);
    let report = poller.tick().await;
    assert_eq!(report.processed, 1);
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Processed);
    assert!(next_frame(&mut bob_stream).is_some());
}

#[tokio::test]
async fn should_skip_tick_when_batch_cannot_be_fetched() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);

    let entry = post_created_at(&payload("rust", author), 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    outbox.fail_fetch.store(true, Ordering::SeqCst);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;
    assert_eq!(
        report,
        TickReport {
            fetch_failed: true,
            ..TickReport::default()
        }
    );
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Pending);

    outbox.fail_fetch.store(false, Ordering::SeqCst);
    assert_eq!(poller.tick().await.processed, 1);
}

#[tokio::test]
async fn should_mark_unknown_event_type_processed_without_delivery() {
    let bob = Uuid::new_v4();
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let entry = raw_entry_at("COMMENT_CREATED", serde_json::json!({}), 0);
    let outbox = MockOutboxRepo::new(vec![entry.clone()]);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;
    assert_eq!(report.processed, 1);
    assert_eq!(outbox.status_of(entry.id), OutboxStatus::Processed);
    assert!(next_frame(&mut bob_stream).is_none());
}

// ── Batching ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_process_at_most_batch_size_entries_per_tick() {
    let author = Uuid::new_v4();
    let registry = registry(16);
    let entries = (0..25)
        .map(|i| post_created_at(&payload("rust", author), i))
        .collect();
    let outbox = MockOutboxRepo::new(entries);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::default(),
        &registry,
        relay_config(),
    );

    let report = poller.tick().await;
    assert_eq!(report.fetched, TEST_BATCH_SIZE as usize);
    assert_eq!(report.processed, TEST_BATCH_SIZE as usize);
    assert_eq!(outbox.count(OutboxStatus::Pending), 15);

    poller.tick().await;
    let report = poller.tick().await;
    assert_eq!(report.fetched, 5);
    assert_eq!(outbox.count(OutboxStatus::Pending), 0);

    let report = poller.tick().await;
    assert_eq!(report, TickReport::default());
}

// ── run ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_relay_on_interval_until_cancelled() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let outbox = MockOutboxRepo::default();
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(poller.run(cancel.clone()));

    // Written after the relay started; picked up by a later tick.
    let p = payload("rust", author);
    outbox.push(post_created_at(&p, 0));

    let frame = tokio::time::timeout(Duration::from_secs(2), bob_stream.recv())
        .await
        .expect("relay delivers within a few ticks")
        .unwrap();
    assert_eq!(decode(&frame), p);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay stops after cancellation")
        .unwrap();

    let calls = outbox.fetch_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(outbox.fetch_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn should_finish_in_flight_tick_when_cancelled() {
    let (author, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let registry = registry(16);
    let mut bob_stream = registry.register(bob).unwrap();

    let entries = (0..5)
        .map(|i| post_created_at(&payload("rust", author), i))
        .collect();
    let outbox = MockOutboxRepo::new(entries);
    let poller = relay(
        &outbox,
        MockSubscriberRepo::with_topic("rust", &[bob]),
        &registry,
        relay_config(),
    );
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(poller.run(cancel.clone()));

    // Cancel as soon as the first tick has started delivering.
    tokio::time::timeout(Duration::from_secs(2), bob_stream.recv())
        .await
        .expect("first tick delivers")
        .unwrap();
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay stops after cancellation")
        .unwrap();

    // The whole batch was relayed, not just the entry seen before cancelling.
    assert_eq!(outbox.count(OutboxStatus::Pending), 0);
    assert_eq!(outbox.count(OutboxStatus::Processed), 5);
    let mut delivered = 1;
    while next_frame(&mut bob_stream).is_some() {
        delivered += 1;
    }
    assert_eq!(delivered, 5);
}

#[tokio::test]
async fn should_not_tick_when_cancelled_before_first_interval() {
    let registry = registry(16);
    let outbox = MockOutboxRepo::default();
    let poller = relay(
        &outbox,
        MockSubscriberRepo::default(),
        &registry,
        RelayConfig {
            poll_interval: Duration::from_secs(60),
            batch_size: TEST_BATCH_SIZE,
        },
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), poller.run(cancel))
        .await
        .expect("relay returns immediately");

    assert_eq!(outbox.fetch_calls.load(Ordering::SeqCst), 0);
}
