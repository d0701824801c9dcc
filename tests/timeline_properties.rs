//! Scenario tests for the timeline service over the in-memory store

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use tweetline::clock::{Clock, ManualClock};
use tweetline::data::{MemoryStore, TimelineStore, Tweet, TweetId, TweetStore, UserId};
use tweetline::error::{ServiceError, StoreError};
use tweetline::service::TimelineService;

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    service: TimelineService,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let service = TimelineService::new(store.clone(), store.clone(), store.clone(), clock.clone())
        .with_fanout_concurrency(1);
    Harness {
        store,
        clock,
        service,
    }
}

fn bodies(tweets: &[Tweet]) -> Vec<&str> {
    tweets.iter().map(|tweet| tweet.body.as_str()).collect()
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let h = harness();

    assert_eq!(h.service.follow(4, 4).await, Err(ServiceError::EqualsIds));
}

#[tokio::test]
async fn double_follow_keeps_one_edge() {
    let h = harness();

    h.service.follow(1, 2).await.unwrap();
    assert_eq!(
        h.service.follow(1, 2).await,
        Err(ServiceError::FollowingAlready)
    );

    h.service.tweet(2, "ping".to_string()).await.unwrap();
    assert_eq!(h.store.get_timeline(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_hello_fans_out_to_followers() {
    let h = harness();
    h.service.follow(2, 1).await.unwrap();
    h.service.follow(3, 1).await.unwrap();

    let id = h.service.tweet(1, "hello".to_string()).await.unwrap();

    assert_eq!(h.store.get_timeline(2).await.unwrap(), vec![id]);
    assert_eq!(h.store.get_timeline(3).await.unwrap(), vec![id]);
    assert!(h.service.get_timeline(1).await.unwrap().is_empty());
    assert_eq!(bodies(&h.service.get_timeline(2).await.unwrap()), vec!["hello"]);
}

#[tokio::test]
async fn scenario_overlong_tweet_touches_nothing() {
    let h = harness();
    h.service.follow(2, 1).await.unwrap();

    let result = h.service.tweet(1, "x".repeat(151)).await;

    assert_eq!(result, Err(ServiceError::MaxLengthExceeded { length: 151 }));
    assert!(h.store.get_timeline(2).await.unwrap().is_empty());
    assert_eq!(h.store.purge_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn eleven_tweets_keep_ten_newest() {
    let h = harness();
    h.service.follow(9, 1).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..11 {
        ids.push(h.service.tweet(1, format!("t{i}")).await.unwrap());
    }

    let timeline = h.store.get_timeline(9).await.unwrap();
    let expected: Vec<_> = ids[1..].iter().rev().copied().collect();
    assert_eq!(timeline, expected);
}

#[tokio::test]
async fn back_to_back_reads_match() {
    let h = harness();
    h.service.follow(2, 1).await.unwrap();
    h.service.tweet(1, "a".to_string()).await.unwrap();
    h.service.tweet(1, "b".to_string()).await.unwrap();

    let first = h.service.get_timeline(2).await.unwrap();
    let second = h.service.get_timeline(2).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(bodies(&first), vec!["b", "a"]);
}

#[tokio::test]
async fn expired_entry_truncates_the_timeline() {
    let h = harness();
    let start = h.clock.now();

    // Push order id3, id2, id1 so the timeline reads [id1, id2, id3].
    let id3 = h
        .store
        .create_tweet(&Tweet::new(1, "third".to_string(), h.clock.as_ref()).unwrap())
        .await
        .unwrap();
    h.clock.set(start - Duration::hours(25));
    let id2 = h
        .store
        .create_tweet(&Tweet::new(1, "second".to_string(), h.clock.as_ref()).unwrap())
        .await
        .unwrap();
    h.clock.set(start);
    let id1 = h
        .store
        .create_tweet(&Tweet::new(1, "first".to_string(), h.clock.as_ref()).unwrap())
        .await
        .unwrap();

    for id in [id3, id2, id1] {
        h.store.add_tweet_to_timeline(id, 7).await.unwrap();
    }

    let timeline = h.service.get_timeline(7).await.unwrap();
    assert_eq!(bodies(&timeline), vec!["first"]);
}

/// Timeline store that fails one write, chosen by call order
struct FailingTimelines {
    inner: Arc<MemoryStore>,
    fail_on_call: usize,
    calls: AtomicUsize,
    written: AtomicUsize,
}

#[async_trait]
impl TimelineStore for FailingTimelines {
    async fn add_tweet_to_timeline(&self, tweet_id: TweetId, user_id: UserId) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(StoreError::Unavailable("timeline shard down".to_string()));
        }
        self.inner.add_tweet_to_timeline(tweet_id, user_id).await?;
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_timeline(&self, user_id: UserId) -> Result<Vec<TweetId>, StoreError> {
        self.inner.get_timeline(user_id).await
    }
}

#[tokio::test]
async fn concurrent_fan_out_reaches_more_followers_than_the_limit() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let service = TimelineService::new(store.clone(), store.clone(), store.clone(), clock)
        .with_fanout_concurrency(4);

    for follower in 2..=41 {
        service.follow(follower, 1).await.unwrap();
    }

    let id = service.tweet(1, "wide".to_string()).await.unwrap();

    for follower in 2..=41 {
        assert_eq!(store.get_timeline(follower).await.unwrap(), vec![id]);
    }
}

#[tokio::test]
async fn concurrent_fan_out_failure_keeps_completed_writes() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let timelines = Arc::new(FailingTimelines {
        inner: store.clone(),
        fail_on_call: 6,
        calls: AtomicUsize::new(0),
        written: AtomicUsize::new(0),
    });
    let service = TimelineService::new(store.clone(), store.clone(), timelines.clone(), clock)
        .with_fanout_concurrency(4);

    for follower in 2..=21 {
        service.follow(follower, 1).await.unwrap();
    }

    let result = service.tweet(1, "partial".to_string()).await;
    assert_eq!(result, Err(ServiceError::AddingToTimeline));

    let mut delivered = 0;
    let mut tweet_ids = Vec::new();
    for follower in 2..=21 {
        let timeline = store.get_timeline(follower).await.unwrap();
        delivered += timeline.len();
        tweet_ids.extend(timeline);
    }

    let written = timelines.written.load(Ordering::SeqCst);
    assert_eq!(delivered, written);
    assert!(written >= 1);
    assert!(written < 20);

    // The tweet itself was stored before fan-out began.
    let resolved = store.get_tweets(&tweet_ids[..1]).await.unwrap();
    assert_eq!(bodies(&resolved), vec!["partial"]);
}
