use chirp::{
    DocumentStore, ProfileFeed, Timeline,
    backend::memory::fields,
    feed::{decode_snapshot, timeline_query},
    model::Snapshot,
};
use serde_json::json;

use crate::support::Backend;

async fn seed(backend: &Backend, user_id: &str, tweet: &str, at: i64) -> String {
    backend
        .docs
        .add(
            backend.collection(),
            fields(json!({ "tweet": tweet, "userId": user_id, "username": user_id, "createAt": at })),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn displayed_list_equals_latest_snapshot() {
    let backend = Backend::new();
    let limits = backend.settings.limits();
    let mut timeline = Timeline::mount(&backend.docs, &limits, backend.collection()).await.unwrap();
    let mut probe = backend
        .docs
        .subscribe(timeline_query(&limits, backend.collection()))
        .await
        .unwrap();

    let first = seed(&backend, "u1", "first", 10).await;
    let second = seed(&backend, "u2", "second", 20).await;
    backend.docs.delete(backend.collection(), &first).await.unwrap();

    let mut delivered = 0;
    while let Some(snapshot) = probe.try_next() {
        timeline.apply(&snapshot);
        assert_eq!(timeline.posts(), decode_snapshot(&snapshot).as_slice());
        delivered += 1;
    }
    assert_eq!(delivered, 4);

    let ids: Vec<_> = timeline.posts().iter().map(|post| post.id.clone()).collect();
    assert_eq!(ids, [second]);
    timeline.unmount();
}

#[tokio::test]
async fn timeline_is_newest_first_and_capped() {
    let backend = Backend::new();
    for at in 0..30 {
        seed(&backend, "u1", &format!("post {at}"), at).await;
    }
    let mut timeline = Timeline::mount(&backend.docs, &backend.settings.limits(), backend.collection())
        .await
        .unwrap();
    assert_eq!(timeline.drain(), 1);

    let stamps: Vec<_> = timeline.posts().iter().map(|post| post.create_at).collect();
    assert_eq!(stamps.len(), 25);
    assert_eq!(stamps.first(), Some(&29));
    assert_eq!(stamps.last(), Some(&5));
    assert!(stamps.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn unmount_stops_deliveries() {
    let backend = Backend::new();
    let mut timeline = Timeline::mount(&backend.docs, &backend.settings.limits(), backend.collection())
        .await
        .unwrap();
    timeline.drain();
    assert_eq!(backend.docs.live_subscriptions(), 1);

    timeline.unmount();
    assert!(!timeline.is_mounted());
    assert_eq!(backend.docs.live_subscriptions(), 0);

    seed(&backend, "u1", "after", 1).await;
    assert!(!timeline.next().await);
    assert_eq!(timeline.drain(), 0);
    assert!(timeline.posts().is_empty());
}

#[tokio::test]
async fn dropping_a_timeline_releases_its_query() {
    let backend = Backend::new();
    {
        let _timeline = Timeline::mount(&backend.docs, &backend.settings.limits(), backend.collection())
            .await
            .unwrap();
        assert_eq!(backend.docs.live_subscriptions(), 1);
    }
    assert_eq!(backend.docs.live_subscriptions(), 0);
}

#[tokio::test]
async fn profile_feed_is_a_single_fetch() {
    let backend = Backend::new();
    seed(&backend, "u1", "mine", 1).await;
    seed(&backend, "u2", "theirs", 2).await;
    seed(&backend, "u1", "mine again", 3).await;

    let mut feed = ProfileFeed::fetch(&backend.docs, "u1", &backend.settings.limits(), backend.collection())
        .await
        .unwrap();
    let tweets: Vec<_> = feed.posts().iter().map(|post| post.tweet.as_str()).collect();
    assert_eq!(tweets, ["mine again", "mine"]);

    seed(&backend, "u1", "later", 4).await;
    assert_eq!(feed.posts().len(), 2);
    assert_eq!(backend.docs.live_subscriptions(), 0);

    feed.refresh(&backend.docs).await.unwrap();
    assert_eq!(feed.posts().len(), 3);
    assert_eq!(feed.user_id(), "u1");
}

#[test]
fn empty_snapshot_clears_the_list() {
    let (_sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let mut timeline = Timeline::with_subscription(chirp::Subscription::new(receiver, || {}));
    timeline.apply(&Snapshot::new(vec![chirp::model::Document::new(
        "a",
        fields(json!({ "tweet": "x", "userId": "u", "username": "u", "createAt": 1 })),
    )]));
    assert_eq!(timeline.posts().len(), 1);
    timeline.apply(&Snapshot::default());
    assert!(timeline.posts().is_empty());
}
