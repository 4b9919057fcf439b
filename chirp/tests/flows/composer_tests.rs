use std::sync::Arc;

use chirp::{
    Composer, DocumentStore, Query, Subscription, SubmitOutcome, Timeline,
    backend::memory::MemoryDocumentStore,
    errors::BackendError,
    model::{Document, Fields},
    post::PostItem,
    validators::PHOTO_TOO_LARGE_MESSAGE,
};
use serde_json::Value;
use tokio::sync::Notify;

use crate::support::{Backend, ONE_MIB, photo};

#[tokio::test]
async fn empty_or_oversized_text_issues_no_store_call() {
    let backend = Backend::new();
    let author = backend.verified_user("a@chirp.test", "ann").await;
    let composer = Composer::new(&backend.settings);

    for text in [String::new(), "x".repeat(181), "é".repeat(181)] {
        composer.set_text(text.clone());
        let outcome = composer.submit(Some(&author), &backend.docs, &backend.blobs).await;
        assert!(matches!(outcome, SubmitOutcome::Rejected(_)), "{text:?} was not rejected");
        assert_eq!(composer.text(), text);
    }

    assert!(backend.docs.calls().is_empty());
    assert!(backend.blobs.calls().is_empty());
    assert!(!composer.is_submitting());
}

#[tokio::test]
async fn oversized_file_is_refused_and_selection_kept() {
    let backend = Backend::new();
    let composer = Composer::new(&backend.settings);
    composer.set_text("keep me");
    composer.attach(photo(ONE_MIB)).expect("exactly 1 MiB is allowed");

    let err = composer.attach(photo(ONE_MIB + 1)).unwrap_err();
    assert_eq!(err.first_message(), Some(PHOTO_TOO_LARGE_MESSAGE));
    assert_eq!(composer.attachment().map(|file| file.size()), Some(ONE_MIB as u64));
    assert_eq!(composer.text(), "keep me");
}

#[tokio::test]
async fn successful_post_resets_form() {
    let backend = Backend::new();
    let author = backend.verified_user("a@chirp.test", "ann").await;
    let composer = Composer::new(&backend.settings);
    composer.set_text("with a photo");
    composer.attach(photo(128)).unwrap();

    let outcome = composer.submit(Some(&author), &backend.docs, &backend.blobs).await;
    assert!(outcome.is_done());
    assert_eq!(composer.text(), "");
    assert!(composer.attachment().is_none());
    assert!(!composer.is_submitting());

    let ops: Vec<_> = backend.docs.calls().into_iter().map(|call| call.op).collect();
    assert_eq!(ops, ["add", "update"]);
    let blob_ops: Vec<_> = backend.blobs.calls().into_iter().map(|call| call.op).collect();
    assert_eq!(blob_ops, ["upload", "download_url"]);
}

#[tokio::test]
async fn hello_post_renders_one_item_without_photo() {
    let backend = Backend::new();
    let author = backend.verified_user("a@chirp.test", "ann").await;
    let mut timeline = Timeline::mount(&backend.docs, &backend.settings.limits(), backend.collection())
        .await
        .unwrap();
    assert!(timeline.next().await);
    assert!(timeline.posts().is_empty());

    let composer = Composer::new(&backend.settings);
    composer.set_text("hello");
    let SubmitOutcome::Done(id) = composer.submit(Some(&author), &backend.docs, &backend.blobs).await else {
        panic!("post was not created");
    };

    let stored = backend.docs.dump(backend.collection());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].get("tweet"), Some(&Value::from("hello")));
    assert!(stored[0].get("photo").is_none());
    assert!(stored[0].get("createAt").and_then(Value::as_i64).is_some());

    assert!(timeline.next().await);
    let items: Vec<_> = timeline
        .posts()
        .iter()
        .cloned()
        .map(|post| PostItem::new(post, Some(&author), &backend.settings))
        .collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].payload(), "hello");
    assert_eq!(items[0].photo(), None);
    assert_eq!(items[0].post().username, "ann");
    timeline.unmount();
}

#[tokio::test]
async fn failed_create_is_swallowed_and_flag_cleared() {
    let backend = Backend::new();
    let author = backend.verified_user("a@chirp.test", "ann").await;
    backend
        .docs
        .fail_next("add", BackendError::new("documents/permission-denied", "missing permissions"));
    let composer = Composer::new(&backend.settings);
    composer.set_text("lost");

    let outcome = composer.submit(Some(&author), &backend.docs, &backend.blobs).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert!(!composer.is_submitting());
    assert_eq!(composer.text(), "lost");
    assert!(backend.docs.dump(backend.collection()).is_empty());
}

/// Document store whose `add` waits until the test opens the gate.
#[derive(Clone)]
struct GatedDocs {
    inner: MemoryDocumentStore,
    gate: Arc<Notify>,
}

impl DocumentStore for GatedDocs {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError> {
        self.gate.notified().await;
        self.inner.add(collection, fields).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), BackendError> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        self.inner.delete(collection, id).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        self.inner.get(collection, id).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        self.inner.query(query).await
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, BackendError> {
        self.inner.subscribe(query).await
    }
}

#[tokio::test]
async fn second_submit_while_in_flight_is_refused() {
    let backend = Backend::new();
    let author = backend.verified_user("a@chirp.test", "ann").await;
    let docs = GatedDocs {
        inner: backend.docs.clone(),
        gate: Arc::new(Notify::new()),
    };
    let composer = Composer::new(&backend.settings);
    composer.set_text("once");

    let first = composer.submit(Some(&author), &docs, &backend.blobs);
    tokio::pin!(first);
    assert!(futures::poll!(&mut first).is_pending());
    assert!(composer.is_submitting());

    let second = composer.submit(Some(&author), &docs, &backend.blobs).await;
    docs.gate.notify_one();
    let first = first.await;

    assert!(first.is_done());
    assert_eq!(second, SubmitOutcome::Busy);
    assert_eq!(backend.docs.dump(backend.collection()).len(), 1);
    assert!(!composer.is_submitting());
}
