use std::{cell::Cell, sync::Arc};

use chirp::{
    ChirpError, Composer, DeleteOutcome, DocumentStore, Query, Subscription, SubmitOutcome,
    backend::memory::MemoryDocumentStore,
    errors::BackendError,
    model::{Document, Fields, Identity, Post},
    post::{DELETE_PROMPT, Editor, PostItem, delete_post, remove_photo},
};
use serde_json::Value;
use tokio::sync::Notify;

use crate::support::{Backend, ONE_MIB, photo};

async fn publish(backend: &Backend, author: &Identity, text: &str, with_photo: bool) -> Post {
    let composer = Composer::new(&backend.settings);
    composer.set_text(text);
    if with_photo {
        composer.attach(photo(64)).unwrap();
    }
    let SubmitOutcome::Done(id) = composer.submit(Some(author), &backend.docs, &backend.blobs).await else {
        panic!("post was not created");
    };
    let document = backend
        .docs
        .dump(backend.collection())
        .into_iter()
        .find(|document| document.id == id)
        .unwrap();
    Post::from_document(&document).unwrap()
}

#[tokio::test]
async fn delete_by_stranger_or_declined_touches_nothing() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let stranger = backend.verified_user("other@chirp.test", "other").await;
    let post = publish(&backend, &owner, "mine", true).await;
    let docs_before = backend.docs.calls().len();
    let blobs_before = backend.blobs.calls().len();

    let outcome = delete_post(&post, Some(&stranger), |_| true, backend.collection(), &backend.docs, &backend.blobs).await;
    assert_eq!(outcome, DeleteOutcome::NotOwner);

    let outcome = delete_post(&post, None, |_| true, backend.collection(), &backend.docs, &backend.blobs).await;
    assert_eq!(outcome, DeleteOutcome::NotOwner);

    let mut prompt = String::new();
    let outcome = delete_post(
        &post,
        Some(&owner),
        |question| {
            prompt = question.to_string();
            false
        },
        backend.collection(),
        &backend.docs,
        &backend.blobs,
    )
    .await;
    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(prompt, DELETE_PROMPT);

    assert_eq!(backend.docs.calls().len(), docs_before);
    assert_eq!(backend.blobs.calls().len(), blobs_before);
    assert_eq!(backend.docs.dump(backend.collection()).len(), 1);
}

#[tokio::test]
async fn delete_removes_document_then_photo() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let with_photo = publish(&backend, &owner, "photo", true).await;
    let text_only = publish(&backend, &owner, "text", false).await;
    let photo_path = format!("tweets/{}/{}", owner.uid, with_photo.id);
    assert!(backend.blobs.contains(&photo_path));

    let outcome = delete_post(&with_photo, Some(&owner), |_| true, backend.collection(), &backend.docs, &backend.blobs).await;
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!backend.blobs.contains(&photo_path));

    let blob_deletes_before = backend.blobs.calls_of("delete").len();
    let outcome = delete_post(&text_only, Some(&owner), |_| true, backend.collection(), &backend.docs, &backend.blobs).await;
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(backend.blobs.calls_of("delete").len(), blob_deletes_before);
    assert!(backend.docs.dump(backend.collection()).is_empty());
}

#[tokio::test]
async fn failed_photo_delete_leaves_orphan() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let post = publish(&backend, &owner, "photo", true).await;
    backend
        .blobs
        .fail_next("delete", BackendError::new("storage/retry-limit-exceeded", "timed out"));

    let outcome = delete_post(&post, Some(&owner), |_| true, backend.collection(), &backend.docs, &backend.blobs).await;
    assert!(matches!(outcome, DeleteOutcome::Failed(ref err) if err.code == "storage/retry-limit-exceeded"));
    assert!(backend.docs.dump(backend.collection()).is_empty());
    assert_eq!(backend.blobs.len(), 1);
}

#[tokio::test]
async fn editor_patches_text_and_closes() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let post = publish(&backend, &owner, "before", false).await;

    let mut item = PostItem::new(post, Some(&owner), &backend.settings);
    item.toggle_edit();
    let editor = item.editor().unwrap();
    assert_eq!(editor.text(), "before");
    editor.set_text("after");

    let outcome = item.submit_edit(Some(&owner), &backend.docs, &backend.blobs).await;
    assert!(outcome.unwrap().is_done());
    assert!(!item.is_editing());

    let stored = &backend.docs.dump(backend.collection())[0];
    assert_eq!(stored.get("tweet"), Some(&Value::from("after")));
    assert!(stored.get("updateAt").and_then(Value::as_i64).is_some());
    assert!(stored.get("photo").is_none());
    assert!(backend.blobs.calls_of("upload").is_empty());
}

#[tokio::test]
async fn editor_replaces_photo_at_same_path() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let post = publish(&backend, &owner, "photo", true).await;
    let path = format!("tweets/{}/{}", owner.uid, post.id);

    let editor = Editor::seed(&post, backend.settings.limits(), backend.collection());
    assert_eq!(editor.current_photo(), post.photo.as_deref());
    let replacement = chirp::model::PhotoFile::new("new.jpg", "image/jpeg", vec![9; 32]);
    editor.attach(replacement).unwrap();

    let mut closed = 0;
    let outcome = editor.submit(Some(&owner), &backend.docs, &backend.blobs, || closed += 1).await;
    assert!(outcome.is_done());
    assert_eq!(closed, 1);
    assert_eq!(backend.blobs.len(), 1);
    assert_eq!(backend.blobs.bytes(&path), Some(vec![9; 32]));
    assert_eq!(backend.blobs.content_type(&path).as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn editor_refuses_oversized_file_and_keeps_text() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let post = publish(&backend, &owner, "text", false).await;
    let editor = Editor::seed(&post, backend.settings.limits(), backend.collection());
    editor.set_text("draft");
    editor.attach(photo(10)).unwrap();

    assert!(editor.attach(photo(ONE_MIB + 1)).unwrap_err().has_code("too_large"));
    assert_eq!(editor.attachment().unwrap().size(), 10);
    assert_eq!(editor.text(), "draft");
}

#[tokio::test]
async fn editor_failure_keeps_it_open_without_rollback() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let post = publish(&backend, &owner, "text", false).await;
    backend
        .blobs
        .fail_next("upload", BackendError::new("storage/quota-exceeded", "quota"));

    let mut item = PostItem::new(post, Some(&owner), &backend.settings);
    item.toggle_edit();
    let editor = item.editor().unwrap();
    editor.set_text("edited");
    editor.attach(photo(16)).unwrap();

    let outcome = item.submit_edit(Some(&owner), &backend.docs, &backend.blobs).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert!(item.is_editing());
    assert!(!item.editor().unwrap().is_submitting());
    // the text patch already landed
    let stored = &backend.docs.dump(backend.collection())[0];
    assert_eq!(stored.get("tweet"), Some(&Value::from("edited")));
}

#[tokio::test]
async fn editor_rejects_non_owner_and_bad_text() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let stranger = backend.verified_user("other@chirp.test", "other").await;
    let post = publish(&backend, &owner, "text", false).await;
    let editor = Editor::seed(&post, backend.settings.limits(), backend.collection());
    let updates_before = backend.docs.calls_of("update").len();

    let outcome = editor.submit(Some(&stranger), &backend.docs, &backend.blobs, || {}).await;
    assert_eq!(outcome, SubmitOutcome::NotOwner);

    editor.set_text("");
    let outcome = editor.submit(Some(&owner), &backend.docs, &backend.blobs, || {}).await;
    assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
    assert_eq!(backend.docs.calls_of("update").len(), updates_before);
}

#[tokio::test]
async fn remove_photo_deletes_blob_and_clears_field() {
    let backend = Backend::new();
    let owner = backend.verified_user("owner@chirp.test", "owner").await;
    let stranger = backend.verified_user("other@chirp.test", "other").await;
    let post = publish(&backend, &owner, "photo", true).await;

    let err = remove_photo(&post, Some(&stranger), backend.collection(), &backend.docs, &backend.blobs)
        .await
        .unwrap_err();
    assert!(matches!(err, ChirpError::Unauthorized { .. }));
    assert_eq!(backend.blobs.len(), 1);

    remove_photo(&post, Some(&owner), backend.collection(), &backend.docs, &backend.blobs)
        .await
        .unwrap();
    assert!(backend.blobs.is_empty());
    let stored = Post::from_document(&backend.docs.dump(backend.collection())[0]).unwrap();
    assert_eq!(stored.photo, None);
    assert_eq!(stored.tweet, "photo");
}

/// Holds every `update` until the gate opens.
struct GatedUpdates {
    inner: MemoryDocumentStore,
    gate: Arc<Notify>,
}

impl DocumentStore for GatedUpdates {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError> {
        self.inner.add(collection, fields).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), BackendError> {
        self.gate.notified().await;
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
async fn editor_refuses_second_submit_while_saving() {
    let backend = Backend::new();
    let owner = backend.verified_user("a@chirp.test", "ann").await;
    let post = publish(&backend, &owner, "before", false).await;
    let docs = GatedUpdates {
        inner: backend.docs.clone(),
        gate: Arc::new(Notify::new()),
    };

    let editor = Editor::seed(&post, backend.settings.limits(), backend.collection());
    editor.set_text("after");
    let closed = Cell::new(0);

    let first = editor.submit(Some(&owner), &docs, &backend.blobs, || closed.set(closed.get() + 1));
    tokio::pin!(first);
    assert!(futures::poll!(&mut first).is_pending());
    assert!(editor.is_submitting());

    let second = editor.submit(Some(&owner), &docs, &backend.blobs, || {}).await;
    assert_eq!(second, SubmitOutcome::Busy);
    docs.gate.notify_one();
    assert_eq!(first.await, SubmitOutcome::Done(post.id.clone()));

    assert_eq!(closed.get(), 1);
    assert_eq!(backend.docs.calls_of("update").len(), 1);
    assert!(!editor.is_submitting());
}
