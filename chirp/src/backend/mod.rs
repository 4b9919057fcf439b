//! Backend collaborator contracts.
//!
//! The client core never talks to a concrete service directly: identity,
//! documents, and blobs are reached through the traits below. Two sets of
//! implementations ship with the crate:
//! - [`memory`] - process-local collaborators with failure injection, used by tests and the tour
//! - [`redis`] - document and blob stores kept in Redis, with pub/sub change notification

pub mod memory;
pub mod redis;

use std::{
    cmp::Ordering,
    pin::Pin,
    task::{Context, Poll},
};

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    errors::BackendError,
    model::{Document, Fields, Identity, OAuthProvider, Persistence, PhotoFile, ProfileUpdate, Snapshot},
};

/// Identity provider: issues, persists, and updates user identities.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, BackendError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError>;
    async fn sign_in_with_provider(&self, provider: OAuthProvider) -> Result<Identity, BackendError>;
    async fn sign_out(&self) -> Result<(), BackendError>;
    /// Applies the update and returns the refreshed identity.
    async fn update_profile(&self, identity: &Identity, update: ProfileUpdate) -> Result<Identity, BackendError>;
    async fn send_verification_email(&self, identity: &Identity) -> Result<(), BackendError>;
    async fn send_password_reset_email(&self, email: &str) -> Result<(), BackendError>;
    async fn current_identity(&self) -> Option<Identity>;
    async fn set_persistence(&self, persistence: Persistence) -> Result<(), BackendError>;
}

/// Schemaless document store with live queries.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Stores a new document and returns its store-assigned id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError>;
    /// Merges `patch` into an existing document. A `null` value clears the field.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), BackendError>;
    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;
    /// Point-in-time result set.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError>;
    /// Live result set: the current snapshot is delivered first, then a new
    /// full snapshot after every change to it.
    async fn subscribe(&self, query: Query) -> Result<Subscription, BackendError>;
}

/// Reference to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: String,
    pub size: u64,
    pub content_type: String,
}

/// Binary object storage addressed by path.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Uploads `file` to `path`, overwriting any object already there.
    async fn upload(&self, path: &str, file: &PhotoFile) -> Result<BlobHandle, BackendError>;
    /// Resolves a download URL for an uploaded object.
    async fn download_url(&self, handle: &BlobHandle) -> Result<String, BackendError>;
    /// Deletes the object; fails with `storage/object-not-found` when absent.
    async fn delete(&self, path: &str) -> Result<(), BackendError>;
}

/// Builds the public download URL of an object, in the shape
/// `{base}/{encoded path}?alt=media&token={token}`.
pub fn download_url_for(base: &str, path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    let token = uuid::Uuid::new_v4();
    format!("{}/{encoded}?alt=media&token={token}", base.trim_end_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

/// Query over a single collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluates the query over documents given in the store's stable order.
    ///
    /// Documents lacking the order field are excluded. Ties keep the input
    /// order.
    pub fn evaluate<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|document| self.filters.iter().all(|filter| filter.matches(document)))
            .filter(|document| match &self.order_by {
                Some((field, _)) => document.get(field).is_some_and(|value| !value.is_null()),
                None => true,
            })
            .cloned()
            .collect();

        if let Some((field, order)) = &self.order_by {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Scoped registration of a live query.
///
/// Snapshots arrive through an unbounded channel. The registration is
/// released by [`Subscription::unsubscribe`] or when the value is dropped;
/// afterwards the producer stops and nothing else is delivered.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(receiver: mpsc::UnboundedReceiver<Snapshot>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next snapshot. `None` once the producer has gone away.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Returns a snapshot only if one is already queued.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}
