//! Process-local collaborators.
//!
//! Each store is a cheap cloneable handle over shared state, so a test can
//! keep one clone for assertions while the view models use another. Every
//! call is recorded in a journal, and a failure can be queued per operation
//! with `fail_next`.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde_json::Value;
use tokio::sync::mpsc;

use super::{BlobHandle, BlobStore, DocumentStore, IdentityProvider, Query, Subscription, download_url_for};
use crate::{
    errors::BackendError,
    id::{generate_document_id, generate_uid},
    model::{Document, Fields, Identity, OAuthProvider, Persistence, PhotoFile, ProfileUpdate, SignInMethod, Snapshot},
    validators::{is_valid_email, is_valid_url},
};

const MIN_PASSWORD_LEN: usize = 6;

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub target: String,
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<Call>,
    faults: HashMap<&'static str, VecDeque<BackendError>>,
}

impl Journal {
    /// Records the call and returns the queued failure for it, if any.
    fn record(&mut self, op: &'static str, target: impl Into<String>) -> Result<(), BackendError> {
        self.calls.push(Call {
            op,
            target: target.into(),
        });
        match self.faults.get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail_next(&mut self, op: &'static str, err: BackendError) {
        self.faults.entry(op).or_default().push_back(err);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════════════════════════

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<Snapshot>,
    last: Option<Snapshot>,
}

#[derive(Default)]
struct DocumentState {
    collections: HashMap<String, Vec<Document>>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    journal: Journal,
}

impl DocumentState {
    fn documents(&self, collection: &str) -> &[Document] {
        self.collections.get(collection).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pushes a fresh snapshot to every live query whose result set changed.
    fn notify(&mut self, collection: &str) {
        let mut closed = Vec::new();
        for (id, subscriber) in self.subscribers.iter_mut() {
            if subscriber.query.collection != collection {
                continue;
            }
            let docs = self.collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
            let snapshot = Snapshot::new(subscriber.query.evaluate(docs));
            if subscriber.last.as_ref() == Some(&snapshot) {
                continue;
            }
            if subscriber.sender.send(snapshot.clone()).is_err() {
                closed.push(*id);
            } else {
                subscriber.last = Some(snapshot);
            }
        }
        for id in closed {
            self.subscribers.remove(&id);
        }
    }
}

/// In-memory document store. Insertion order is the tie-break order.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<DocumentState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure for the next call of `op` (`add`, `update`, `delete`, `get`, `query`, `subscribe`).
    pub fn fail_next(&self, op: &'static str, err: BackendError) {
        lock(&self.state).journal.fail_next(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).journal.calls.clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.op == op).collect()
    }

    pub fn live_subscriptions(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// Snapshot of a whole collection in store order, bypassing the journal.
    pub fn dump(&self, collection: &str) -> Vec<Document> {
        lock(&self.state).documents(collection).to_vec()
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("add", collection)?;
        let id = generate_document_id();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        state.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("update", format!("{collection}/{id}"))?;
        let document = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| BackendError::not_found("documents", format!("document {collection}/{id}")))?;
        for (field, value) in patch {
            document.fields.insert(field, value);
        }
        state.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("delete", format!("{collection}/{id}"))?;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        state.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("get", format!("{collection}/{id}"))?;
        Ok(state.documents(collection).iter().find(|doc| doc.id == id).cloned())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("query", query.collection.as_str())?;
        Ok(query.evaluate(state.documents(&query.collection)))
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("subscribe", query.collection.as_str())?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = Snapshot::new(query.evaluate(state.documents(&query.collection)));
        // The receiver is alive, the send cannot fail.
        let _ = sender.send(initial.clone());

        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(
            id,
            Subscriber {
                query,
                sender,
                last: Some(initial),
            },
        );

        let registry: Weak<Mutex<DocumentState>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(receiver, move || {
            if let Some(state) = registry.upgrade() {
                lock(&state).subscribers.remove(&id);
            }
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Blobs
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct BlobState {
    objects: HashMap<String, StoredBlob>,
    journal: Journal,
}

/// In-memory blob store.
#[derive(Clone)]
pub struct MemoryBlobStore {
    base_url: String,
    state: Arc<Mutex<BlobState>>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(crate::config::StorageSettings::default().download_base_url)
    }
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::default(),
        }
    }

    /// Queues a failure for the next call of `op` (`upload`, `download_url`, `delete`).
    pub fn fail_next(&self, op: &'static str, err: BackendError) {
        lock(&self.state).journal.fail_next(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).journal.calls.clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.op == op).collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.state).objects.contains_key(path)
    }

    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).objects.get(path).map(|blob| blob.bytes.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        lock(&self.state).objects.get(path).map(|blob| blob.content_type.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.state).objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn object_not_found(path: &str) -> BackendError {
    BackendError::new("storage/object-not-found", format!("object '{path}' does not exist"))
}

impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, file: &PhotoFile) -> Result<BlobHandle, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("upload", path)?;
        state.objects.insert(
            path.to_string(),
            StoredBlob {
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            },
        );
        Ok(BlobHandle {
            path: path.to_string(),
            size: file.size(),
            content_type: file.content_type.clone(),
        })
    }

    async fn download_url(&self, handle: &BlobHandle) -> Result<String, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("download_url", handle.path.as_str())?;
        if !state.objects.contains_key(&handle.path) {
            return Err(object_not_found(&handle.path));
        }
        Ok(download_url_for(&self.base_url, &handle.path))
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("delete", path)?;
        state.objects.remove(path).map(|_| ()).ok_or_else(|| object_not_found(path))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// An email the provider would have delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
}

struct Account {
    password: Option<String>,
    identity: Identity,
}

#[derive(Default)]
struct IdentityState {
    accounts: Vec<Account>,
    current: Option<Identity>,
    persistence: Persistence,
    outbox: Vec<SentEmail>,
    journal: Journal,
}

impl IdentityState {
    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.password.is_some() && account.identity.email.as_deref() == Some(email))
    }

    fn account_by_uid_mut(&mut self, uid: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.identity.uid == uid)
    }
}

fn auth_error(reason: &str, message: &str) -> BackendError {
    BackendError::new(format!("auth/{reason}"), message)
}

fn check_email(email: &str) -> Result<(), BackendError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(auth_error("invalid-email", "the email address is badly formatted"))
    }
}

/// In-memory identity provider with an outbox instead of real email delivery.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<IdentityState>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure for the next call of `op` (method name, e.g. `sign_in`).
    pub fn fail_next(&self, op: &'static str, err: BackendError) {
        lock(&self.state).journal.fail_next(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).journal.calls.clone()
    }

    pub fn outbox(&self) -> Vec<SentEmail> {
        lock(&self.state).outbox.clone()
    }

    pub fn persistence(&self) -> Persistence {
        lock(&self.state).persistence
    }

    /// Simulates the user following the link of a verification email.
    pub fn mark_email_verified(&self, email: &str) -> bool {
        let mut state = lock(&self.state);
        let Some(uid) = state.account_by_email(email).map(|account| account.identity.uid.clone()) else {
            return false;
        };
        if let Some(account) = state.account_by_uid_mut(&uid) {
            account.identity.email_verified = true;
        }
        if let Some(current) = state.current.as_mut().filter(|current| current.uid == uid) {
            current.email_verified = true;
        }
        true
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("sign_up", email)?;
        check_email(email)?;
        if password.is_empty() {
            return Err(auth_error("missing-password", "a password is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(auth_error("weak-password", "password should be at least 6 characters"));
        }
        if state.account_by_email(email).is_some() {
            return Err(auth_error("email-already-in-use", "the email address is already in use"));
        }
        let identity = Identity {
            uid: generate_uid(),
            email: Some(email.to_string()),
            display_name: None,
            photo_url: None,
            email_verified: false,
            method: SignInMethod::Password,
        };
        state.accounts.push(Account {
            password: Some(password.to_string()),
            identity: identity.clone(),
        });
        state.current = Some(identity.clone());
        log::info!("created account {}", identity.uid);
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("sign_in", email)?;
        check_email(email)?;
        let identity = state
            .account_by_email(email)
            .filter(|account| account.password.as_deref() == Some(password))
            .map(|account| account.identity.clone())
            .ok_or_else(|| auth_error("invalid-credential", "invalid login credentials"))?;
        state.current = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_in_with_provider(&self, provider: OAuthProvider) -> Result<Identity, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("sign_in_with_provider", provider.id())?;
        let existing = state
            .accounts
            .iter()
            .find(|account| account.identity.method == SignInMethod::OAuth(provider))
            .map(|account| account.identity.clone());
        let identity = match existing {
            Some(identity) => identity,
            None => {
                let identity = Identity {
                    uid: generate_uid(),
                    email: None,
                    display_name: None,
                    photo_url: None,
                    email_verified: true,
                    method: SignInMethod::OAuth(provider),
                };
                state.accounts.push(Account {
                    password: None,
                    identity: identity.clone(),
                });
                identity
            }
        };
        state.current = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("sign_out", "")?;
        state.current = None;
        Ok(())
    }

    async fn update_profile(&self, identity: &Identity, update: ProfileUpdate) -> Result<Identity, BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("update_profile", identity.uid.as_str())?;
        if let Some(url) = update.photo_url.as_deref()
            && !is_valid_url(url)
        {
            return Err(auth_error("invalid-profile-attribute", "photo URL must be a valid URL"));
        }
        let account = state
            .account_by_uid_mut(&identity.uid)
            .ok_or_else(|| auth_error("user-not-found", "no user record for this identity"))?;
        if let Some(name) = update.display_name {
            account.identity.display_name = Some(name);
        }
        if let Some(url) = update.photo_url {
            account.identity.photo_url = Some(url);
        }
        let updated = account.identity.clone();
        if state.current.as_ref().is_some_and(|current| current.uid == updated.uid) {
            state.current = Some(updated.clone());
        }
        Ok(updated)
    }

    async fn send_verification_email(&self, identity: &Identity) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("send_verification_email", identity.uid.as_str())?;
        let email = state
            .account_by_uid_mut(&identity.uid)
            .and_then(|account| account.identity.email.clone())
            .ok_or_else(|| auth_error("user-not-found", "no email address for this identity"))?;
        state.outbox.push(SentEmail {
            kind: EmailKind::Verification,
            to: email,
        });
        Ok(())
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("send_password_reset_email", email)?;
        check_email(email)?;
        if state.account_by_email(email).is_none() {
            return Err(auth_error("user-not-found", "no user record for this email"));
        }
        state.outbox.push(SentEmail {
            kind: EmailKind::PasswordReset,
            to: email.to_string(),
        });
        Ok(())
    }

    async fn current_identity(&self) -> Option<Identity> {
        lock(&self.state).current.clone()
    }

    async fn set_persistence(&self, persistence: Persistence) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.journal.record("set_persistence", format!("{persistence:?}"))?;
        state.persistence = persistence;
        Ok(())
    }
}

/// Shorthand for building a document body in tests and demos.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
