//! Post lists: the live timeline and the one-shot profile feed.

use crate::{
    backend::{DocumentStore, Filter, Query, SortOrder, Subscription},
    config::Limits,
    errors::BackendError,
    model::{Post, Snapshot},
};

pub const ORDER_FIELD: &str = "createAt";
pub const OWNER_FIELD: &str = "userId";

/// Newest posts first, capped at the feed limit.
pub fn timeline_query(limits: &Limits, collection: &str) -> Query {
    Query::collection(collection)
        .order_by(ORDER_FIELD, SortOrder::Desc)
        .limit(limits.feed_limit)
}

/// Newest posts of one user first, capped at the feed limit.
pub fn profile_query(user_id: &str, limits: &Limits, collection: &str) -> Query {
    Query::collection(collection)
        .filter(Filter::eq(OWNER_FIELD, user_id))
        .order_by(ORDER_FIELD, SortOrder::Desc)
        .limit(limits.feed_limit)
}

/// Decodes a snapshot in order. Documents that are not posts are skipped.
pub fn decode_snapshot(snapshot: &Snapshot) -> Vec<Post> {
    decode_documents(&snapshot.documents)
}

fn decode_documents(documents: &[crate::model::Document]) -> Vec<Post> {
    documents
        .iter()
        .filter_map(|document| match Post::from_document(document) {
            Ok(post) => Some(post),
            Err(err) => {
                log::warn!("skipping document {}: {err}", document.id);
                None
            }
        })
        .collect()
}

/// Live list of the newest posts.
///
/// Mounting registers a live query; each delivered snapshot replaces the
/// whole list. Unmounting releases the registration.
#[derive(Debug)]
pub struct Timeline {
    posts: Vec<Post>,
    subscription: Option<Subscription>,
}

impl Timeline {
    pub async fn mount<D: DocumentStore>(store: &D, limits: &Limits, collection: &str) -> Result<Self, BackendError> {
        let subscription = store.subscribe(timeline_query(limits, collection)).await?;
        Ok(Self {
            posts: Vec::new(),
            subscription: Some(subscription),
        })
    }

    /// Builds a timeline over an already established subscription.
    pub fn with_subscription(subscription: Subscription) -> Self {
        Self {
            posts: Vec::new(),
            subscription: Some(subscription),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Replaces the displayed list with the decoding of `snapshot`.
    pub fn apply(&mut self, snapshot: &Snapshot) {
        self.posts = decode_snapshot(snapshot);
    }

    /// Waits for the next snapshot and applies it.
    ///
    /// Returns `false` when unmounted or when the store ended the subscription.
    pub async fn next(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next_snapshot().await {
            Some(snapshot) => {
                self.apply(&snapshot);
                true
            }
            None => {
                self.subscription = None;
                false
            }
        }
    }

    /// Applies every snapshot already delivered, without waiting.
    /// Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let mut latest = None;
        let mut applied = 0;
        while let Some(snapshot) = subscription.try_next() {
            latest = Some(snapshot);
            applied += 1;
        }
        if let Some(snapshot) = latest {
            self.apply(&snapshot);
        }
        applied
    }

    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Point-in-time list of one user's posts. Does not follow later changes.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    user_id: String,
    query: Query,
    posts: Vec<Post>,
}

impl ProfileFeed {
    pub async fn fetch<D: DocumentStore>(
        store: &D,
        user_id: &str,
        limits: &Limits,
        collection: &str,
    ) -> Result<Self, BackendError> {
        let query = profile_query(user_id, limits, collection);
        let posts = decode_documents(&store.query(&query).await?);
        Ok(Self {
            user_id: user_id.to_string(),
            query,
            posts,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Runs the query again on demand.
    pub async fn refresh<D: DocumentStore>(&mut self, store: &D) -> Result<(), BackendError> {
        self.posts = decode_documents(&store.query(&self.query).await?);
        Ok(())
    }
}
