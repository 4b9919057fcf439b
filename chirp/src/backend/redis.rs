//! Redis-backed document and blob stores.
//!
//! Document bodies are JSON strings; a sorted set per collection records the
//! insertion sequence, which is the stable tie-break order for queries.
//! Queries are evaluated client-side over the whole collection, so this
//! store suits small deployments and local development.
//!
//! Every mutation publishes on the collection's change channel. A live query
//! owns a dedicated pub/sub connection and a task that re-runs the query on
//! each notification; releasing the subscription aborts that task.

use futures::StreamExt;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::mpsc;

use super::{BlobHandle, BlobStore, DocumentStore, Query, Subscription, download_url_for};
use crate::{
    config::{ChirpConfig, RedisSettings},
    errors::BackendError,
    id::generate_document_id,
    keys::KeyContext,
    model::{Document, Fields, PhotoFile, Snapshot},
};

/// Delete all keys matching a pattern (for test cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_pattern(conn: &mut ConnectionManager, pattern: &str) -> Result<u64, BackendError> {
    const SCAN_COUNT: usize = 1000;
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(total_deleted)
}

/// Connection shared by both Redis stores.
#[derive(Clone)]
pub struct RedisConnection {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
    service: String,
}

impl RedisConnection {
    pub async fn connect(url: &str, prefix: impl Into<String>, service: impl Into<String>) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            prefix: prefix.into(),
            service: service.into(),
        })
    }

    pub async fn from_settings(settings: &RedisSettings) -> Result<Self, BackendError> {
        let url = settings
            .resolved_url()
            .map_err(|err| BackendError::new("redis/invalid-config", err.to_string()))?;
        Self::connect(&url, settings.prefix.clone(), settings.service.clone()).await
    }

    pub fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service)
    }

    /// Get a clone of the connection manager for advanced operations.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Pattern matching every key written under this prefix and service.
    pub fn key_pattern(&self) -> String {
        format!("{}:{}:*", self.prefix, self.service)
    }
}

#[derive(Clone)]
pub struct RedisDocumentStore {
    redis: RedisConnection,
}

impl RedisDocumentStore {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }

    pub async fn from_config(config: &ChirpConfig) -> Result<Self, BackendError> {
        Ok(Self::new(RedisConnection::from_settings(&config.redis).await?))
    }

    pub fn connection(&self) -> &RedisConnection {
        &self.redis
    }

    async fn publish_change(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let channel = self.redis.keys().changes_channel(collection);
        let mut conn = self.redis.connection();
        let _: i64 = conn.publish(channel, id).await?;
        Ok(())
    }

    /// Loads every document of a collection in insertion order.
    async fn load_collection(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let keys = self.redis.keys();
        let mut conn = self.redis.connection();
        let ids: Vec<String> = conn.zrange(keys.collection_index(collection), 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let document_keys: Vec<String> = ids.iter().map(|id| keys.document(collection, id)).collect();
        let bodies: Vec<Option<String>> = redis::cmd("MGET").arg(&document_keys).query_async(&mut conn).await?;

        let mut documents = Vec::with_capacity(ids.len());
        for (id, body) in ids.into_iter().zip(bodies) {
            // index entries can briefly outlive a concurrent delete
            let Some(body) = body else { continue };
            documents.push(Document::new(id, serde_json::from_str(&body)?));
        }
        Ok(documents)
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        let documents = self.load_collection(&query.collection).await?;
        Ok(query.evaluate(&documents))
    }
}

impl DocumentStore for RedisDocumentStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError> {
        let keys = self.redis.keys();
        let mut conn = self.redis.connection();
        let id = generate_document_id();
        let body = serde_json::to_string(&fields)?;
        let sequence: i64 = conn.incr(keys.collection_sequence(collection), 1).await?;

        let _: () = redis::pipe()
            .atomic()
            .set(keys.document(collection, &id), body)
            .ignore()
            .zadd(keys.collection_index(collection), &id, sequence)
            .ignore()
            .query_async(&mut conn)
            .await?;

        self.publish_change(collection, &id).await?;
        log::debug!("added {collection}/{id}");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), BackendError> {
        let key = self.redis.keys().document(collection, id);
        let mut conn = self.redis.connection();
        let body: Option<String> = conn.get(&key).await?;
        let Some(body) = body else {
            return Err(BackendError::not_found("documents", format!("document {collection}/{id}")));
        };

        let mut fields: Fields = serde_json::from_str(&body)?;
        for (field, value) in patch {
            fields.insert(field, value);
        }

        // XX: only write if the document was not deleted in the meantime
        let written: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(serde_json::to_string(&fields)?)
            .arg("XX")
            .query_async(&mut conn)
            .await?;
        if written.is_none() {
            return Err(BackendError::not_found("documents", format!("document {collection}/{id}")));
        }

        self.publish_change(collection, id).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let keys = self.redis.keys();
        let mut conn = self.redis.connection();
        let _: () = redis::pipe()
            .atomic()
            .del(keys.document(collection, id))
            .ignore()
            .zrem(keys.collection_index(collection), id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        self.publish_change(collection, id).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let mut conn = self.redis.connection();
        let body: Option<String> = conn.get(self.redis.keys().document(collection, id)).await?;
        match body {
            Some(body) => Ok(Some(Document::new(id, serde_json::from_str(&body)?))),
            None => Ok(None),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        self.run_query(query).await
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, BackendError> {
        let channel = self.redis.keys().changes_channel(&query.collection);
        let mut pubsub = self.redis.client.get_async_pubsub().await?;
        // subscribe before the first read so no change can slip in between
        pubsub.subscribe(&channel).await?;

        let initial = Snapshot::new(self.run_query(&query).await?);
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(initial.clone());

        let store = self.clone();
        let task = tokio::spawn(async move {
            let mut last = initial;
            let mut messages = pubsub.into_on_message();
            while messages.next().await.is_some() {
                let snapshot = match store.run_query(&query).await {
                    Ok(documents) => Snapshot::new(documents),
                    Err(err) => {
                        log::error!("live query on {} failed: {err}", query.collection);
                        continue;
                    }
                };
                if snapshot == last {
                    continue;
                }
                if sender.send(snapshot.clone()).is_err() {
                    break;
                }
                last = snapshot;
            }
            log::debug!("live query on {} stopped", query.collection);
        });

        Ok(Subscription::new(receiver, move || task.abort()))
    }
}

/// Blob store keeping object bytes in Redis hashes.
#[derive(Clone)]
pub struct RedisBlobStore {
    redis: RedisConnection,
    base_url: String,
}

impl RedisBlobStore {
    pub fn new(redis: RedisConnection, base_url: impl Into<String>) -> Self {
        Self {
            redis,
            base_url: base_url.into(),
        }
    }
}

impl BlobStore for RedisBlobStore {
    async fn upload(&self, path: &str, file: &PhotoFile) -> Result<BlobHandle, BackendError> {
        let mut conn = self.redis.connection();
        let _: () = redis::pipe()
            .atomic()
            .del(self.redis.keys().blob(path))
            .ignore()
            .hset_multiple(
                self.redis.keys().blob(path),
                &[("content_type", file.content_type.as_bytes()), ("data", file.bytes.as_slice())],
            )
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(BlobHandle {
            path: path.to_string(),
            size: file.size(),
            content_type: file.content_type.clone(),
        })
    }

    async fn download_url(&self, handle: &BlobHandle) -> Result<String, BackendError> {
        let mut conn = self.redis.connection();
        let exists: bool = conn.exists(self.redis.keys().blob(&handle.path)).await?;
        if !exists {
            return Err(BackendError::new(
                "storage/object-not-found",
                format!("object '{}' does not exist", handle.path),
            ));
        }
        Ok(download_url_for(&self.base_url, &handle.path))
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let mut conn = self.redis.connection();
        let deleted: u64 = conn.del(self.redis.keys().blob(path)).await?;
        if deleted == 0 {
            return Err(BackendError::new(
                "storage/object-not-found",
                format!("object '{path}' does not exist"),
            ));
        }
        Ok(())
    }
}
