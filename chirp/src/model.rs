//! Records exchanged with the backend collaborators.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::BackendError;

/// Schemaless document body as stored in the document store.
pub type Fields = Map<String, Value>;

/// A stored document: store-assigned id plus its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Full result set of a query at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A short text post.
///
/// `id` lives outside the document body; `username` and `user_avatar` are
/// copied from the author at creation time and are not refreshed when the
/// author later edits their profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(skip)]
    pub id: String,
    pub tweet: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    pub create_at: i64,
    #[serde(default)]
    pub update_at: Option<i64>,
}

impl Post {
    pub fn from_document(document: &Document) -> Result<Self, BackendError> {
        let mut post: Post = serde_json::from_value(Value::Object(document.fields.clone()))?;
        post.id = document.id.clone();
        Ok(post)
    }

    pub fn is_owned_by(&self, identity: Option<&Identity>) -> bool {
        identity.is_some_and(|identity| identity.uid == self.user_id)
    }

    pub fn is_edited(&self) -> bool {
        self.update_at.is_some()
    }
}

/// Body of a post document at creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub tweet: String,
    pub create_at: i64,
    pub username: String,
    pub user_id: String,
    pub user_avatar: Option<String>,
}

impl NewPost {
    pub fn from_author(author: &Identity, tweet: impl Into<String>, anonymous_name: &str) -> Self {
        Self {
            tweet: tweet.into(),
            create_at: now_millis(),
            username: author.display_name_or(anonymous_name).to_string(),
            user_id: author.uid.clone(),
            user_avatar: author.photo_url.clone(),
        }
    }

    pub fn into_fields(self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Fields::new(),
        }
    }
}

/// Builder for partial document updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Fields,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Sets the field to `null`, which decodes as absent.
    pub fn clear(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), Value::Null);
        self
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

/// How a sign-in survives restarts of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Kept until explicit sign-out.
    #[default]
    Local,
    /// Dropped when the client session ends.
    Session,
    /// Kept in memory only.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    GitHub,
}

impl OAuthProvider {
    pub fn id(self) -> &'static str {
        match self {
            OAuthProvider::GitHub => "github.com",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    Password,
    OAuth(OAuthProvider),
}

/// A user identity issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub method: SignInMethod,
}

impl Identity {
    pub fn display_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => fallback,
        }
    }
}

/// Fields an identity may change about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn photo_url(url: impl Into<String>) -> Self {
        Self {
            photo_url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// A file picked by the user for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Epoch milliseconds, the timestamp format of `createAt`/`updateAt`.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
