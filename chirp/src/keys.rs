//! Key and path construction shared by the collaborators and the view models.

/// Blob path of a post's photo: `tweets/{uid}/{post id}`.
///
/// Editing a post uploads the replacement photo to the same path, so the
/// old object is overwritten instead of orphaned.
pub fn post_photo_path(user_id: &str, post_id: &str) -> String {
    format!("tweets/{user_id}/{post_id}")
}

/// Blob path of a user's avatar: `avatars/{uid}`.
pub fn avatar_path(user_id: &str) -> String {
    format!("avatars/{user_id}")
}

/// Redis key construction for the Redis-backed collaborators.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    pub fn document(&self, collection: &str, id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, id)
    }

    /// Sorted set holding every document id of a collection, scored by insertion sequence.
    pub fn collection_index(&self, collection: &str) -> String {
        format!("{}:{}:{}:idx", self.prefix, self.service, collection)
    }

    pub fn collection_sequence(&self, collection: &str) -> String {
        format!("{}:{}:{}:seq", self.prefix, self.service, collection)
    }

    /// Pub/sub channel announcing that a collection changed.
    pub fn changes_channel(&self, collection: &str) -> String {
        format!("{}:{}:changes:{}", self.prefix, self.service, collection)
    }

    pub fn blob(&self, path: &str) -> String {
        format!("{}:{}:blobs:{}", self.prefix, self.service, path)
    }
}
