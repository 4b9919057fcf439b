//! A single post in a list: render decisions, the owner-only editor, and
//! the owner-only delete and photo removal actions.

use crate::{
    backend::{BlobStore, DocumentStore},
    config::{ChirpSettings, Limits},
    errors::{BackendError, ChirpError, ValidationError},
    forms::{Slot, SubmitFlag, SubmitOutcome},
    keys::post_photo_path,
    model::{Identity, Patch, PhotoFile, Post, now_millis},
    validators::{validate_photo, validate_tweet},
};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this tweet?";

/// What to draw in the avatar slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Url(String),
    Placeholder,
}

#[derive(Debug)]
pub struct PostItem {
    post: Post,
    can_manage: bool,
    limits: Limits,
    collection: String,
    editor: Option<Editor>,
}

impl PostItem {
    pub fn new(post: Post, viewer: Option<&Identity>, settings: &ChirpSettings) -> Self {
        let can_manage = post.is_owned_by(viewer);
        Self {
            post,
            can_manage,
            limits: settings.limits(),
            collection: settings.collection.clone(),
            editor: None,
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    /// Edit and delete controls are shown to the owner only.
    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    pub fn is_edited(&self) -> bool {
        self.post.is_edited()
    }

    pub fn avatar(&self) -> Avatar {
        match self.post.user_avatar.as_deref() {
            Some(url) if !url.is_empty() => Avatar::Url(url.to_string()),
            _ => Avatar::Placeholder,
        }
    }

    pub fn photo(&self) -> Option<&str> {
        self.post.photo.as_deref().filter(|url| !url.is_empty())
    }

    /// Text shown in place of the editor while it is closed.
    pub fn payload(&self) -> &str {
        &self.post.tweet
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    /// Opens an editor seeded from the post, or closes the open one.
    /// Does nothing for a viewer who does not own the post.
    pub fn toggle_edit(&mut self) {
        if !self.can_manage {
            return;
        }
        self.editor = match self.editor.take() {
            Some(_) => None,
            None => Some(Editor::seed(&self.post, self.limits, &self.collection)),
        };
    }

    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut Editor> {
        self.editor.as_mut()
    }

    /// Submits the open editor and closes it on success.
    pub async fn submit_edit<D, B>(&mut self, viewer: Option<&Identity>, docs: &D, blobs: &B) -> Option<SubmitOutcome>
    where
        D: DocumentStore,
        B: BlobStore,
    {
        let editor = self.editor.as_ref()?;
        let mut closed = false;
        let outcome = editor.submit(viewer, docs, blobs, || closed = true).await;
        if closed {
            self.editor = None;
        }
        Some(outcome)
    }
}

/// Edit form of an existing post.
#[derive(Debug)]
pub struct Editor {
    post_id: String,
    owner_id: String,
    current_photo: Option<String>,
    limits: Limits,
    collection: String,
    text: Slot<String>,
    file: Slot<Option<PhotoFile>>,
    submitting: SubmitFlag,
}

impl Editor {
    pub fn seed(post: &Post, limits: Limits, collection: &str) -> Self {
        Self {
            post_id: post.id.clone(),
            owner_id: post.user_id.clone(),
            current_photo: post.photo.clone(),
            limits,
            collection: collection.to_string(),
            text: Slot::new(post.tweet.clone()),
            file: Slot::default(),
            submitting: SubmitFlag::new(),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.text.set(text.into());
    }

    pub fn text(&self) -> String {
        self.text.get()
    }

    /// Photo shown until a replacement is chosen.
    pub fn current_photo(&self) -> Option<&str> {
        self.current_photo.as_deref()
    }

    /// Chooses a replacement photo; an oversized file keeps the current choice.
    pub fn attach(&self, file: PhotoFile) -> Result<(), ValidationError> {
        validate_photo(&file, &self.limits)?;
        self.file.set(Some(file));
        Ok(())
    }

    pub fn attachment(&self) -> Option<PhotoFile> {
        self.file.get()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    /// Patches the text, then replaces the photo if a new one was chosen,
    /// then calls `close`. A failure after the text patch is not rolled back.
    pub async fn submit<D, B, F>(&self, viewer: Option<&Identity>, docs: &D, blobs: &B, close: F) -> SubmitOutcome
    where
        D: DocumentStore,
        B: BlobStore,
        F: FnOnce(),
    {
        let Some(viewer) = viewer else {
            return SubmitOutcome::SignedOut;
        };
        if viewer.uid != self.owner_id {
            return SubmitOutcome::NotOwner;
        }
        if self.is_submitting() {
            return SubmitOutcome::Busy;
        }
        let text = self.text.get();
        if let Err(err) = validate_tweet(&text, &self.limits) {
            return SubmitOutcome::Rejected(err);
        }
        let Some(_in_flight) = self.submitting.try_begin() else {
            return SubmitOutcome::Busy;
        };
        let file = self.file.get();

        match self.apply(text, file.as_ref(), docs, blobs).await {
            Ok(()) => {
                log::info!("edited {}", self.post_id);
                close();
                SubmitOutcome::Done(self.post_id.clone())
            }
            Err(err) => {
                log::error!("failed to edit {}: {err}", self.post_id);
                SubmitOutcome::Failed(err)
            }
        }
    }

    async fn apply<D, B>(&self, text: String, file: Option<&PhotoFile>, docs: &D, blobs: &B) -> Result<(), BackendError>
    where
        D: DocumentStore,
        B: BlobStore,
    {
        let patch = Patch::new().set("tweet", text).set("updateAt", now_millis());
        docs.update(&self.collection, &self.post_id, patch.into_fields()).await?;
        if let Some(file) = file {
            let handle = blobs.upload(&post_photo_path(&self.owner_id, &self.post_id), file).await?;
            let url = blobs.download_url(&handle).await?;
            docs.update(&self.collection, &self.post_id, Patch::new().set("photo", url).into_fields())
                .await?;
        }
        Ok(())
    }
}

/// Result of the delete action.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation prompt was dismissed.
    Declined,
    NotOwner,
    /// Already logged. When the photo delete fails the document is gone and
    /// the photo stays orphaned.
    Failed(BackendError),
}

/// Deletes a post and then its photo.
///
/// `confirm` is asked first; nothing reaches the stores when it declines or
/// when the viewer does not own the post.
pub async fn delete_post<D, B, F>(
    post: &Post,
    viewer: Option<&Identity>,
    confirm: F,
    collection: &str,
    docs: &D,
    blobs: &B,
) -> DeleteOutcome
where
    D: DocumentStore,
    B: BlobStore,
    F: FnOnce(&str) -> bool,
{
    let confirmed = confirm(DELETE_PROMPT);
    if !post.is_owned_by(viewer) {
        return DeleteOutcome::NotOwner;
    }
    if !confirmed {
        return DeleteOutcome::Declined;
    }

    let result = async {
        docs.delete(collection, &post.id).await?;
        if post.photo.is_some() {
            blobs.delete(&post_photo_path(&post.user_id, &post.id)).await?;
        }
        Ok::<_, BackendError>(())
    }
    .await;

    match result {
        Ok(()) => {
            log::info!("deleted {}", post.id);
            DeleteOutcome::Deleted
        }
        Err(err) => {
            log::error!("failed to delete {}: {err}", post.id);
            DeleteOutcome::Failed(err)
        }
    }
}

/// Removes the photo of a post, keeping its text.
///
/// The blob goes first, then the `photo` field is cleared.
pub async fn remove_photo<D, B>(
    post: &Post,
    viewer: Option<&Identity>,
    collection: &str,
    docs: &D,
    blobs: &B,
) -> Result<(), ChirpError>
where
    D: DocumentStore,
    B: BlobStore,
{
    if !post.is_owned_by(viewer) {
        return Err(ChirpError::Unauthorized {
            action: "remove the photo of this post",
        });
    }
    if post.photo.is_none() {
        return Err(ChirpError::NotFound {
            id: Some(post.id.clone()),
        });
    }
    blobs.delete(&post_photo_path(&post.user_id, &post.id)).await?;
    docs.update(collection, &post.id, Patch::new().clear("photo").into_fields())
        .await?;
    log::info!("removed photo of {}", post.id);
    Ok(())
}
