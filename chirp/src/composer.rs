//! Form for writing a new post.

use crate::{
    backend::{BlobStore, DocumentStore},
    config::{ChirpSettings, Limits},
    errors::{BackendError, ValidationError},
    forms::{Slot, SubmitFlag, SubmitOutcome},
    keys::post_photo_path,
    model::{Identity, NewPost, Patch, PhotoFile},
    validators::{validate_photo, validate_tweet},
};

#[derive(Debug)]
pub struct Composer {
    limits: Limits,
    collection: String,
    anonymous_name: String,
    text: Slot<String>,
    file: Slot<Option<PhotoFile>>,
    submitting: SubmitFlag,
}

impl Composer {
    pub fn new(settings: &ChirpSettings) -> Self {
        Self {
            limits: settings.limits(),
            collection: settings.collection.clone(),
            anonymous_name: settings.anonymous_name.clone(),
            text: Slot::default(),
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

    /// Selects a photo. An oversized file is refused and the current
    /// selection is kept.
    pub fn attach(&self, file: PhotoFile) -> Result<(), ValidationError> {
        validate_photo(&file, &self.limits)?;
        self.file.set(Some(file));
        Ok(())
    }

    pub fn clear_attachment(&self) {
        self.file.set(None);
    }

    pub fn attachment(&self) -> Option<PhotoFile> {
        self.file.get()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    /// Whether the submit button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && self.text.update(|text| validate_tweet(text, &self.limits).is_ok())
    }

    /// Creates the post, then uploads and links the photo if one is attached.
    ///
    /// Nothing is sent to the store when signed out, busy, or when the text
    /// is invalid. A backend failure is logged and leaves the form as is.
    pub async fn submit<D, B>(&self, author: Option<&Identity>, docs: &D, blobs: &B) -> SubmitOutcome
    where
        D: DocumentStore,
        B: BlobStore,
    {
        let Some(author) = author else {
            return SubmitOutcome::SignedOut;
        };
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

        match self.publish(author, text, file.as_ref(), docs, blobs).await {
            Ok(id) => {
                log::info!("posted {id}");
                self.text.set(String::new());
                self.file.set(None);
                SubmitOutcome::Done(id)
            }
            Err(err) => {
                log::error!("failed to post: {err}");
                SubmitOutcome::Failed(err)
            }
        }
    }

    async fn publish<D, B>(
        &self,
        author: &Identity,
        text: String,
        file: Option<&PhotoFile>,
        docs: &D,
        blobs: &B,
    ) -> Result<String, BackendError>
    where
        D: DocumentStore,
        B: BlobStore,
    {
        let post = NewPost::from_author(author, text, &self.anonymous_name);
        let id = docs.add(&self.collection, post.into_fields()).await?;
        if let Some(file) = file {
            let handle = blobs.upload(&post_photo_path(&author.uid, &id), file).await?;
            let url = blobs.download_url(&handle).await?;
            docs.update(&self.collection, &id, Patch::new().set("photo", url).into_fields())
                .await?;
        }
        Ok(id)
    }
}
