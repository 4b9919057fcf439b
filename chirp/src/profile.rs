//! Profile page of the signed-in user: name, avatar, and their posts.
//!
//! Changing the name or avatar only touches the identity. Posts written
//! earlier keep the `username` and `userAvatar` they were created with.

use crate::{
    backend::{BlobStore, DocumentStore, IdentityProvider},
    config::{ChirpSettings, Limits},
    errors::ChirpError,
    feed::ProfileFeed,
    forms::{Slot, SubmitFlag},
    keys::avatar_path,
    model::{Identity, PhotoFile, Post, ProfileUpdate},
    validators::{truncate_units, validate_display_name},
};

#[derive(Debug)]
pub struct ProfileView {
    user_id: String,
    anonymous_name: String,
    name: Slot<String>,
    avatar: Slot<Option<String>>,
    feed: ProfileFeed,
    name_editor: NameEditor,
}

impl ProfileView {
    /// Reads the identity and fetches the user's posts once.
    pub async fn load<D: DocumentStore>(
        identity: &Identity,
        docs: &D,
        settings: &ChirpSettings,
    ) -> Result<Self, ChirpError> {
        let feed = ProfileFeed::fetch(docs, &identity.uid, &settings.limits(), &settings.collection).await?;
        let name = identity.display_name_or(&settings.anonymous_name).to_string();
        Ok(Self {
            user_id: identity.uid.clone(),
            anonymous_name: settings.anonymous_name.clone(),
            name_editor: NameEditor::new(settings.limits()),
            name: Slot::new(name),
            avatar: Slot::new(identity.photo_url.clone()),
            feed,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn name(&self) -> String {
        self.name.get()
    }

    pub fn avatar(&self) -> Option<String> {
        self.avatar.get()
    }

    pub fn posts(&self) -> &[Post] {
        self.feed.posts()
    }

    pub async fn refresh<D: DocumentStore>(&mut self, docs: &D) -> Result<(), ChirpError> {
        self.feed.refresh(docs).await?;
        Ok(())
    }

    /// Uploads a new avatar to `avatars/{uid}` and points the identity at it.
    pub async fn change_avatar<P, B>(
        &self,
        file: &PhotoFile,
        identity: Option<&Identity>,
        provider: &P,
        blobs: &B,
    ) -> Result<Identity, ChirpError>
    where
        P: IdentityProvider,
        B: BlobStore,
    {
        let identity = identity.ok_or(ChirpError::Unauthorized {
            action: "change the avatar",
        })?;
        let handle = blobs.upload(&avatar_path(&identity.uid), file).await?;
        let url = blobs.download_url(&handle).await?;
        self.avatar.set(Some(url.clone()));
        let updated = provider.update_profile(identity, ProfileUpdate::photo_url(url)).await?;
        log::info!("changed avatar of {}", identity.uid);
        Ok(updated)
    }

    pub fn name_editor(&self) -> &NameEditor {
        &self.name_editor
    }

    /// Opens the name editor seeded with the current name, or closes it.
    pub fn toggle_name_editor(&self) {
        self.name_editor.toggle(&self.name.get());
    }

    /// Saves the drafted name and closes the editor.
    ///
    /// Returns `Ok(None)` when nothing was sent: editor closed, signed out,
    /// or a save already in flight.
    pub async fn save_name<P: IdentityProvider>(
        &self,
        identity: Option<&Identity>,
        provider: &P,
    ) -> Result<Option<Identity>, ChirpError> {
        let Some(updated) = self.name_editor.submit(identity, provider).await? else {
            return Ok(None);
        };
        self.name
            .set(updated.display_name_or(&self.anonymous_name).to_string());
        Ok(Some(updated))
    }
}

/// Inline editor of the display name.
#[derive(Debug)]
pub struct NameEditor {
    limits: Limits,
    open: Slot<bool>,
    draft: Slot<String>,
    saving: SubmitFlag,
}

impl NameEditor {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            open: Slot::new(false),
            draft: Slot::default(),
            saving: SubmitFlag::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn toggle(&self, current_name: &str) {
        let open = self.open.update(|open| {
            *open = !*open;
            *open
        });
        if open {
            self.draft.set(current_name.to_string());
        }
    }

    /// Replaces the draft, cut to the name length limit the input enforces.
    pub fn set_draft(&self, name: &str) {
        self.draft
            .set(truncate_units(name, self.limits.max_display_name_chars));
    }

    pub fn draft(&self) -> String {
        self.draft.get()
    }

    pub async fn submit<P: IdentityProvider>(
        &self,
        identity: Option<&Identity>,
        provider: &P,
    ) -> Result<Option<Identity>, ChirpError> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        if !self.is_open() {
            return Ok(None);
        }
        let draft = self.draft.get();
        validate_display_name(&draft, &self.limits)?;
        let Some(_in_flight) = self.saving.try_begin() else {
            return Ok(None);
        };

        let updated = provider
            .update_profile(identity, ProfileUpdate::display_name(draft))
            .await?;
        self.open.set(false);
        log::info!("renamed {}", identity.uid);
        Ok(Some(updated))
    }
}
