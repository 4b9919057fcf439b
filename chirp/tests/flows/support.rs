use chirp::{
    IdentityProvider,
    backend::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider},
    config::ChirpSettings,
    model::{Identity, PhotoFile},
};

pub const PASSWORD: &str = "hunter22";

/// In-memory collaborators shared by one test.
pub struct Backend {
    pub identities: MemoryIdentityProvider,
    pub docs: MemoryDocumentStore,
    pub blobs: MemoryBlobStore,
    pub settings: ChirpSettings,
}

impl Backend {
    pub fn new() -> Self {
        Self {
            identities: MemoryIdentityProvider::new(),
            docs: MemoryDocumentStore::new(),
            blobs: MemoryBlobStore::new("https://files.test"),
            settings: ChirpSettings::default(),
        }
    }

    /// Signs up a verified user and leaves them signed in.
    pub async fn verified_user(&self, email: &str, name: &str) -> Identity {
        let identity = self.identities.sign_up(email, PASSWORD).await.expect("sign up");
        self.identities
            .update_profile(&identity, chirp::model::ProfileUpdate::display_name(name))
            .await
            .expect("set name");
        assert!(self.identities.mark_email_verified(email));
        self.identities.current_identity().await.expect("signed in")
    }

    pub fn collection(&self) -> &str {
        &self.settings.collection
    }
}

pub fn photo(size: usize) -> PhotoFile {
    PhotoFile::new("photo.png", "image/png", vec![0x42; size])
}

pub const ONE_MIB: usize = 1024 * 1024;
