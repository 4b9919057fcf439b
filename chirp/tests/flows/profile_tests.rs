use chirp::{
    ChirpError, Composer, IdentityProvider, ProfileView,
    backend::memory::MemoryIdentityProvider,
    config::ChirpSettings,
};

use crate::support::{Backend, PASSWORD, photo};

#[tokio::test]
async fn profile_lists_only_own_posts_and_falls_back_to_anonymous() {
    let backend = Backend::new();
    let other = backend.verified_user("b@chirp.test", "bea").await;
    let identity = backend.identities.sign_up("nameless@chirp.test", PASSWORD).await.unwrap();

    let composer = Composer::new(&backend.settings);
    for (author, text) in [(&identity, "one"), (&other, "not mine"), (&identity, "two")] {
        composer.set_text(text);
        assert!(composer.submit(Some(author), &backend.docs, &backend.blobs).await.is_done());
    }

    let profile = ProfileView::load(&identity, &backend.docs, &backend.settings).await.unwrap();
    assert_eq!(profile.name(), "Anonymous");
    assert_eq!(profile.avatar(), None);
    assert_eq!(profile.user_id(), identity.uid);
    let tweets: Vec<_> = profile.posts().iter().map(|post| post.tweet.as_str()).collect();
    assert_eq!(tweets.len(), 2);
    assert!(tweets.iter().all(|tweet| *tweet != "not mine"));
}

#[tokio::test]
async fn avatar_upload_updates_identity() {
    let backend = Backend::new();
    let identity = backend.verified_user("a@chirp.test", "ann").await;
    let profile = ProfileView::load(&identity, &backend.docs, &backend.settings).await.unwrap();

    // avatars are not size checked
    let updated = profile
        .change_avatar(&photo(3 * 1024 * 1024), Some(&identity), &backend.identities, &backend.blobs)
        .await
        .unwrap();
    let path = format!("avatars/{}", identity.uid);
    assert!(backend.blobs.contains(&path));
    assert_eq!(profile.avatar(), updated.photo_url);
    assert!(updated.photo_url.as_deref().unwrap().contains("avatars%2F"));

    let err = profile
        .change_avatar(&photo(1), None, &backend.identities, &backend.blobs)
        .await
        .unwrap_err();
    assert!(matches!(err, ChirpError::Unauthorized { .. }));
}

#[tokio::test]
async fn rename_updates_identity_but_not_existing_posts() {
    let backend = Backend::new();
    let identity = backend.verified_user("a@chirp.test", "ann").await;
    let composer = Composer::new(&backend.settings);
    composer.set_text("written as ann");
    assert!(composer.submit(Some(&identity), &backend.docs, &backend.blobs).await.is_done());

    let mut profile = ProfileView::load(&identity, &backend.docs, &backend.settings).await.unwrap();
    assert_eq!(profile.name(), "ann");
    profile.toggle_name_editor();
    assert_eq!(profile.name_editor().draft(), "ann");
    profile.name_editor().set_draft("annabelle");

    let updated = profile.save_name(Some(&identity), &backend.identities).await.unwrap().unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("annabelle"));
    assert_eq!(profile.name(), "annabelle");
    assert!(!profile.name_editor().is_open());

    profile.refresh(&backend.docs).await.unwrap();
    assert_eq!(profile.posts()[0].username, "ann");
}

#[tokio::test]
async fn empty_name_is_rejected_and_closed_editor_sends_nothing() {
    let backend = Backend::new();
    let identity = backend.verified_user("a@chirp.test", "ann").await;
    let profile = ProfileView::load(&identity, &backend.docs, &backend.settings).await.unwrap();
    let calls_before = backend.identities.calls().len();

    assert_eq!(profile.save_name(Some(&identity), &backend.identities).await.unwrap(), None);

    profile.toggle_name_editor();
    profile.name_editor().set_draft("");
    let err = profile.save_name(Some(&identity), &backend.identities).await.unwrap_err();
    assert!(matches!(err, ChirpError::Validation(ref validation) if validation.has_code("required")));
    assert!(profile.name_editor().is_open());
    assert_eq!(backend.identities.calls().len(), calls_before);
}

#[tokio::test]
async fn limits_follow_settings() {
    let settings = ChirpSettings {
        max_display_name_chars: 4,
        ..ChirpSettings::default()
    };
    let identities = MemoryIdentityProvider::new();
    let identity = identities.sign_up("s@chirp.test", PASSWORD).await.unwrap();
    let backend = Backend::new();
    let profile = ProfileView::load(&identity, &backend.docs, &settings).await.unwrap();
    profile.toggle_name_editor();
    profile.name_editor().set_draft("abcdefgh");
    assert_eq!(profile.name_editor().draft(), "abcd");
}
